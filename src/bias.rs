//! Bias constant of the HyperLogLog estimator.
//!
//! \[
//!   \alpha_m = \left( m \int_0^\infty \left(\log_2 \frac{2+u}{1+u}\right)^m du \right)^{-1}
//! \]
//!
//! (Flajolet, Fusy, Gandouet, Meunier 2007). It depends only on `b` (with \(m = 2^b\)), so each
//! value is integrated once and memoized for the life of the process.

use std::f64::consts::LN_2;
use std::sync::OnceLock;

const CACHE_SLOTS: usize = 64;

#[allow(clippy::declare_interior_mutable_const)]
const UNSET: OnceLock<f64> = OnceLock::new();
static ALPHA_CACHE: [OnceLock<f64>; CACHE_SLOTS] = [UNSET; CACHE_SLOTS];

const TOLERANCE: f64 = 1e-12;
const MAX_DEPTH: u32 = 50;

/// Bias constant for a sketch with `2^log2_registers` registers.
///
/// Concurrent first calls for the same `b` may both integrate; they store the same value.
pub fn alpha(log2_registers: u32) -> f64 {
    match ALPHA_CACHE.get(log2_registers as usize) {
        Some(slot) => *slot.get_or_init(|| integrate_alpha(log2_registers)),
        None => integrate_alpha(log2_registers),
    }
}

fn integrate_alpha(log2_registers: u32) -> f64 {
    let m = 2f64.powi(log2_registers as i32);
    // u = t / (1 - t) maps [0, inf) onto [0, 1).
    let integrand = |t: f64| -> f64 {
        if t >= 1.0 {
            // limit of f(u) * (1 + u)^2 as u -> inf
            return if m == 2.0 { LN_2.powi(-2) } else { 0.0 };
        }
        let u = t / (1.0 - t);
        let base = ((2.0 + u) / (1.0 + u)).log2();
        base.powf(m) / ((1.0 - t) * (1.0 - t))
    };
    let integral = simpson(&integrand, 0.0, 1.0);
    tracing::debug!(log2_registers, integral, "integrated bias constant");
    1.0 / (m * integral)
}

fn simpson<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> f64 {
    let fa = f(a);
    let fb = f(b);
    let mid = 0.5 * (a + b);
    let fm = f(mid);
    let whole = (b - a) / 6.0 * (fa + 4.0 * fm + fb);
    adaptive(f, a, b, fa, fm, fb, whole, TOLERANCE, MAX_DEPTH)
}

#[allow(clippy::too_many_arguments)]
fn adaptive<F: Fn(f64) -> f64>(
    f: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    eps: f64,
    depth: u32,
) -> f64 {
    let mid = 0.5 * (a + b);
    let lm = 0.5 * (a + mid);
    let rm = 0.5 * (mid + b);
    let flm = f(lm);
    let frm = f(rm);
    let left = (mid - a) / 6.0 * (fa + 4.0 * flm + fm);
    let right = (b - mid) / 6.0 * (fm + 4.0 * frm + fb);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * eps {
        return left + right + delta / 15.0;
    }
    adaptive(f, a, mid, fa, flm, fm, left, 0.5 * eps, depth - 1)
        + adaptive(f, mid, b, fm, frm, fb, right, 0.5 * eps, depth - 1)
}
