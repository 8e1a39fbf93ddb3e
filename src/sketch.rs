//! HyperLogLog cardinality sketch.
//!
//! A sketch is `2^b` one-byte registers. Inserting an identifier hashes it to `hash_bits` bits,
//! uses the high `b` bits as a register index and stores the rank of the remaining bits if it
//! exceeds the register. Registers only ever grow; union is the register-wise maximum.
//!
//! Register-slice primitives ([`SketchConfig::insert_into`], [`SketchConfig::estimate`],
//! [`merge_registers`]) are what the HyperBall engine runs on its flat register arrays;
//! [`HyperLogLog`] is the owned, standalone form.

use crate::bias::alpha;
use crate::hash::{hash_item, rank, split};
use crate::{Error, Result};
use std::hash::Hash;

/// Largest accepted `b` (registers per sketch = `2^b`).
pub const MAX_LOG2_REGISTERS: u32 = 24;
/// Widest hash the sketch can split (the xxh64 output width).
pub const MAX_HASH_BITS: u32 = 64;

/// How a register array is turned into a size estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Estimator {
    /// \(\alpha m^2 / \sum_j 2^{-M_j}\) with no range corrections.
    #[default]
    Raw,
    /// Raw, except linear counting \(m \ln(m / V)\) while the raw estimate is at most `2.5 m`
    /// and `V > 0` registers are still empty. Not monotone across the switch point.
    SmallRange,
}

/// Validated sketch parameters.
///
/// Two sketches can only be merged when their configurations are equal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SketchConfig {
    log2_registers: u32,
    hash_bits: u32,
    seed: u64,
    estimator: Estimator,
    register_count: usize,
    alpha: f64,
}

impl SketchConfig {
    /// Sketch with `2^log2_registers` registers over `hash_bits`-bit hashes seeded with `seed`.
    ///
    /// Rejects `log2_registers == 0`, `log2_registers >= hash_bits` (no rank bit left),
    /// `hash_bits > 64` and `log2_registers > MAX_LOG2_REGISTERS`.
    pub fn new(log2_registers: u32, hash_bits: u32, seed: u64) -> Result<Self> {
        if log2_registers == 0 {
            return Err(Error::InvalidParameter(
                "log2_registers must be > 0".to_string(),
            ));
        }
        if log2_registers > MAX_LOG2_REGISTERS {
            return Err(Error::InvalidParameter(format!(
                "log2_registers must be <= {MAX_LOG2_REGISTERS} (got {log2_registers})"
            )));
        }
        if hash_bits > MAX_HASH_BITS {
            return Err(Error::InvalidParameter(format!(
                "hash_bits must be <= {MAX_HASH_BITS} (got {hash_bits})"
            )));
        }
        if log2_registers >= hash_bits {
            return Err(Error::InvalidParameter(format!(
                "hash_bits must leave at least one rank bit (log2_registers={log2_registers} hash_bits={hash_bits})"
            )));
        }
        Ok(Self {
            log2_registers,
            hash_bits,
            seed,
            estimator: Estimator::Raw,
            register_count: 1usize << log2_registers,
            alpha: alpha(log2_registers),
        })
    }

    #[must_use]
    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn log2_registers(&self) -> u32 {
        self.log2_registers
    }

    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn estimator(&self) -> Estimator {
        self.estimator
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Largest rank any register can hold: `hash_bits - log2_registers + 1`.
    pub fn max_rank(&self) -> u8 {
        (self.hash_bits - self.log2_registers + 1) as u8
    }

    /// Register index and rank `item` maps to.
    pub fn locate<T: Hash + ?Sized>(&self, item: &T) -> (usize, u8) {
        let h = hash_item(item, self.seed, self.hash_bits);
        let (index, remainder) = split(h, self.hash_bits, self.log2_registers);
        (index, rank(remainder, self.hash_bits - self.log2_registers))
    }

    /// Insert `item` into a register slice of this configuration. Returns whether a register grew.
    pub fn insert_into<T: Hash + ?Sized>(&self, registers: &mut [u8], item: &T) -> bool {
        debug_assert_eq!(registers.len(), self.register_count);
        let (index, r) = self.locate(item);
        if r > registers[index] {
            registers[index] = r;
            true
        } else {
            false
        }
    }

    /// Size estimate of a register slice of this configuration.
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate(&self, registers: &[u8]) -> f64 {
        debug_assert_eq!(registers.len(), self.register_count);
        let mut z = 0.0;
        let mut empty = 0usize;
        for &r in registers {
            z += (-f64::from(r)).exp2();
            if r == 0 {
                empty += 1;
            }
        }
        let m = self.register_count as f64;
        let raw = self.alpha * m * m / z;
        match self.estimator {
            Estimator::Raw => raw,
            Estimator::SmallRange if raw <= 2.5 * m && empty > 0 => m * (m / empty as f64).ln(),
            Estimator::SmallRange => raw,
        }
    }

    fn ensure_compatible(&self, other: &SketchConfig) -> Result<()> {
        if self.register_count != other.register_count {
            return Err(Error::ConfigurationMismatch(format!(
                "{} registers vs {} registers",
                self.register_count, other.register_count
            )));
        }
        if self != other {
            return Err(Error::ConfigurationMismatch(format!(
                "hash parameters differ ({self:?} vs {other:?})"
            )));
        }
        Ok(())
    }
}

/// Register-wise maximum of `src` into `dst`. Returns whether any register of `dst` grew.
#[inline]
pub fn merge_registers(dst: &mut [u8], src: &[u8]) -> bool {
    debug_assert_eq!(dst.len(), src.len());
    let mut changed = false;
    for (d, &s) in dst.iter_mut().zip(src) {
        if s > *d {
            *d = s;
            changed = true;
        }
    }
    changed
}

/// An owned HyperLogLog sketch.
///
/// Equality is exact register equality (plus configuration).
#[derive(Debug, Clone, PartialEq)]
pub struct HyperLogLog {
    config: SketchConfig,
    registers: Vec<u8>,
}

impl HyperLogLog {
    pub fn new(config: SketchConfig) -> Self {
        Self {
            registers: vec![0; config.register_count()],
            config,
        }
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn registers(&self) -> &[u8] {
        &self.registers
    }

    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Insert `item`. Returns whether a register grew.
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        self.config.insert_into(&mut self.registers, item)
    }

    /// Merge `other` into `self` in place. Returns whether any register grew.
    pub fn merge(&mut self, other: &HyperLogLog) -> Result<bool> {
        self.config.ensure_compatible(&other.config)?;
        Ok(merge_registers(&mut self.registers, &other.registers))
    }

    /// Register-wise maximum of `a` and `b`.
    pub fn union(a: &HyperLogLog, b: &HyperLogLog) -> Result<HyperLogLog> {
        let mut out = a.clone();
        out.merge(b)?;
        Ok(out)
    }

    pub fn estimate(&self) -> f64 {
        self.config.estimate(&self.registers)
    }
}

impl<T: Hash> Extend<T> for HyperLogLog {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(&item);
        }
    }
}
