//! Exact harmonic centrality, for validating HyperBall estimates on graphs small enough to BFS.

use crate::graph::GraphRef;
use crate::{Error, Result};
use std::collections::VecDeque;

/// \(H(x) = \sum_{y \ne x,\ d(x,y) < \infty} 1 / d(x, y)\), distances along out-edges.
///
/// Same direction convention as the HyperBall engine. O(VE) time.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn harmonic_centrality_exact<G: GraphRef>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();
    let mut dist = vec![usize::MAX; n];
    let mut queue = VecDeque::new();
    let mut scores = vec![0.0; n];

    for source in 0..n {
        dist.fill(usize::MAX);
        dist[source] = 0;
        queue.push_back(source);
        let mut sum = 0.0;
        while let Some(u) = queue.pop_front() {
            for &v in graph.neighbors_ref(u) {
                if v < n && dist[v] == usize::MAX {
                    dist[v] = dist[u] + 1;
                    sum += 1.0 / dist[v] as f64;
                    queue.push_back(v);
                }
            }
        }
        scores[source] = sum;
    }
    scores
}

/// Mean of `|estimate - exact| / (exact + 1e-8)` over all nodes, in percent.
///
/// Returns 0.0 for empty input.
#[allow(clippy::cast_precision_loss)]
pub fn mean_relative_error_percent(estimate: &[f64], exact: &[f64]) -> Result<f64> {
    if estimate.len() != exact.len() {
        return Err(Error::InvalidParameter(format!(
            "estimate length must equal exact length (estimate={} exact={})",
            estimate.len(),
            exact.len()
        )));
    }
    if exact.is_empty() {
        return Ok(0.0);
    }
    let total: f64 = estimate
        .iter()
        .zip(exact)
        .map(|(e, t)| (e - t).abs() / (t + 1e-8))
        .sum();
    Ok(100.0 * total / exact.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphView;

    #[test]
    fn path_of_three() {
        let g = GraphView::from_edges([("a", "b"), ("b", "c")]);
        assert_eq!(harmonic_centrality_exact(&g), vec![1.5, 1.0, 0.0]);
    }

    #[test]
    fn shortest_distance_wins() {
        // a -> b -> c and a -> c: c is at distance 1 from a
        let g = GraphView::from_edges([("a", "b"), ("b", "c"), ("a", "c")]);
        assert_eq!(harmonic_centrality_exact(&g)[0], 2.0);
    }

    #[test]
    fn relative_error() {
        assert_eq!(mean_relative_error_percent(&[], &[]).unwrap(), 0.0);
        let err = mean_relative_error_percent(&[1.1, 2.0], &[1.0, 2.0]).unwrap();
        assert!((err - 5.0).abs() < 1e-6, "err={err}");
    }

    #[test]
    fn relative_error_rejects_wrong_len() {
        let err = mean_relative_error_percent(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        let msg = format!("{err}");
        assert!(msg.contains("estimate length"));
    }
}
