//! HyperBall: approximate neighbourhood function and harmonic centrality.
//!
//! Boldi & Vigna, "In-Core Computation of Geometric Centralities with HyperBall" (2013).
//!
//! Every node starts with a sketch holding only itself (the radius-0 ball). Round `r` merges,
//! for every edge `(source, target)` in enumeration order, the *start-of-round* sketch of
//! `target` into the live sketch of `source`. The live sketch of `source` then estimates the
//! ball of radius `r`, and
//!
//! \[
//!   H(x) \mathrel{+}= \frac{|B(x, r)| - |B(x, r-1)|}{r}
//! \]
//!
//! The run stops after the first round in which no merge changed any register, which happens
//! within `diameter + 1` rounds.
//!
//! Two register buffers are kept and swapped after each round: `current` is the frozen
//! snapshot, `next` the live array.

use crate::graph::GraphView;
use crate::sketch::{merge_registers, Estimator, SketchConfig};
use crate::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HyperBallConfig {
    /// `b`: each sketch has `2^b` registers.
    pub log2_registers: u32,
    /// Width of the identifier hash.
    pub hash_bits: u32,
    /// Hash seed; fixing it (with the edge order) makes runs bit-identical.
    pub seed: u64,
    pub estimator: Estimator,
    /// Stop after this many rounds even if not converged.
    pub max_rounds: Option<usize>,
}

impl Default for HyperBallConfig {
    fn default() -> Self {
        Self {
            log2_registers: 10,
            hash_bits: 64,
            seed: 678,
            estimator: Estimator::Raw,
            max_rounds: None,
        }
    }
}

impl HyperBallConfig {
    pub fn validate(&self) -> Result<()> {
        self.sketch_config().map(|_| ())
    }

    /// The per-node sketch configuration (validates `log2_registers` / `hash_bits`).
    pub fn sketch_config(&self) -> Result<SketchConfig> {
        if self.max_rounds == Some(0) {
            return Err(Error::InvalidParameter(
                "max_rounds must be > 0".to_string(),
            ));
        }
        Ok(SketchConfig::new(self.log2_registers, self.hash_bits, self.seed)?
            .with_estimator(self.estimator))
    }
}

/// What one round did.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoundStats {
    pub radius: usize,
    /// Edge merges that grew their source's live sketch.
    pub modified_merges: usize,
    /// Fraction of edges whose merge changed nothing (1.0 for an edgeless graph).
    pub stable_ratio: f64,
    /// Estimated number of pairs within `radius` (sum of live ball sizes).
    pub neighbourhood: f64,
    /// False iff this round changed no register.
    pub changed: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HyperBallRun {
    /// Harmonic centrality estimate, indexed by dense node index.
    pub scores: Vec<f64>,
    /// `neighbourhood_function[r]`: estimated number of pairs at distance `<= r`.
    pub neighbourhood_function: Vec<f64>,
    /// Rounds executed, including the final no-change round.
    pub rounds: usize,
    pub converged: bool,
}

/// Stepping HyperBall engine over a [`GraphView`].
///
/// State is well-defined between any two calls to [`HyperBall::step`], so callers may stop
/// early without corrupting anything.
#[derive(Debug)]
pub struct HyperBall<'g, T> {
    graph: &'g GraphView<T>,
    config: SketchConfig,
    max_rounds: Option<usize>,
    current: Vec<u8>,
    next: Vec<u8>,
    sizes: Vec<f64>,
    next_sizes: Vec<f64>,
    harmonic: Vec<f64>,
    neighbourhood: Vec<f64>,
    radius: usize,
    converged: bool,
}

impl<'g, T: Hash> HyperBall<'g, T> {
    /// Allocate one sketch per node and seed it with the node's identifier.
    pub fn new(graph: &'g GraphView<T>, config: HyperBallConfig) -> Result<Self> {
        let sketch = config.sketch_config()?;
        let n = graph.node_count();
        let m = sketch.register_count();
        info!(
            nodes = n,
            edges = graph.edge_count(),
            log2_registers = sketch.log2_registers(),
            hash_bits = sketch.hash_bits(),
            "initializing HyperBall"
        );

        let mut current = vec![0u8; n * m];
        for (row, id) in current.chunks_exact_mut(m).zip(graph.nodes().ids()) {
            sketch.insert_into(row, id);
        }
        let sizes: Vec<f64> = current.chunks_exact(m).map(|r| sketch.estimate(r)).collect();
        let neighbourhood = vec![sizes.iter().sum()];

        Ok(Self {
            graph,
            config: sketch,
            max_rounds: config.max_rounds,
            next: current.clone(),
            current,
            next_sizes: sizes.clone(),
            sizes,
            harmonic: vec![0.0; n],
            neighbourhood,
            radius: 1,
            converged: n == 0,
        })
    }
}

impl<'g, T> HyperBall<'g, T> {
    pub fn sketch_config(&self) -> &SketchConfig {
        &self.config
    }

    /// Radius the next round will compute.
    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn rounds(&self) -> usize {
        self.radius - 1
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Registers of `node`'s sketch as of the last completed round.
    pub fn registers(&self, node: usize) -> &[u8] {
        let m = self.config.register_count();
        &self.current[node * m..(node + 1) * m]
    }

    /// Estimated ball size of `node` as of the last completed round.
    pub fn size(&self, node: usize) -> f64 {
        self.sizes[node]
    }

    /// Harmonic centrality accumulated so far, by dense node index.
    pub fn scores(&self) -> &[f64] {
        &self.harmonic
    }

    pub fn neighbourhood_function(&self) -> &[f64] {
        &self.neighbourhood
    }

    /// Run one round. Returns `None` once converged.
    pub fn step(&mut self) -> Option<RoundStats> {
        if self.converged {
            return None;
        }
        let modified = self.merge_edges();
        Some(self.finish_round(modified))
    }

    /// Step until convergence or the round budget.
    pub fn run(mut self) -> HyperBallRun {
        while self.within_budget() && self.step().is_some() {}
        self.into_run()
    }

    fn within_budget(&self) -> bool {
        self.max_rounds.map_or(true, |max| self.rounds() < max)
    }

    fn into_run(self) -> HyperBallRun {
        if self.converged {
            info!(rounds = self.rounds(), "HyperBall converged");
        } else {
            info!(rounds = self.rounds(), "HyperBall stopped at round budget");
        }
        HyperBallRun {
            rounds: self.rounds(),
            converged: self.converged,
            scores: self.harmonic,
            neighbourhood_function: self.neighbourhood,
        }
    }

    /// Live := snapshot, then stream edges in enumeration order.
    fn merge_edges(&mut self) -> usize {
        let m = self.config.register_count();
        let current = &self.current;
        let next = &mut self.next;
        next.copy_from_slice(current);
        let mut modified = 0usize;
        for &(source, target) in self.graph.edges() {
            let live = &mut next[source * m..(source + 1) * m];
            if merge_registers(live, &current[target * m..(target + 1) * m]) {
                modified += 1;
            }
        }
        modified
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish_round(&mut self, modified: usize) -> RoundStats {
        let m = self.config.register_count();
        let radius = self.radius as f64;
        let config = &self.config;
        for (v, row) in self.next.chunks_exact(m).enumerate() {
            let size = config.estimate(row);
            self.harmonic[v] += (size - self.sizes[v]) / radius;
            self.next_sizes[v] = size;
        }
        std::mem::swap(&mut self.current, &mut self.next);
        std::mem::swap(&mut self.sizes, &mut self.next_sizes);

        let changed = modified > 0;
        let neighbourhood: f64 = self.sizes.iter().sum();
        let edges = self.graph.edge_count();
        let stable_ratio = if edges == 0 {
            1.0
        } else {
            (edges - modified) as f64 / edges as f64
        };
        debug!(
            radius = self.radius,
            modified_merges = modified,
            stable_ratio,
            neighbourhood,
            "HyperBall round"
        );

        let stats = RoundStats {
            radius: self.radius,
            modified_merges: modified,
            stable_ratio,
            neighbourhood,
            changed,
        };
        if changed {
            self.neighbourhood.push(neighbourhood);
        } else {
            self.converged = true;
        }
        self.radius += 1;
        stats
    }
}

#[cfg(feature = "parallel")]
impl<'g, T: Sync> HyperBall<'g, T> {
    /// Same round as [`HyperBall::step`], with live sketches updated by rayon workers
    /// partitioned by source node.
    pub fn step_parallel(&mut self) -> Option<RoundStats> {
        if self.converged {
            return None;
        }
        let modified = self.merge_edges_parallel();
        Some(self.finish_round(modified))
    }

    pub fn run_parallel(mut self) -> HyperBallRun {
        while self.within_budget() && self.step_parallel().is_some() {}
        self.into_run()
    }

    fn merge_edges_parallel(&mut self) -> usize {
        use crate::graph::GraphRef;
        use rayon::prelude::*;

        let m = self.config.register_count();
        let current = &self.current;
        let graph = self.graph;
        self.next
            .par_chunks_mut(m)
            .zip(current.par_chunks(m))
            .enumerate()
            .map(|(source, (live, snapshot))| {
                live.copy_from_slice(snapshot);
                graph
                    .neighbors_ref(source)
                    .iter()
                    .filter(|&&target| {
                        merge_registers(live, &current[target * m..(target + 1) * m])
                    })
                    .count()
            })
            .sum()
    }
}

/// Harmonic centrality estimates keyed by node identifier.
pub fn harmonic_centrality<T>(
    graph: &GraphView<T>,
    config: HyperBallConfig,
) -> Result<HashMap<T, f64>>
where
    T: Eq + Hash + Clone,
{
    let run = harmonic_centrality_run(graph, config)?;
    Ok(graph
        .nodes()
        .ids()
        .iter()
        .cloned()
        .zip(run.scores)
        .collect())
}

/// Harmonic centrality with the full run report.
pub fn harmonic_centrality_run<T: Hash>(
    graph: &GraphView<T>,
    config: HyperBallConfig,
) -> Result<HyperBallRun> {
    Ok(HyperBall::new(graph, config)?.run())
}

#[cfg(feature = "parallel")]
pub fn harmonic_centrality_run_parallel<T: Hash + Sync>(
    graph: &GraphView<T>,
    config: HyperBallConfig,
) -> Result<HyperBallRun> {
    Ok(HyperBall::new(graph, config)?.run_parallel())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_range(b: u32) -> HyperBallConfig {
        HyperBallConfig {
            log2_registers: b,
            estimator: Estimator::SmallRange,
            ..HyperBallConfig::default()
        }
    }

    #[test]
    fn config_validation() {
        assert!(HyperBallConfig::default().validate().is_ok());
        let bad = HyperBallConfig {
            log2_registers: 0,
            ..HyperBallConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = HyperBallConfig {
            log2_registers: 16,
            hash_bits: 16,
            ..HyperBallConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = HyperBallConfig {
            max_rounds: Some(0),
            ..HyperBallConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn engine_needs_only_hashable_ids() {
        fn seeded<T: Hash>(graph: &GraphView<T>) -> Vec<u8> {
            let hb = HyperBall::new(graph, HyperBallConfig::default()).unwrap();
            hb.registers(0).to_vec()
        }
        let g = GraphView::from_edges([(7u64, 8u64)]);
        let mut expected = vec![0u8; 1 << 10];
        HyperBallConfig::default()
            .sketch_config()
            .unwrap()
            .insert_into(&mut expected, &7u64);
        assert_eq!(seeded(&g), expected);
    }

    #[test]
    fn single_edge() {
        // a absorbs b's ball: a = 1, b = 0
        let g = GraphView::from_edges([("a", "b")]);
        let h = harmonic_centrality(&g, small_range(12)).unwrap();
        assert_eq!(h.len(), 2);
        assert!((h["a"] - 1.0).abs() < 0.01, "a={}", h["a"]);
        assert_eq!(h["b"], 0.0);
    }

    #[test]
    fn path_of_three() {
        let g = GraphView::from_edges([("a", "b"), ("b", "c")]);
        let run = harmonic_centrality_run(&g, small_range(12)).unwrap();
        assert!(run.converged);
        assert_eq!(run.rounds, 3);
        assert!((run.scores[0] - 1.5).abs() < 0.015, "a={}", run.scores[0]);
        assert!((run.scores[1] - 1.0).abs() < 0.01, "b={}", run.scores[1]);
        assert_eq!(run.scores[2], 0.0);
        // radius 0, 1, 2
        assert_eq!(run.neighbourhood_function.len(), 3);
    }

    #[test]
    fn isolated_node_never_changes() {
        let g = GraphView::new(["a", "b", "c", "d"], [("a", "b"), ("b", "c")]).unwrap();
        let mut hb = HyperBall::new(&g, HyperBallConfig::default()).unwrap();
        let d = g.nodes().get(&"d").unwrap();
        let seeded = hb.registers(d).to_vec();
        while hb.step().is_some() {
            assert_eq!(hb.registers(d), seeded.as_slice());
        }
        assert_eq!(hb.scores()[d], 0.0);
    }

    #[test]
    fn raw_estimator_orders_path() {
        let g = GraphView::from_edges([("a", "b"), ("b", "c")]);
        let run = harmonic_centrality_run(&g, HyperBallConfig::default()).unwrap();
        assert!(run.scores[0] > 0.0);
        assert!(run.scores[1] > 0.0);
        assert_eq!(run.scores[2], 0.0);
    }

    #[test]
    fn edgeless_graph_converges_in_one_round() {
        let g = GraphView::new(["x", "y"], std::iter::empty()).unwrap();
        let run = harmonic_centrality_run(&g, HyperBallConfig::default()).unwrap();
        assert!(run.converged);
        assert_eq!(run.rounds, 1);
        assert_eq!(run.scores, vec![0.0, 0.0]);
    }

    #[test]
    fn empty_graph() {
        let g: GraphView<u32> = GraphView::from_edges(std::iter::empty());
        let run = harmonic_centrality_run(&g, HyperBallConfig::default()).unwrap();
        assert!(run.converged);
        assert_eq!(run.rounds, 0);
        assert!(run.scores.is_empty());
    }

    #[test]
    fn round_budget_stops_early() {
        let g = GraphView::from_edges((0..10u32).map(|i| (i, i + 1)));
        let config = HyperBallConfig {
            max_rounds: Some(2),
            ..HyperBallConfig::default()
        };
        let run = harmonic_centrality_run(&g, config).unwrap();
        assert_eq!(run.rounds, 2);
        assert!(!run.converged);
    }

    #[test]
    fn step_reports_round_stats() {
        let g = GraphView::from_edges([("a", "b"), ("b", "c")]);
        let mut hb = HyperBall::new(&g, small_range(12)).unwrap();
        let first = hb.step().unwrap();
        assert_eq!(first.radius, 1);
        assert_eq!(first.modified_merges, 2);
        assert!(first.changed);
        assert_eq!(first.stable_ratio, 0.0);
        let second = hb.step().unwrap();
        assert_eq!(second.modified_merges, 1);
        assert!((second.stable_ratio - 0.5).abs() < 1e-12);
        let third = hb.step().unwrap();
        assert!(!third.changed);
        assert!(hb.is_converged());
        assert!(hb.step().is_none());
    }

    #[test]
    fn cycle_converges() {
        let g = GraphView::from_edges([(0u32, 1u32), (1, 2), (2, 0)]);
        let run = harmonic_centrality_run(&g, small_range(12)).unwrap();
        assert!(run.converged);
        assert_eq!(run.rounds, 3);
        for s in &run.scores {
            assert!((s - 1.5).abs() < 0.015, "score={s}");
        }
    }
}
