//! `hyperball`: HyperLogLog sketches and the HyperBall neighbourhood function.
//!
//! Estimates harmonic centrality on graphs too large to hold an explicit reachable set per node.
//! Each node owns one constant-memory HyperLogLog sketch of its ball; rounds merge neighbour
//! sketches along edges until no sketch changes, and per-radius growth of the estimated ball
//! size is weighted by `1 / radius`.
//!
//! Public invariants (must not drift):
//! - **Node order**: per-node outputs are indexed by the dense index of [`NodeIndex`]
//!   (first-seen order for [`GraphView::from_edges`]).
//! - **Direction**: for an edge `(source, target)` the source's ball absorbs the target's ball.
//!   A node's score is \(\sum_y 1 / d(node, y)\) along the supplied edges; pass
//!   [`GraphView::reversed`] to measure distances *to* a node instead.
//! - **Determinism**: given the same seed, configuration and edge order, every round produces
//!   bit-identical register arrays (serial or `parallel`).
//! - **Convergence**: decided by exact register equality, never by comparing estimates.
//!
//! Swappable (allowed to change without breaking the contract):
//! - iteration strategy (serial vs parallel)
//! - how the bias constant is computed (so long as it is the same value per `b`)
//! - internal buffer layout

pub mod bias;
pub mod exact;
pub mod graph;
pub mod hash;
pub mod hyperball;
pub mod sketch;

pub use bias::alpha;
pub use exact::{harmonic_centrality_exact, mean_relative_error_percent};
pub use graph::{Graph, GraphRef, GraphView, NodeIndex};
pub use hyperball::{
    harmonic_centrality, harmonic_centrality_run, HyperBall, HyperBallConfig, HyperBallRun,
    RoundStats,
};
#[cfg(feature = "parallel")]
pub use hyperball::harmonic_centrality_run_parallel;
pub use sketch::{Estimator, HyperLogLog, SketchConfig, MAX_HASH_BITS, MAX_LOG2_REGISTERS};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("sketch configuration mismatch: {0}")]
    ConfigurationMismatch(String),
    #[error("unknown node: {0}")]
    UnknownNode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
