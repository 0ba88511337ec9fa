//! Error types for the octree engine.
//!
//! A ray that misses the root cube is not an error. Everything here is either
//! a broken tree invariant, a failing oracle, or a setup problem.

use thiserror::Error;

use crate::octree::NodeId;

/// Numerical failure reported by a [`crate::FractalOracle`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
  /// The distance estimate came out NaN or infinite.
  #[error("distance estimate is not finite at ({x}, {y}, {z})")]
  NonFinite { x: f64, y: f64, z: f64 },

  /// The oracle rejected the probe for its own reasons.
  #[error("oracle failed: {0}")]
  Other(String),
}

/// Errors surfaced by the octree engine.
#[derive(Debug, Error)]
pub enum OctreeError {
  /// A deleted node's forwarding chain did not reach a live node.
  #[error("broken forwarding chain at node {node:?} after {hops} hops")]
  BrokenForwarding { node: NodeId, hops: u32 },

  /// A traversal walked more steps than the configured cap.
  #[error("traversal exceeded {limit} steps without resolving a color")]
  IterationCapExceeded { limit: u32 },

  /// A neighbor pointer referenced a node finer than the node holding it.
  #[error("node {node:?} points at finer neighbor {neighbor:?}")]
  FinerNeighbor { node: NodeId, neighbor: NodeId },

  /// The fractal oracle failed while classifying children.
  #[error(transparent)]
  Oracle(#[from] OracleError),

  /// Every arena slot is in use.
  #[error("node arena is full ({capacity} sibling groups)")]
  ArenaFull { capacity: usize },

  /// A worker pool could not be created.
  #[error("failed to build {pool} pool: {source}")]
  ThreadPool {
    pool: &'static str,
    #[source]
    source: rayon::ThreadPoolBuildError,
  },

  /// A worker thread could not be spawned.
  #[error("failed to spawn {thread} thread: {source}")]
  Spawn {
    thread: &'static str,
    #[source]
    source: std::io::Error,
  },

  /// Rejected configuration value.
  #[error("invalid config: {0}")]
  InvalidConfig(String),

  /// Caller-owned buffer does not match the configured screen size.
  #[error("pixel buffer holds {actual} entries, expected {expected}")]
  BufferSize { expected: usize, actual: usize },
}

impl OctreeError {
  /// True for errors that indicate a wiring bug in the tree itself.
  pub fn is_consistency_violation(&self) -> bool {
    matches!(
      self,
      OctreeError::BrokenForwarding { .. }
        | OctreeError::IterationCapExceeded { .. }
        | OctreeError::FinerNeighbor { .. }
    )
  }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OctreeError>;
