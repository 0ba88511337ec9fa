//! Ray traversal through the octree.
//!
//! Two walkers share the descent and leaf handling and differ in how they
//! move on from an empty leaf:
//!
//! - [`TraversalStrategy::NeighborWalk`]: follow the leaf's face-neighbor
//!   pointer across the exit face, descending again only below the neighbor.
//! - [`TraversalStrategy::Restart`]: advance the entry point and descend
//!   again from the starting node.
//!
//! Both request subdivision of full leaves that cover more than a couple of
//! pixels, and both stop descending once a node shrinks below a pixel.

mod neighbor;
mod restart;

use std::fmt;
use std::str::FromStr;

use crate::constants::{BACKGROUND, MAX_DEPTH, NO_HIT};
use crate::error::{OctreeError, Result};
use crate::lod::LodConstants;
use crate::octree::{NodeBox, NodeId, Octree};
use crate::ray::Ray;
use crate::subdivider::{SubdivisionRequest, SubdivisionSink};

/// Default bound on leaf-to-leaf steps per ray.
pub const DEFAULT_MAX_STEPS: u32 = 1 << 16;

/// How a ray moves from one empty leaf to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TraversalStrategy {
  #[default]
  NeighborWalk,
  Restart,
}

impl fmt::Display for TraversalStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      TraversalStrategy::NeighborWalk => "neighbor",
      TraversalStrategy::Restart => "restart",
    })
  }
}

impl FromStr for TraversalStrategy {
  type Err = OctreeError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "neighbor" | "neighbour" | "neighbor_walk" => Ok(TraversalStrategy::NeighborWalk),
      "restart" => Ok(TraversalStrategy::Restart),
      other => Err(OctreeError::InvalidConfig(format!(
        "unknown traversal strategy '{other}' (expected 'neighbor' or 'restart')"
      ))),
    }
  }
}

/// Result of casting one ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
  /// Packed RGB, [`BACKGROUND`] on a miss.
  pub color: u32,
  /// Ray parameter where the returned node was entered, [`NO_HIT`] on a miss.
  pub distance: f64,
  /// Leaf-to-leaf steps taken.
  pub steps: u32,
}

impl RayHit {
  pub const MISS: Self = Self {
    color: BACKGROUND,
    distance: NO_HIT,
    steps: 0,
  };

  #[inline]
  pub fn is_hit(&self) -> bool {
    self.distance < NO_HIT
  }

  #[inline]
  fn hit(color: u32, distance: f64, steps: u32) -> Self {
    Self {
      color,
      distance,
      steps,
    }
  }

  #[inline]
  fn miss(steps: u32) -> Self {
    Self { steps, ..Self::MISS }
  }
}

/// Per-frame ray caster over a shared tree.
///
/// Cheap to build; the renderer makes one per frame and shares it across
/// its worker threads.
pub struct Traversal<'a> {
  tree: &'a Octree,
  sink: &'a dyn SubdivisionSink,
  lod: LodConstants,
  strategy: TraversalStrategy,
  max_steps: u32,
}

impl<'a> Traversal<'a> {
  pub fn new(tree: &'a Octree, sink: &'a dyn SubdivisionSink, lod: LodConstants) -> Self {
    Self {
      tree,
      sink,
      lod,
      strategy: TraversalStrategy::default(),
      max_steps: DEFAULT_MAX_STEPS,
    }
  }

  pub fn with_strategy(mut self, strategy: TraversalStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_max_steps(mut self, max_steps: u32) -> Self {
    self.max_steps = max_steps.max(1);
    self
  }

  #[inline]
  pub fn strategy(&self) -> TraversalStrategy {
    self.strategy
  }

  /// Cast `ray` starting at `start`, whose cube is `start_box`.
  ///
  /// `start` is the root or the skip node. A ray that never enters
  /// `start_box` is a miss.
  pub fn cast(&self, ray: &Ray, start: NodeId, start_box: NodeBox) -> Result<RayHit> {
    match self.strategy {
      TraversalStrategy::NeighborWalk => self.walk_neighbors(ray, start, start_box),
      TraversalStrategy::Restart => self.walk_restart(ray, start, start_box),
    }
  }

  /// Cast from the root cube.
  pub fn cast_from_root(&self, ray: &Ray) -> Result<RayHit> {
    self.cast(ray, self.tree.root(), NodeBox::ROOT)
  }

  /// Count one more step and fail once the cap is passed.
  #[inline]
  fn step(&self, steps: &mut u32) -> Result<()> {
    *steps += 1;
    if *steps > self.max_steps {
      tracing::error!(limit = self.max_steps, "ray traversal did not terminate");
      return Err(OctreeError::IterationCapExceeded {
        limit: self.max_steps,
      });
    }
    Ok(())
  }

  /// Ask for `id` to be subdivided if it is a full leaf that is still too
  /// coarse at distance `t`. At most one request per node is in flight.
  fn maybe_request_subdivision(&self, id: NodeId, bounds: NodeBox, depth: u8, t: f64) {
    if depth >= MAX_DEPTH || !self.lod.wants_subdivision(bounds.dim, t) {
      return;
    }
    if !self.tree.try_mark_queued(id) {
      return;
    }
    if !self.sink.submit(SubdivisionRequest { node: id, bounds }) {
      self.tree.clear_queued(id);
    }
  }
}
