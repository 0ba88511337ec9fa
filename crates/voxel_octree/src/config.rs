//! RenderConfig - frame size, worker pools and traversal settings.

use crate::error::{OctreeError, Result};
use crate::octree::DEFAULT_MAX_GROUPS;
use crate::subdivider::{SubdividerConfig, DEFAULT_QUEUE_CAPACITY};
use crate::traversal::{TraversalStrategy, DEFAULT_MAX_STEPS};

/// Frames between two brick unification passes.
pub const DEFAULT_UNIFY_INTERVAL: u64 = 10;

/// Configuration for a [`crate::Renderer`].
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
  /// Screen width in pixels.
  pub width: u32,

  /// Screen height in pixels.
  pub height: u32,

  /// How rays move between empty leaves.
  pub strategy: TraversalStrategy,

  /// Unify bricks after every `unify_interval` frames. 0 disables.
  pub unify_interval: u64,

  /// Ray-casting pool size. 0 = one thread per core.
  pub render_threads: usize,

  /// Subdivision pool size. 0 = one thread per core.
  pub subdivision_threads: usize,

  /// Unification pool size. 0 = one thread per core.
  pub unify_threads: usize,

  /// Bound of the subdivision request queue.
  pub queue_capacity: usize,

  /// Leaf-to-leaf steps a single ray may take.
  pub max_traversal_steps: u32,

  /// Start rays at the leaf holding the camera instead of the root.
  pub use_skip_node: bool,

  /// Fill empty cells around each split where the oracle finds detail.
  pub fill_exposed_neighbors: bool,

  /// Fail the frame on the first traversal consistency error instead of
  /// painting the pixel background and counting it.
  pub strict_consistency: bool,

  /// Keep a per-pixel depth buffer. Post-processing needs it.
  pub depth_buffer: bool,

  /// Arena capacity in sibling groups.
  pub arena_groups: usize,
}

impl RenderConfig {
  /// Config for a `width` x `height` screen with everything else default.
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      ..Default::default()
    }
  }

  pub fn with_strategy(mut self, strategy: TraversalStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  pub fn with_unify_interval(mut self, frames: u64) -> Self {
    self.unify_interval = frames;
    self
  }

  /// Set all three pool sizes at once.
  pub fn with_threads(mut self, threads: usize) -> Self {
    self.render_threads = threads;
    self.subdivision_threads = threads;
    self.unify_threads = threads;
    self
  }

  pub fn with_skip_node(mut self, enabled: bool) -> Self {
    self.use_skip_node = enabled;
    self
  }

  pub fn with_fill_exposed(mut self, enabled: bool) -> Self {
    self.fill_exposed_neighbors = enabled;
    self
  }

  pub fn with_strict_consistency(mut self, strict: bool) -> Self {
    self.strict_consistency = strict;
    self
  }

  pub fn with_depth_buffer(mut self, enabled: bool) -> Self {
    self.depth_buffer = enabled;
    self
  }

  pub fn with_arena_groups(mut self, groups: usize) -> Self {
    self.arena_groups = groups;
    self
  }

  /// Pixels per frame.
  #[inline]
  pub fn pixel_count(&self) -> usize {
    self.width as usize * self.height as usize
  }

  /// Subdivider settings derived from this config.
  pub fn subdivider(&self) -> SubdividerConfig {
    SubdividerConfig {
      threads: self.subdivision_threads,
      queue_capacity: self.queue_capacity,
      fill_exposed: self.fill_exposed_neighbors,
    }
  }

  /// Reject settings the renderer cannot run with.
  pub fn validate(&self) -> Result<()> {
    if self.width == 0 || self.height == 0 {
      return Err(OctreeError::InvalidConfig(format!(
        "screen size must be non-zero, got {}x{}",
        self.width, self.height
      )));
    }
    if self.queue_capacity == 0 {
      return Err(OctreeError::InvalidConfig("queue_capacity must be at least 1".into()));
    }
    if self.max_traversal_steps == 0 {
      return Err(OctreeError::InvalidConfig(
        "max_traversal_steps must be at least 1".into(),
      ));
    }
    if self.arena_groups < 2 {
      return Err(OctreeError::InvalidConfig(format!(
        "arena_groups must be at least 2, got {}",
        self.arena_groups
      )));
    }
    Ok(())
  }
}

impl Default for RenderConfig {
  fn default() -> Self {
    Self {
      width: 512,
      height: 512,
      strategy: TraversalStrategy::NeighborWalk,
      unify_interval: DEFAULT_UNIFY_INTERVAL,
      render_threads: 0,
      subdivision_threads: 0,
      unify_threads: 0,
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      max_traversal_steps: DEFAULT_MAX_STEPS,
      use_skip_node: true,
      fill_exposed_neighbors: false,
      strict_consistency: true,
      depth_buffer: true,
      arena_groups: DEFAULT_MAX_GROUPS,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
