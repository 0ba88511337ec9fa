//! BrickManager - reclaims subtrees that rays stopped looking at.
//!
//! Every interior node at a depth multiple of [`BRICK_INTERVAL`] is a brick.
//! Rays mark the bricks above every node they touch. A brick left unmarked
//! for a whole unification interval is collapsed back into a leaf and its
//! descendants become tombstones that forward to it.
//!
//! # Collapse
//!
//! ```text
//!   B (interior)              B (leaf, keeps its averaged color)
//!   ├── c0 ── …      ──►      c0..c7, … : DELETED, brick → B
//!   └── c7 ── …               groups parked in the graveyard
//! ```
//!
//! `LEAF` is set on the brick before its children pointer is cleared, so a
//! concurrent reader either descends into still-intact children or stops at
//! the brick.
//!
//! [`BRICK_INTERVAL`]: crate::constants::BRICK_INTERVAL

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use crate::error::{OctreeError, Result};
use crate::octree::{flags, NodeId, Octree};

/// Result of one [`BrickManager::unify_bricks`] pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnifyStats {
  /// Visited bricks kept for the next interval.
  pub retained: usize,
  /// Bricks collapsed into leaves.
  pub collapsed: usize,
  /// Unvisited bricks already collapsed by an ancestor in the same pass.
  pub skipped: usize,
  /// Entries dropped because the node was deleted or became a leaf.
  pub dropped: usize,
  /// Nodes turned into tombstones.
  pub nodes_deleted: usize,
  /// Buried groups recycled at the start of the pass.
  pub groups_recycled: usize,
  pub duration: Duration,
}

/// Registry of live bricks plus the pool that collapses them.
pub struct BrickManager {
  tree: Arc<Octree>,
  bricks: Mutex<Vec<NodeId>>,
  pool: rayon::ThreadPool,
}

impl BrickManager {
  /// Create a manager for `tree` with a dedicated pool of `threads`
  /// workers (0 = one per core).
  pub fn new(tree: Arc<Octree>, threads: usize) -> Result<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(threads)
      .thread_name(|i| format!("unify-{i}"))
      .build()
      .map_err(|source| OctreeError::ThreadPool {
        pool: "unification",
        source,
      })?;
    Ok(Self {
      tree,
      bricks: Mutex::new(Vec::new()),
      pool,
    })
  }

  /// Register a brick. Registering a node twice is a no-op.
  pub fn add_brick(&self, id: NodeId) {
    let Some(node) = self.tree.live_node(id) else {
      return;
    };
    if node.try_set_flag(flags::BRICK) {
      self.lock_bricks().push(id);
    }
  }

  /// Registered bricks, including entries not yet pruned.
  pub fn brick_count(&self) -> usize {
    self.lock_bricks().len()
  }

  /// Collapse every brick no ray touched since the previous pass and clear
  /// the marks on the rest.
  ///
  /// Must run while no rays are in flight. Subdivision may continue
  /// concurrently.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "bricks::unify"))]
  pub fn unify_bricks(&self) -> UnifyStats {
    let start = Instant::now();
    let mut stats = UnifyStats {
      groups_recycled: self.tree.arena().begin_sweep(),
      ..Default::default()
    };

    let entries = std::mem::take(&mut *self.lock_bricks());
    let mut retained = Vec::with_capacity(entries.len());
    let mut doomed = Vec::new();
    for id in entries {
      match self.tree.live_node(id) {
        Some(node) if !node.is_leaf() => {
          if node.is_visited() {
            node.clear_flags(flags::VISITED);
            retained.push(id);
          } else {
            node.clear_flags(flags::BRICK);
            doomed.push(id);
          }
        }
        Some(node) => {
          node.clear_flags(flags::BRICK | flags::VISITED);
          stats.dropped += 1;
        }
        None => stats.dropped += 1,
      }
    }

    let (collapsed, nodes_deleted) = self.pool.install(|| {
      doomed
        .par_iter()
        .map(|&id| match self.collapse_brick(id) {
          Some(deleted) => (1, deleted),
          None => (0, 0),
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
    });

    stats.retained = retained.len();
    stats.collapsed = collapsed;
    stats.skipped = doomed.len() - collapsed;
    stats.nodes_deleted = nodes_deleted;
    self.lock_bricks().extend(retained);
    stats.duration = start.elapsed();

    tracing::debug!(
      retained = stats.retained,
      collapsed = stats.collapsed,
      nodes_deleted = stats.nodes_deleted,
      recycled = stats.groups_recycled,
      elapsed_us = stats.duration.as_micros() as u64,
      "unified bricks"
    );
    stats
  }

  /// Turn brick `id` back into a leaf and tombstone its subtree.
  ///
  /// Returns the number of nodes deleted, or `None` if the brick was
  /// already a leaf or deleted.
  fn collapse_brick(&self, id: NodeId) -> Option<usize> {
    let tree = &*self.tree;
    let (brick, _brick_lock) = tree.lock_live(id)?;
    if brick.is_leaf() {
      return None;
    }
    let first = brick.first_child()?;
    brick.set_flags(flags::LEAF);
    brick.set_first_child(None);

    let mut deleted = 0;
    let mut groups: SmallVec<[NodeId; 32]> = SmallVec::new();
    groups.push(first);
    while let Some(group) = groups.pop() {
      for octant in 0u8..8 {
        let Some(node) = tree.live_node(group.sibling(octant)) else {
          continue;
        };
        let _lock = node.lock();
        if let Some(grandchildren) = node.first_child() {
          if !node.is_leaf() {
            groups.push(grandchildren);
          }
        }
        node.mark_deleted(id);
        deleted += 1;
      }
      tree.arena().bury_group(group);
    }
    tracing::trace!(brick = ?id, deleted, "collapsed brick");
    Some(deleted)
  }

  fn lock_bricks(&self) -> MutexGuard<'_, Vec<NodeId>> {
    self.bricks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

#[cfg(test)]
#[path = "bricks_test.rs"]
mod bricks_test;
