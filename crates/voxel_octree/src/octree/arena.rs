//! NodeArena - segmented storage for sibling groups.
//!
//! Nodes are allocated eight at a time: a subdivision always produces a full
//! set of siblings, and unification always deletes one. Groups are addressed
//! by index, so handles stay valid while the arena grows.
//!
//! # Layout
//!
//! ```text
//! segments: [ seg 0 ][ seg 1 ][ seg 2 ] ...     (allocated on first use)
//!              │
//!              ├── group 0   gen | node×8   ← root lives in octant 0
//!              ├── group 1   gen | node×8
//!              └── ...       (SEGMENT_GROUPS per segment)
//! ```
//!
//! # Reclamation
//!
//! Deleted groups are not reused immediately. Stale neighbor pointers may
//! still lead into them, and readers need the tombstone's forwarding
//! pointer to heal those links. A buried group waits in the graveyard for
//! [`TOMBSTONE_GRACE_SWEEPS`] sweeps; recycling then bumps its generation so
//! any handle still pointing at it is recognisably stale.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use super::node::{next_generation, NodeId, VoxelNode};
use crate::constants::TOMBSTONE_GRACE_SWEEPS;
use crate::error::{OctreeError, Result};

const SEGMENT_SHIFT: u32 = 10;
const SEGMENT_GROUPS: usize = 1 << SEGMENT_SHIFT;
const SEGMENT_MASK: u32 = (SEGMENT_GROUPS as u32) - 1;

/// Default arena capacity in sibling groups (32M nodes).
pub const DEFAULT_MAX_GROUPS: usize = 1 << 22;

/// Eight sibling nodes sharing one generation counter.
pub struct NodeGroup {
  generation: AtomicU32,
  nodes: [VoxelNode; 8],
}

impl Default for NodeGroup {
  fn default() -> Self {
    Self {
      generation: AtomicU32::new(0),
      nodes: std::array::from_fn(|_| VoxelNode::default()),
    }
  }
}

impl NodeGroup {
  #[inline]
  pub fn generation(&self) -> u32 {
    self.generation.load(Ordering::Acquire)
  }

  #[inline]
  pub fn nodes(&self) -> &[VoxelNode; 8] {
    &self.nodes
  }
}

#[derive(Default)]
struct Allocator {
  next: u32,
  free: Vec<u32>,
}

/// Segmented, lock-free-to-read arena of [`NodeGroup`]s.
pub struct NodeArena {
  segments: Box<[OnceLock<Box<[NodeGroup]>>]>,
  max_groups: usize,
  alloc: Mutex<Allocator>,
  /// `(sweep, group)` pairs waiting out the grace period.
  graveyard: Mutex<Vec<(u64, u32)>>,
  sweep: AtomicU64,
  live_groups: AtomicUsize,
}

impl NodeArena {
  /// Create an arena able to hold up to `max_groups` sibling groups.
  pub fn with_capacity(max_groups: usize) -> Self {
    let max_groups = max_groups.clamp(1, u32::MAX as usize - 1);
    let segment_count = max_groups.div_ceil(SEGMENT_GROUPS);
    Self {
      segments: (0..segment_count).map(|_| OnceLock::new()).collect(),
      max_groups,
      alloc: Mutex::new(Allocator::default()),
      graveyard: Mutex::new(Vec::new()),
      sweep: AtomicU64::new(0),
      live_groups: AtomicUsize::new(0),
    }
  }

  /// Group at `index`, if its segment has been allocated.
  #[inline]
  pub fn group(&self, index: u32) -> Option<&NodeGroup> {
    let segment = self.segments.get((index >> SEGMENT_SHIFT) as usize)?.get()?;
    segment.get((index & SEGMENT_MASK) as usize)
  }

  /// Node behind `id`, or `None` if the handle is stale.
  ///
  /// Says nothing about the node's state; callers still check
  /// `is_live`/`is_deleted`.
  #[inline]
  pub fn get(&self, id: NodeId) -> Option<&VoxelNode> {
    let group = self.group(id.group())?;
    if group.generation() != id.generation() {
      return None;
    }
    Some(&group.nodes[id.octant() as usize])
  }

  /// Reserve a fresh group and return the handle of its octant-0 member.
  ///
  /// The group's nodes are in the reset state; nothing can reach them until
  /// the caller links the group into the tree.
  pub fn allocate_group(&self) -> Result<NodeId> {
    let index = {
      let mut alloc = self.lock_alloc();
      match alloc.free.pop() {
        Some(index) => index,
        None => {
          if alloc.next as usize >= self.max_groups {
            return Err(OctreeError::ArenaFull {
              capacity: self.max_groups,
            });
          }
          let index = alloc.next;
          alloc.next += 1;
          index
        }
      }
    };

    let segment = self.segments[(index >> SEGMENT_SHIFT) as usize]
      .get_or_init(|| (0..SEGMENT_GROUPS).map(|_| NodeGroup::default()).collect());
    let group = &segment[(index & SEGMENT_MASK) as usize];
    self.live_groups.fetch_add(1, Ordering::Relaxed);
    Ok(NodeId::new(index, group.generation(), 0))
  }

  /// Return a group that was never published back to the free list.
  pub fn release_group(&self, first: NodeId) {
    if self.recycle(first.group()) {
      self.lock_alloc().free.push(first.group());
    }
  }

  /// Park a deleted group until the grace period has passed.
  pub fn bury_group(&self, first: NodeId) {
    let sweep = self.sweep.load(Ordering::Acquire);
    self
      .graveyard
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .push((sweep, first.group()));
  }

  /// Advance the sweep counter and recycle groups buried at least
  /// [`TOMBSTONE_GRACE_SWEEPS`] sweeps ago. Returns the number recycled.
  ///
  /// Must not run concurrently with traversal: readers holding a node
  /// reference across the recycle would observe a reset node.
  pub fn begin_sweep(&self) -> usize {
    let sweep = self.sweep.fetch_add(1, Ordering::AcqRel) + 1;
    let ripe: Vec<u32> = {
      let mut graveyard = self
        .graveyard
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
      let (ripe, waiting): (Vec<_>, Vec<_>) = graveyard
        .drain(..)
        .partition(|&(buried, _)| buried + TOMBSTONE_GRACE_SWEEPS <= sweep);
      *graveyard = waiting;
      ripe.into_iter().map(|(_, group)| group).collect()
    };

    let recycled: Vec<u32> = ripe.into_iter().filter(|&g| self.recycle(g)).collect();
    let count = recycled.len();
    self.lock_alloc().free.extend(recycled);
    count
  }

  /// Current sweep number.
  pub fn sweep(&self) -> u64 {
    self.sweep.load(Ordering::Acquire)
  }

  /// Groups handed out and not yet recycled (buried groups included).
  pub fn live_groups(&self) -> usize {
    self.live_groups.load(Ordering::Relaxed)
  }

  /// Groups waiting in the graveyard.
  pub fn buried_groups(&self) -> usize {
    self
      .graveyard
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
      .len()
  }

  /// Maximum number of groups.
  pub fn capacity(&self) -> usize {
    self.max_groups
  }

  /// Invalidate outstanding handles to `index` and reset its nodes.
  fn recycle(&self, index: u32) -> bool {
    let Some(group) = self.group(index) else {
      return false;
    };
    group
      .generation
      .store(next_generation(group.generation()), Ordering::Release);
    for node in &group.nodes {
      let _guard = node.lock();
      node.reset();
    }
    self.live_groups.fetch_sub(1, Ordering::Relaxed);
    true
  }

  fn lock_alloc(&self) -> std::sync::MutexGuard<'_, Allocator> {
    self.alloc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Default for NodeArena {
  fn default() -> Self {
    Self::with_capacity(DEFAULT_MAX_GROUPS)
  }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
