//! VoxelNode - one cube of the sparse octree, stored in the arena.
//!
//! Nodes never store their own position. Traversal carries a [`NodeBox`]
//! alongside each [`NodeId`] and derives child boxes on the way down.
//!
//! Every field is an atomic so that rays can read the tree while the
//! subdivider and the brick manager rewrite it. Writers serialize on the
//! node's own [`VoxelNode::lock`]; readers never take it.
//!
//! [`NodeBox`]: super::NodeBox

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

// =============================================================================
// NodeId - generation-checked handle
// =============================================================================

const OCTANT_BITS: u32 = 3;
const GENERATION_BITS: u32 = 29;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;
const NULL_REF: u64 = u64::MAX;

/// Handle to a node in the arena.
///
/// Packs the sibling group index, the octant within the group, and the group
/// generation at the time the handle was issued. A handle whose generation no
/// longer matches its group refers to a recycled slot and must not be used.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId {
  group: u32,
  generation: u32,
  octant: u8,
}

impl NodeId {
  pub(crate) fn new(group: u32, generation: u32, octant: u8) -> Self {
    debug_assert!(octant < 8);
    Self {
      group,
      generation: generation & GENERATION_MASK,
      octant,
    }
  }

  /// Sibling group index in the arena.
  #[inline]
  pub fn group(&self) -> u32 {
    self.group
  }

  /// Generation of the group when this handle was created.
  #[inline]
  pub fn generation(&self) -> u32 {
    self.generation
  }

  /// Position within the parent: bit 0 = +X half, bit 1 = +Y, bit 2 = +Z.
  #[inline]
  pub fn octant(&self) -> u8 {
    self.octant
  }

  /// Handle to another member of the same sibling group.
  #[inline]
  pub fn sibling(&self, octant: u8) -> Self {
    Self::new(self.group, self.generation, octant)
  }

  #[inline]
  fn to_bits(self) -> u64 {
    ((self.group as u64) << 32)
      | ((self.generation as u64) << OCTANT_BITS)
      | self.octant as u64
  }

  #[inline]
  fn from_bits(bits: u64) -> Option<Self> {
    if bits == NULL_REF {
      return None;
    }
    Some(Self {
      group: (bits >> 32) as u32,
      generation: ((bits as u32) >> OCTANT_BITS) & GENERATION_MASK,
      octant: (bits & 0b111) as u8,
    })
  }
}

/// Bump a group generation, wrapping within the packed bit budget.
#[inline]
pub(crate) fn next_generation(generation: u32) -> u32 {
  generation.wrapping_add(1) & GENERATION_MASK
}

/// Atomic, nullable [`NodeId`] slot.
pub struct NodeRef(AtomicU64);

impl NodeRef {
  pub const fn null() -> Self {
    Self(AtomicU64::new(NULL_REF))
  }

  #[inline]
  pub fn load(&self) -> Option<NodeId> {
    NodeId::from_bits(self.0.load(Ordering::Acquire))
  }

  #[inline]
  pub fn store(&self, id: Option<NodeId>) {
    self.0.store(id.map_or(NULL_REF, NodeId::to_bits), Ordering::Release);
  }

  /// Replace `current` with `new`; fails silently if another writer got
  /// there first.
  #[inline]
  pub fn compare_exchange(&self, current: Option<NodeId>, new: Option<NodeId>) -> bool {
    self
      .0
      .compare_exchange(
        current.map_or(NULL_REF, NodeId::to_bits),
        new.map_or(NULL_REF, NodeId::to_bits),
        Ordering::AcqRel,
        Ordering::Acquire,
      )
      .is_ok()
  }
}

impl Default for NodeRef {
  fn default() -> Self {
    Self::null()
  }
}

// =============================================================================
// Face / octant helpers
// =============================================================================

/// Axis-aligned face of a cube, indexed `+X, -X, +Y, -Y, +Z, -Z`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum Face {
  PosX = 0,
  NegX = 1,
  PosY = 2,
  NegY = 3,
  PosZ = 4,
  NegZ = 5,
}

impl Face {
  /// All faces in neighbor-slot order.
  pub const ALL: [Face; 6] = [
    Face::PosX,
    Face::NegX,
    Face::PosY,
    Face::NegY,
    Face::PosZ,
    Face::NegZ,
  ];

  /// Face on `axis` (0 = X, 1 = Y, 2 = Z) pointing along `positive`.
  #[inline]
  pub fn from_axis(axis: usize, positive: bool) -> Self {
    Self::ALL[axis * 2 + usize::from(!positive)]
  }

  #[inline]
  pub fn index(self) -> usize {
    self as usize
  }

  /// 0 = X, 1 = Y, 2 = Z.
  #[inline]
  pub fn axis(self) -> usize {
    self.index() / 2
  }

  #[inline]
  pub fn is_positive(self) -> bool {
    self.index() % 2 == 0
  }

  #[inline]
  pub fn opposite(self) -> Self {
    Self::ALL[self.index() ^ 1]
  }

  /// `+1.0` or `-1.0` along the face's axis.
  #[inline]
  pub fn sign(self) -> f64 {
    if self.is_positive() {
      1.0
    } else {
      -1.0
    }
  }
}

/// Octant index from per-axis halves (true = upper half).
#[inline]
pub fn octant_from_halves(x: bool, y: bool, z: bool) -> u8 {
  u8::from(x) | (u8::from(y) << 1) | (u8::from(z) << 2)
}

/// True if `octant` lies in the upper half along `axis`.
#[inline]
pub fn octant_is_upper(octant: u8, axis: usize) -> bool {
  (octant >> axis) & 1 == 1
}

/// True when a child in `octant` touches its parent's `face`.
///
/// Faces that do not touch the parent's boundary are shared with a sibling.
#[inline]
pub fn octant_on_parent_face(octant: u8, face: Face) -> bool {
  octant_is_upper(octant, face.axis()) == face.is_positive()
}

/// Mirror `octant` across `axis`.
#[inline]
pub fn octant_flip(octant: u8, axis: usize) -> u8 {
  octant ^ (1 << axis)
}

// =============================================================================
// VoxelNode
// =============================================================================

/// Node state flags.
pub mod flags {
  /// Slot holds a node (unused root-group siblings and free slots don't).
  pub const LIVE: u8 = 1 << 0;
  /// No children. Cleared last when a subdivision is published.
  pub const LEAF: u8 = 1 << 1;
  /// Contains no surface detail.
  pub const EMPTY: u8 = 1 << 2;
  /// A subdivision request for this node is outstanding.
  pub const QUEUED: u8 = 1 << 3;
  /// Touched by a ray since the last brick sweep.
  pub const VISITED: u8 = 1 << 4;
  /// Collapsed away by unification; only `brick` is meaningful.
  pub const DELETED: u8 = 1 << 5;
  /// Registered with the brick manager.
  pub const BRICK: u8 = 1 << 6;
}

/// One octree node.
pub struct VoxelNode {
  flags: AtomicU8,
  depth: AtomicU8,
  color: AtomicU32,
  /// First member of the child group (octant 0); null for leaves.
  children: NodeRef,
  /// Parent node; null for the root.
  pub(crate) parent: NodeRef,
  /// Nearest brick checkpoint at or above this node, or the forwarding
  /// target once deleted.
  pub(crate) brick: NodeRef,
  /// Face neighbors in [`Face`] order.
  pub(crate) neighbors: [NodeRef; 6],
  lock: Mutex<()>,
}

impl Default for VoxelNode {
  fn default() -> Self {
    Self {
      flags: AtomicU8::new(0),
      depth: AtomicU8::new(0),
      color: AtomicU32::new(0),
      children: NodeRef::null(),
      parent: NodeRef::null(),
      brick: NodeRef::null(),
      neighbors: Default::default(),
      lock: Mutex::new(()),
    }
  }
}

impl VoxelNode {
  /// Node-scoped writer lock.
  ///
  /// The lock guards no data of its own; it orders writers that touch the
  /// same node. A poisoned lock is recovered since every write it orders is a
  /// single atomic store.
  pub fn lock(&self) -> MutexGuard<'_, ()> {
    self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  #[inline]
  pub fn flags(&self) -> u8 {
    self.flags.load(Ordering::Acquire)
  }

  #[inline]
  pub(crate) fn set_flags(&self, bits: u8) {
    self.flags.fetch_or(bits, Ordering::AcqRel);
  }

  #[inline]
  pub(crate) fn clear_flags(&self, bits: u8) {
    self.flags.fetch_and(!bits, Ordering::AcqRel);
  }

  /// Set `bits`, returning true only for the caller that flipped them.
  #[inline]
  pub(crate) fn try_set_flag(&self, bit: u8) -> bool {
    self.flags.fetch_or(bit, Ordering::AcqRel) & bit == 0
  }

  #[inline]
  pub(crate) fn reset_flags(&self, bits: u8) {
    self.flags.store(bits, Ordering::Release);
  }

  #[inline]
  pub fn is_live(&self) -> bool {
    self.flags() & flags::LIVE != 0
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.flags() & flags::LEAF != 0
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.flags() & flags::EMPTY != 0
  }

  #[inline]
  pub fn is_deleted(&self) -> bool {
    self.flags() & flags::DELETED != 0
  }

  #[inline]
  pub fn is_visited(&self) -> bool {
    self.flags() & flags::VISITED != 0
  }

  #[inline]
  pub fn is_queued(&self) -> bool {
    self.flags() & flags::QUEUED != 0
  }

  #[inline]
  pub fn depth(&self) -> u8 {
    self.depth.load(Ordering::Relaxed)
  }

  #[inline]
  pub(crate) fn set_depth(&self, depth: u8) {
    self.depth.store(depth, Ordering::Relaxed);
  }

  #[inline]
  pub fn color(&self) -> u32 {
    self.color.load(Ordering::Relaxed)
  }

  #[inline]
  pub(crate) fn set_color(&self, rgb: u32) {
    self.color.store(rgb, Ordering::Relaxed);
  }

  /// First member of the child group, or `None` for a leaf.
  #[inline]
  pub fn first_child(&self) -> Option<NodeId> {
    self.children.load()
  }

  #[inline]
  pub(crate) fn set_first_child(&self, child: Option<NodeId>) {
    self.children.store(child);
  }

  /// Child in `octant`, or `None` for a leaf.
  #[inline]
  pub fn child(&self, octant: u8) -> Option<NodeId> {
    self.first_child().map(|first| first.sibling(octant))
  }

  #[inline]
  pub fn parent(&self) -> Option<NodeId> {
    self.parent.load()
  }

  #[inline]
  pub fn brick(&self) -> Option<NodeId> {
    self.brick.load()
  }

  /// Raw neighbor pointer for `face`, possibly stale or deleted.
  #[inline]
  pub fn neighbor(&self, face: Face) -> Option<NodeId> {
    self.neighbors[face.index()].load()
  }

  /// Turn a live node into a tombstone forwarding to `target`.
  ///
  /// The forwarding pointer is written before `DELETED` is published, so a
  /// reader that sees the flag also sees where to go.
  pub(crate) fn mark_deleted(&self, target: NodeId) {
    self.brick.store(Some(target));
    self.set_flags(flags::DELETED);
    self.clear_flags(flags::QUEUED | flags::VISITED | flags::BRICK);
  }

  /// Clear every field back to the free-slot state.
  pub(crate) fn reset(&self) {
    self.reset_flags(0);
    self.set_depth(0);
    self.set_color(0);
    self.children.store(None);
    self.parent.store(None);
    self.brick.store(None);
    for slot in &self.neighbors {
      slot.store(None);
    }
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
