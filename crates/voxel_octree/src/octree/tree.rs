//! Octree - the shared node graph plus the read-side protocols.
//!
//! Three kinds of pointer leave a node: children (owned), parent and brick
//! (back references) and six face neighbors (lateral links). Only the
//! neighbor links can go stale: a neighbor may be deleted by unification or
//! its slot may even have been recycled. Readers repair such links as they
//! find them:
//!
//! ```text
//! neighbor ──► tombstone ──brick──► tombstone ──brick──► live node
//!    ▲                                                     │
//!    └──────────────── compare-and-swap ◄──────────────────┘
//!
//! neighbor ──► recycled slot (generation mismatch)
//!    ▲
//!    └── re-derive: sibling, or the parent's own neighbor
//! ```

use std::sync::MutexGuard;

use glam::DVec3;

use super::arena::{NodeArena, DEFAULT_MAX_GROUPS};
use super::bounds::NodeBox;
use super::node::{flags, octant_flip, octant_on_parent_face, Face, NodeId, VoxelNode};
use crate::constants::MAX_DEPTH;
use crate::error::{OctreeError, Result};

/// Node population by kind, from a full walk of the live tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeCounts {
  pub interior: usize,
  pub full_leaves: usize,
  pub empty_leaves: usize,
  pub max_depth: u8,
}

impl TreeCounts {
  /// All reachable nodes.
  #[inline]
  pub fn total(&self) -> usize {
    self.interior + self.full_leaves + self.empty_leaves
  }
}

/// Sparse voxel octree over the root cube.
pub struct Octree {
  arena: NodeArena,
  root: NodeId,
}

impl Octree {
  /// Create a tree whose root is a single full leaf of `root_color`.
  pub fn new(root_color: u32) -> Self {
    Self::with_capacity(root_color, DEFAULT_MAX_GROUPS)
  }

  /// Like [`Octree::new`] with an explicit arena capacity in sibling groups.
  ///
  /// # Panics
  /// Never: the root group is always the first allocation of a fresh arena.
  pub fn with_capacity(root_color: u32, max_groups: usize) -> Self {
    // Group 0 holds the root; its other seven slots stay unused.
    let arena = NodeArena::with_capacity(max_groups.max(1) + 1);
    let root = match arena.allocate_group() {
      Ok(id) => id,
      Err(_) => unreachable!("fresh arena has room for the root group"),
    };
    let tree = Self { arena, root };
    if let Some(node) = tree.arena.get(root) {
      node.set_color(root_color);
      node.brick.store(Some(root));
      node.reset_flags(flags::LIVE | flags::LEAF);
    }
    tree
  }

  #[inline]
  pub fn root(&self) -> NodeId {
    self.root
  }

  #[inline]
  pub fn arena(&self) -> &NodeArena {
    &self.arena
  }

  /// Node behind `id` if the handle is current. May be a tombstone.
  #[inline]
  pub fn node(&self, id: NodeId) -> Option<&VoxelNode> {
    self.arena.get(id)
  }

  /// Node behind `id` if the handle is current and the node is not deleted.
  #[inline]
  pub fn live_node(&self, id: NodeId) -> Option<&VoxelNode> {
    self
      .arena
      .get(id)
      .filter(|node| node.flags() & (flags::LIVE | flags::DELETED) == flags::LIVE)
  }

  /// Lock the node behind `id`, then check that the handle is still current
  /// and the node not deleted.
  ///
  /// Recycling bumps the generation before it resets a slot, and deletion
  /// happens under the node lock, so the returned node stays the one `id`
  /// names until the guard drops.
  pub fn lock_live(&self, id: NodeId) -> Option<(&VoxelNode, MutexGuard<'_, ()>)> {
    let node = self.arena.get(id)?;
    let guard = node.lock();
    self.live_node(id)?;
    Some((node, guard))
  }

  // ===========================================================================
  // Bookkeeping flags
  // ===========================================================================

  /// Mark `id` as touched by a ray, along with every brick above it up to
  /// the first one already marked in this sweep window.
  pub fn visit(&self, id: NodeId) {
    let Some(node) = self.arena.get(id) else {
      return;
    };
    if !node.is_visited() {
      node.set_flags(flags::VISITED);
    }

    let mut next = node.brick();
    if next == Some(id) {
      next = self.parent_brick(node);
    }
    while let Some(brick_id) = next {
      let Some(brick) = self.live_node(brick_id) else {
        break;
      };
      if !brick.try_set_flag(flags::VISITED) {
        break;
      }
      next = self.parent_brick(brick);
    }
  }

  fn parent_brick(&self, node: &VoxelNode) -> Option<NodeId> {
    node
      .parent()
      .and_then(|parent| self.live_node(parent))
      .and_then(VoxelNode::brick)
  }

  /// Claim the subdivision gate for `id`. Returns true for exactly one
  /// caller until [`Octree::clear_queued`] runs.
  #[inline]
  pub fn try_mark_queued(&self, id: NodeId) -> bool {
    self
      .live_node(id)
      .is_some_and(|node| node.try_set_flag(flags::QUEUED))
  }

  #[inline]
  pub fn clear_queued(&self, id: NodeId) {
    if let Some(node) = self.arena.get(id) {
      node.clear_flags(flags::QUEUED);
    }
  }

  // ===========================================================================
  // Forwarding and neighbor healing
  // ===========================================================================

  /// Follow `brick` forwarding pointers from `id` to the first live node.
  ///
  /// Returns `Ok(None)` if the chain runs into a recycled slot; the caller
  /// should re-derive the link instead.
  pub fn forward(&self, id: NodeId) -> Result<Option<NodeId>> {
    let mut current = id;
    for hops in 0..=u32::from(MAX_DEPTH) {
      let Some(node) = self.arena.get(current) else {
        return Ok(None);
      };
      if !node.is_deleted() {
        return Ok(node.is_live().then_some(current));
      }
      match node.brick() {
        Some(next) if next != current => current = next,
        _ => {
          tracing::error!(node = ?id, hops, "deleted node has no forwarding target");
          return Err(OctreeError::BrokenForwarding { node: id, hops });
        }
      }
    }
    tracing::error!(node = ?id, "forwarding chain longer than the tree is deep");
    Err(OctreeError::BrokenForwarding {
      node: id,
      hops: u32::from(MAX_DEPTH) + 1,
    })
  }

  /// Neighbor of `id` across `face`, repairing the stored link if it points
  /// at a deleted or recycled node.
  ///
  /// `Ok(None)` means the face lies on the root boundary.
  pub fn resolve_neighbor(&self, id: NodeId, face: Face) -> Result<Option<NodeId>> {
    let Some(node) = self.arena.get(id) else {
      return Ok(None);
    };
    let raw = node.neighbor(face);
    let Some(neighbor) = raw else {
      return Ok(None);
    };

    let healed = match self.arena.get(neighbor) {
      Some(n) if n.is_live() && !n.is_deleted() => return Ok(Some(neighbor)),
      Some(n) if n.is_deleted() => match self.forward(neighbor)? {
        Some(live) => Some(live),
        None => self.derive_neighbor(id, face)?,
      },
      _ => self.derive_neighbor(id, face)?,
    };

    if node.neighbors[face.index()].compare_exchange(raw, healed) {
      tracing::trace!(node = ?id, ?face, from = ?raw, to = ?healed, "healed neighbor link");
    }
    Ok(healed)
  }

  /// Rebuild the neighbor of `id` across `face` from structure alone: the
  /// sibling when the face is internal to the parent, otherwise whatever the
  /// parent sees across the same face.
  fn derive_neighbor(&self, id: NodeId, face: Face) -> Result<Option<NodeId>> {
    let Some(parent) = self.arena.get(id).and_then(VoxelNode::parent) else {
      return Ok(None);
    };
    if !octant_on_parent_face(id.octant(), face) {
      return Ok(Some(id.sibling(octant_flip(id.octant(), face.axis()))));
    }
    self.resolve_neighbor(parent, face)
  }

  /// Point `id`'s `face` link at `target`, if it still holds `expected`.
  ///
  /// When `target` sits at the same depth as `id`, its opposite link is
  /// pointed back at `id` so equal-depth pairs stay symmetric.
  pub fn relink_neighbor(
    &self,
    id: NodeId,
    face: Face,
    expected: Option<NodeId>,
    target: NodeId,
  ) -> bool {
    let (Some(node), Some(other)) = (self.live_node(id), self.live_node(target)) else {
      return false;
    };
    if !node.neighbors[face.index()].compare_exchange(expected, Some(target)) {
      return false;
    }
    if other.depth() == node.depth() {
      other.neighbors[face.opposite().index()].store(Some(id));
    }
    true
  }

  // ===========================================================================
  // Queries
  // ===========================================================================

  /// Descend from `start` to the leaf containing `point`.
  ///
  /// Returns `None` if a stale or deleted node is met on the way.
  pub fn locate(&self, start: NodeId, start_box: NodeBox, point: DVec3) -> Option<(NodeId, NodeBox)> {
    let mut id = start;
    let mut bounds = start_box;
    loop {
      let node = self.live_node(id)?;
      if node.is_leaf() {
        return Some((id, bounds));
      }
      let octant = bounds.octant_of(point);
      id = node.child(octant)?;
      bounds = bounds.child(octant);
    }
  }

  /// Descend from the root toward `point`, stopping at `depth` or at the
  /// first leaf, whichever comes first.
  pub fn locate_depth(&self, point: DVec3, depth: u8) -> Option<(NodeId, NodeBox)> {
    let mut id = self.root;
    let mut bounds = NodeBox::ROOT;
    loop {
      let node = self.live_node(id)?;
      if node.is_leaf() || node.depth() >= depth {
        return Some((id, bounds));
      }
      let octant = bounds.octant_of(point);
      id = node.child(octant)?;
      bounds = bounds.child(octant);
    }
  }

  /// Count reachable nodes by kind.
  pub fn counts(&self) -> TreeCounts {
    let mut counts = TreeCounts::default();
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let Some(node) = self.live_node(id) else {
        continue;
      };
      counts.max_depth = counts.max_depth.max(node.depth());
      match node.first_child() {
        Some(first) if !node.is_leaf() => {
          counts.interior += 1;
          stack.extend((0..8).map(|octant| first.sibling(octant)));
        }
        _ if node.is_empty() => counts.empty_leaves += 1,
        _ => counts.full_leaves += 1,
      }
    }
    counts
  }

  /// Walk the live tree and report every broken structural invariant.
  ///
  /// Only meaningful while no writer is active.
  pub fn check_invariants(&self) -> Vec<String> {
    let mut problems = Vec::new();
    let mut stack = vec![self.root];
    while let Some(id) = stack.pop() {
      let Some(node) = self.live_node(id) else {
        problems.push(format!("{id:?}: reachable but not live"));
        continue;
      };

      match (node.is_leaf(), node.first_child()) {
        (true, Some(_)) => problems.push(format!("{id:?}: leaf with children")),
        (false, None) => problems.push(format!("{id:?}: interior without children")),
        (false, Some(first)) => {
          if node.is_empty() {
            problems.push(format!("{id:?}: interior node flagged empty"));
          }
          let mut all_empty = true;
          for octant in 0..8 {
            let child_id = first.sibling(octant);
            let Some(child) = self.live_node(child_id) else {
              problems.push(format!("{id:?}: child {octant} missing"));
              continue;
            };
            if child.depth() != node.depth() + 1 {
              problems.push(format!("{child_id:?}: depth {} under parent depth {}", child.depth(), node.depth()));
            }
            if child.parent() != Some(id) {
              problems.push(format!("{child_id:?}: parent link does not point at {id:?}"));
            }
            all_empty &= child.is_leaf() && child.is_empty();
            stack.push(child_id);
          }
          if all_empty {
            problems.push(format!("{id:?}: interior node with only empty children"));
          }
        }
        (true, None) => {}
      }

      for face in Face::ALL {
        let Some(neighbor_id) = node.neighbor(face) else {
          continue;
        };
        let Some(neighbor) = self.live_node(neighbor_id) else {
          continue;
        };
        if neighbor.depth() > node.depth() {
          problems.push(format!("{id:?}: {face:?} neighbor {neighbor_id:?} is finer"));
        } else if neighbor.depth() == node.depth() && neighbor.neighbor(face.opposite()) != Some(id) {
          problems.push(format!("{id:?}: {face:?} neighbor {neighbor_id:?} does not link back"));
        }
      }
    }
    problems
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
