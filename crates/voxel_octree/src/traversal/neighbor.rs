//! Neighbor-pointer walk.
//!
//! ```text
//!   enter ──► descend to leaf ──► full?  ──► color
//!               ▲                   │ empty
//!               │                   ▼
//!               └── neighbor ◄── exit face
//! ```
//!
//! A neighbor is never finer than the node holding the pointer. When it is
//! coarser, the stepped box is snapped onto the neighbor's grid and the
//! descent below it continues from the entry point.

use super::{RayHit, Traversal};
use crate::constants::ENTRY_NUDGE;
use crate::error::{OctreeError, Result};
use crate::octree::{Face, NodeBox, NodeId, VoxelNode};
use crate::ray::Ray;

impl Traversal<'_> {
  pub(super) fn walk_neighbors(&self, ray: &Ray, start: NodeId, start_box: NodeBox) -> Result<RayHit> {
    let Some(span) = ray.clip(&start_box) else {
      return Ok(RayHit::MISS);
    };
    let tree = self.tree;
    let mut tmin = span.tmin;
    let mut id = start;
    let mut bounds = start_box;
    let mut steps = 0u32;

    loop {
      self.step(&mut steps)?;
      (id, bounds) = self.settle(id, bounds)?;

      let p = ray.at(tmin + ENTRY_NUDGE * bounds.dim);
      let Some(mut node) = tree.node(id) else {
        return Ok(RayHit::miss(steps));
      };
      tree.visit(id);

      while !node.is_leaf() {
        if self.lod.is_sub_pixel(bounds.dim, tmin) {
          return Ok(RayHit::hit(node.color(), tmin, steps));
        }
        // Children may vanish under a concurrent collapse; the node then
        // stands in for its subtree.
        let Some(child) = node.child(bounds.octant_of(p)) else {
          break;
        };
        let Some(child_node) = tree.live_node(child) else {
          break;
        };
        bounds = bounds.child(child.octant());
        id = child;
        node = child_node;
        tree.visit(id);
      }

      if !node.is_empty() {
        self.maybe_request_subdivision(id, bounds, node.depth(), tmin);
        return Ok(RayHit::hit(node.color(), tmin, steps));
      }

      let (tmax, face) = ray.exit(&bounds);
      let Some(next) = tree.resolve_neighbor(id, face)? else {
        return Ok(RayHit::miss(steps));
      };
      let Some(next_node) = tree.node(next) else {
        return Ok(RayHit::miss(steps));
      };

      let stepped = bounds.step(face);
      let depth = node.depth();
      let next_depth = next_node.depth();
      if next_depth > depth {
        tracing::error!(node = ?id, neighbor = ?next, depth, next_depth, "neighbor pointer leads to a finer node");
        return Err(OctreeError::FinerNeighbor { node: id, neighbor: next });
      }

      (id, bounds) = if next_depth == depth {
        (next, stepped)
      } else {
        self.tighten(id, face, next, next_node, stepped)
      };
      tmin = tmax;
    }
  }

  /// Swap a deleted node for the live node it forwards to.
  ///
  /// Forwarding only climbs, so the box is snapped onto the target's grid.
  /// A chain ending in a recycled slot sends the ray back to the root.
  fn settle(&self, id: NodeId, bounds: NodeBox) -> Result<(NodeId, NodeBox)> {
    let tree = self.tree;
    let root = (tree.root(), NodeBox::ROOT);
    match tree.node(id) {
      Some(node) if !node.is_deleted() => Ok((id, bounds)),
      Some(_) => match tree.forward(id)? {
        Some(live) => {
          let depth = tree.node(live).map_or(0, VoxelNode::depth);
          Ok((live, bounds.snap_to_depth(depth)))
        }
        None => Ok(root),
      },
      None => Ok(root),
    }
  }

  /// Step into a coarser neighbor. If that neighbor has been split since
  /// the link was made, point the link one level closer to `id`'s size.
  fn tighten(
    &self,
    id: NodeId,
    face: Face,
    next: NodeId,
    next_node: &VoxelNode,
    stepped: NodeBox,
  ) -> (NodeId, NodeBox) {
    let snapped = stepped.snap_to_depth(next_node.depth());
    if next_node.is_leaf() {
      return (next, snapped);
    }
    let octant = snapped.octant_of(stepped.center());
    match next_node.child(octant) {
      Some(child) if self.tree.relink_neighbor(id, face, Some(next), child) => {
        tracing::trace!(node = ?id, ?face, from = ?next, to = ?child, "tightened neighbor link");
        (child, snapped.child(octant))
      }
      _ => (next, snapped),
    }
  }
}
