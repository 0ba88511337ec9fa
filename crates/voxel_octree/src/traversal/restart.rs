//! Restart walk: every empty leaf sends the ray back to the starting node.
//!
//! Slower than following neighbor pointers, but it reads nothing except
//! child links. Kept as the reference the neighbor walk is checked against.

use super::{RayHit, Traversal};
use crate::constants::ENTRY_NUDGE;
use crate::error::Result;
use crate::octree::{NodeBox, NodeId};
use crate::ray::Ray;

impl Traversal<'_> {
  pub(super) fn walk_restart(&self, ray: &Ray, start: NodeId, start_box: NodeBox) -> Result<RayHit> {
    let Some(span) = ray.clip(&start_box) else {
      return Ok(RayHit::MISS);
    };
    let tree = self.tree;
    let mut origin = (start, start_box);
    let mut tmin = span.tmin;
    let mut nudge_dim = start_box.dim;
    let mut steps = 0u32;

    loop {
      self.step(&mut steps)?;

      let p = ray.at(tmin + ENTRY_NUDGE * nudge_dim);
      let origin_live = tree.live_node(origin.0).is_some();
      if !origin_live || !origin.1.contains_point(p) {
        // Left the skip node (or lost it): the root covers everything else.
        if origin.0 == tree.root() || !NodeBox::ROOT.contains_point(p) {
          return Ok(RayHit::miss(steps));
        }
        origin = (tree.root(), NodeBox::ROOT);
      }

      let (mut id, mut bounds) = origin;
      let Some(mut node) = tree.live_node(id) else {
        return Ok(RayHit::miss(steps));
      };
      tree.visit(id);

      while !node.is_leaf() {
        if self.lod.is_sub_pixel(bounds.dim, tmin) {
          return Ok(RayHit::hit(node.color(), tmin, steps));
        }
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

      let (tmax, _) = ray.exit(&bounds);
      tmin = tmax;
      nudge_dim = bounds.dim;
    }
  }
}
