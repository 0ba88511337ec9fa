//! Filling empty cells around a freshly split node.
//!
//! A cell is classified once, at the size it had when its parent was split.
//! Cells next to the surface can come out empty at a coarse level even
//! though the oracle, asked at a finer probe radius, finds detail there.
//! After each split the 26 same-size cells around the node are checked and
//! any such cell is carved out of its empty ancestor and filled.
//!
//! ```text
//!   ┌───┬───┬───┐
//!   │ · │ · │ · │     walk to each cell by face links, finest link first
//!   ├───┼───┼───┤     (X before Y before Z on ties)
//!   │ · │ N │ · │
//!   ├───┼───┼───┤     empty leaf at depth ≤ N's depth and oracle says
//!   │ · │ · │ · │     "detail"  ──►  split down to N's depth, fill cell
//!   └───┴───┴───┘
//! ```

use crate::bricks::BrickManager;
use crate::color::positional_color;
use crate::error::Result;
use crate::octree::{flags, Face, NodeBox, NodeId, Octree, VoxelNode};
use crate::oracle::FractalOracle;

use super::subdivide::{collapse_empty_ancestors, probe_radius, split_leaf};
use super::SubdivisionRequest;

/// Offsets of the 26 cells surrounding a cell.
fn surrounding() -> impl Iterator<Item = [i32; 3]> {
  (-1..=1)
    .flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| [dx, dy, dz])))
    .filter(|offset| *offset != [0, 0, 0])
}

/// Check the cells around the node of `request` and fill the ones the
/// oracle finds detail in. Returns the number of cells filled.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "subdivider::fill_exposed"))]
pub fn fill_exposed(
  tree: &Octree,
  oracle: &dyn FractalOracle,
  bricks: &BrickManager,
  request: SubdivisionRequest,
) -> Result<u32> {
  let SubdivisionRequest { node: id, bounds } = request;
  let Some(node) = tree.live_node(id) else {
    return Ok(0);
  };
  let depth = node.depth();

  let mut filled = 0;
  for offset in surrounding() {
    let target = bounds.offset(offset[0], offset[1], offset[2]);
    let center = target.center();
    if !NodeBox::ROOT.contains_point(center) {
      continue;
    }
    let Some((near, near_box)) = walk_toward(tree, id, bounds, offset)? else {
      continue;
    };
    if !near_box.contains_point(center) {
      continue;
    }
    let Some((leaf, leaf_box)) = tree.locate(near, near_box, center) else {
      continue;
    };
    let eligible = tree
      .live_node(leaf)
      .is_some_and(|n| n.is_leaf() && n.is_empty() && n.depth() <= depth);
    if !eligible || !oracle.contains_detail(center, probe_radius(target.dim))? {
      continue;
    }
    if fill_cell(tree, bricks, leaf, leaf_box, target, depth)? {
      filled += 1;
    }
  }
  if filled > 0 {
    tracing::trace!(node = ?id, filled, "filled exposed neighbor cells");
  }
  Ok(filled)
}

/// Follow face links from `id` along each nonzero axis of `offset`, taking
/// the finest available neighbor first. Returns the node reached and its box.
fn walk_toward(
  tree: &Octree,
  id: NodeId,
  bounds: NodeBox,
  offset: [i32; 3],
) -> Result<Option<(NodeId, NodeBox)>> {
  let mut remaining = offset;
  let mut current = (id, bounds);

  while remaining != [0, 0, 0] {
    let mut best: Option<(usize, Face, NodeId, u8)> = None;
    for axis in 0..3 {
      if remaining[axis] == 0 {
        continue;
      }
      let face = Face::from_axis(axis, remaining[axis] > 0);
      let Some(next) = tree.resolve_neighbor(current.0, face)? else {
        continue;
      };
      let Some(next_depth) = tree.live_node(next).map(VoxelNode::depth) else {
        continue;
      };
      if best.map_or(true, |(_, _, _, d)| next_depth > d) {
        best = Some((axis, face, next, next_depth));
      }
    }
    let Some((axis, face, next, next_depth)) = best else {
      return Ok(None);
    };
    let stepped = current.1.step(face);
    let current_depth = tree.live_node(current.0).map_or(0, VoxelNode::depth);
    let next_box = if next_depth < current_depth {
      stepped.snap_to_depth(next_depth)
    } else {
      stepped
    };
    current = (next, next_box);
    remaining[axis] = 0;
  }
  Ok(Some(current))
}

/// Carve `target` out of the empty leaf `leaf` by splitting down to
/// `depth`, then mark it full. Intermediate nodes take the target's color.
fn fill_cell(
  tree: &Octree,
  bricks: &BrickManager,
  leaf: NodeId,
  leaf_box: NodeBox,
  target: NodeBox,
  depth: u8,
) -> Result<bool> {
  let center = target.center();
  let color = positional_color(center);
  let (mut id, mut bounds) = (leaf, leaf_box);

  loop {
    let Some(node) = tree.live_node(id) else {
      return Ok(false);
    };
    if node.depth() >= depth {
      break;
    }
    if split_leaf(tree, bricks, id, [None; 8], color, VoxelNode::is_empty)?.is_none() {
      collapse_empty_ancestors(tree, id);
      return Ok(false);
    }
    let octant = bounds.octant_of(center);
    let Some(child) = node.child(octant) else {
      return Ok(false);
    };
    id = child;
    bounds = bounds.child(octant);
  }

  let Some(node) = tree.live_node(id) else {
    return Ok(false);
  };
  let filled = {
    let _lock = node.lock();
    let ok = node.is_leaf() && node.is_empty() && !node.is_deleted();
    if ok {
      node.set_color(color);
      node.clear_flags(flags::EMPTY);
    }
    ok
  };
  if !filled {
    // Undo any all-empty splits made on the way down.
    collapse_empty_ancestors(tree, id);
  }
  Ok(filled)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use glam::DVec3;

  use super::*;
  use crate::oracle::{FnOracle, SolidOracle};
  use crate::test_utils::{bricks_for, split};

  #[test]
  fn test_surrounding_offsets() {
    let offsets: Vec<_> = surrounding().collect();
    assert_eq!(offsets.len(), 26);
    assert!(!offsets.contains(&[0, 0, 0]));
    assert!(offsets.contains(&[-1, 1, 1]));
  }

  /// A cell left empty by a coarse split gets filled once the oracle finds
  /// detail there next to a finer cell.
  #[test]
  fn test_fill_exposed_carves_coarse_empty_cell() {
    let tree = Arc::new(Octree::new(0x808080));
    let bricks = bricks_for(&tree);
    // Root split: only the -X half has detail, so octant 7 is an empty leaf.
    split(&tree, &bricks, tree.root(), NodeBox::ROOT, &FnOracle(|p: DVec3| Ok(p.x < 0.0)));
    let near = tree.node(tree.root()).unwrap().child(6).unwrap();
    let near_box = NodeBox::ROOT.child(6);
    split(&tree, &bricks, near, near_box, &SolidOracle);

    // Depth-2 cell touching the empty +X half.
    let cell = tree.node(near).unwrap().child(7).unwrap();
    let cell_box = near_box.child(7);
    let filled = fill_exposed(
      &tree,
      &SolidOracle,
      &bricks,
      SubdivisionRequest {
        node: cell,
        bounds: cell_box,
      },
    )
    .unwrap();
    assert!(filled > 0, "cells across +X should be carved out");

    let target = cell_box.step(Face::PosX);
    let (leaf, leaf_box) = tree.locate(tree.root(), NodeBox::ROOT, target.center()).unwrap();
    let leaf = tree.node(leaf).unwrap();
    assert!(leaf.is_leaf());
    assert!(!leaf.is_empty());
    assert_eq!(leaf.depth(), 2);
    assert_eq!(leaf_box, target);
    assert_eq!(leaf.color(), positional_color(target.center()));
    let problems = tree.check_invariants();
    assert!(problems.is_empty(), "{problems:?}");
  }

  /// Nothing is filled when the oracle still sees no detail.
  #[test]
  fn test_fill_exposed_respects_oracle() {
    let tree = Arc::new(Octree::new(0x808080));
    let bricks = bricks_for(&tree);
    let half = FnOracle(|p: DVec3| Ok(p.x < 0.0));
    split(&tree, &bricks, tree.root(), NodeBox::ROOT, &half);
    let first = tree.node(tree.root()).unwrap().first_child().unwrap();
    let filled = fill_exposed(
      &tree,
      &half,
      &bricks,
      SubdivisionRequest {
        node: first,
        bounds: NodeBox::ROOT.child(0),
      },
    )
    .unwrap();
    assert_eq!(filled, 0);
    assert_eq!(tree.counts().empty_leaves, 4);
  }
}
