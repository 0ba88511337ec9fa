use std::sync::Arc;

use glam::DVec3;

use super::*;
use crate::constants::TOMBSTONE_GRACE_SWEEPS;
use crate::octree::{Face, NodeBox};
use crate::oracle::SolidOracle;
use crate::test_utils::{bricks_for, split, split_to_depth};

fn split_root() -> (Arc<Octree>, BrickManager) {
  let tree = Arc::new(Octree::new(0x101010));
  let bricks = bricks_for(&tree);
  split(&tree, &bricks, tree.root(), NodeBox::ROOT, &SolidOracle);
  (tree, bricks)
}

#[test]
fn test_add_brick_dedupes() {
  let (tree, bricks) = split_root();
  // The root registered itself when it was split.
  assert_eq!(bricks.brick_count(), 1);
  bricks.add_brick(tree.root());
  bricks.add_brick(tree.root());
  assert_eq!(bricks.brick_count(), 1);
}

/// An untouched brick collapses into a leaf; its children forward to it.
#[test]
fn test_unvisited_brick_collapses() {
  let (tree, bricks) = split_root();
  let first = tree.node(tree.root()).unwrap().first_child().unwrap();

  let stats = bricks.unify_bricks();
  assert_eq!(stats.collapsed, 1);
  assert_eq!(stats.retained, 0);
  assert_eq!(stats.nodes_deleted, 8);

  let root = tree.node(tree.root()).unwrap();
  assert!(root.is_leaf());
  assert!(root.first_child().is_none());
  assert_eq!(tree.counts().total(), 1);

  let child = tree.node(first.sibling(3)).unwrap();
  assert!(child.is_deleted());
  assert_eq!(tree.forward(first.sibling(3)).unwrap(), Some(tree.root()));
  assert_eq!(tree.arena().buried_groups(), 1);
}

/// A ray touching any node below a brick keeps the brick alive for one more
/// interval.
#[test]
fn test_visited_brick_is_retained() {
  let (tree, bricks) = split_root();
  let first = tree.node(tree.root()).unwrap().first_child().unwrap();
  tree.visit(first.sibling(5));
  assert!(tree.node(tree.root()).unwrap().is_visited());

  let stats = bricks.unify_bricks();
  assert_eq!(stats.retained, 1);
  assert_eq!(stats.collapsed, 0);
  let root = tree.node(tree.root()).unwrap();
  assert!(!root.is_leaf());
  assert!(!root.is_visited(), "marks are cleared for the next interval");

  // Nothing visited since: the next pass collapses it.
  assert_eq!(bricks.unify_bricks().collapsed, 1);
}

/// Unifying twice in a row is harmless: the second pass finds nothing.
#[test]
fn test_unify_is_idempotent() {
  let (_tree, bricks) = split_root();
  assert_eq!(bricks.unify_bricks().collapsed, 1);
  let again = bricks.unify_bricks();
  assert_eq!(again.collapsed, 0);
  assert_eq!(again.nodes_deleted, 0);
  assert_eq!(bricks.brick_count(), 0);
}

/// Tombstones stay readable for the grace period, then their slots are
/// recycled and old handles go stale.
#[test]
fn test_tombstones_recycled_after_grace() {
  let (tree, bricks) = split_root();
  let first = tree.node(tree.root()).unwrap().first_child().unwrap();
  bricks.unify_bricks();

  for _ in 1..TOMBSTONE_GRACE_SWEEPS {
    assert_eq!(bricks.unify_bricks().groups_recycled, 0);
    assert!(tree.node(first).is_some());
  }
  assert_eq!(bricks.unify_bricks().groups_recycled, 1);
  assert!(tree.node(first).is_none());
}

/// Nested bricks collapsed in the same pass leave a consistent tree.
#[test]
fn test_nested_bricks_collapse_together() {
  let tree = Arc::new(Octree::new(0x101010));
  let bricks = bricks_for(&tree);
  split_to_depth(&tree, &bricks, &SolidOracle, 4);
  // Root plus the 64 depth-2 nodes.
  assert_eq!(bricks.brick_count(), 65);

  let stats = bricks.unify_bricks();
  assert_eq!(stats.collapsed + stats.skipped, 65);
  assert_eq!(tree.counts().total(), 1);
  assert!(tree.check_invariants().is_empty());
}

/// Neighbor links into a collapsed subtree heal to the collapsed brick.
#[test]
fn test_links_into_collapsed_subtree_heal() {
  let tree = Arc::new(Octree::new(0x101010));
  let bricks = bricks_for(&tree);
  split_to_depth(&tree, &bricks, &SolidOracle, 3);

  // Depth-3 cell west of the depth-2 brick covering (0.5..1)³.
  let (west, west_box) = tree
    .locate(tree.root(), NodeBox::ROOT, DVec3::new(0.4, 0.9, 0.9))
    .unwrap();
  let (east_brick, east_box) = tree
    .locate_depth(DVec3::splat(0.75), 2)
    .unwrap();
  assert_eq!(east_box.dim, 0.5);

  // Tighten the west cell's +X link down to the equal-depth cell.
  let octant = east_box.octant_of(west_box.step(Face::PosX).center());
  let east_child = tree.node(east_brick).unwrap().child(octant).unwrap();
  assert!(tree.relink_neighbor(west, Face::PosX, Some(east_brick), east_child));
  assert_eq!(tree.node(east_child).unwrap().neighbor(Face::NegX), Some(west));

  // Only the west cell's ancestry is visited, so the east brick collapses.
  tree.visit(west);
  bricks.unify_bricks();
  assert!(tree.node(east_brick).unwrap().is_leaf());
  assert!(tree.node(east_child).unwrap().is_deleted());

  let healed = tree.resolve_neighbor(west, Face::PosX).unwrap();
  assert_eq!(healed, Some(east_brick));
  assert_eq!(tree.node(west).unwrap().neighbor(Face::PosX), Some(east_brick));
}
