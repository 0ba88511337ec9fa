//! Splitting one leaf, and folding away subtrees that turn out empty.
//!
//! # Publication order
//!
//! ```text
//! 1. oracle × 8            no lock, may fail, may be slow
//! 2. allocate + fill group children unreachable, no lock needed
//! 3. lock node, re-check   node may have changed while the oracle ran
//! 4. outward links, color
//! 5. children pointer
//! 6. clear LEAF            readers may now descend
//! ```
//!
//! Readers test `LEAF` before touching `children`, so a ray either sees the
//! old leaf or a fully wired set of children.

use crate::bricks::BrickManager;
use crate::color::{average, positional_color};
use crate::constants::{is_brick_depth, BACKGROUND, MAX_DEPTH};
use crate::error::Result;
use crate::octree::{flags, octant_flip, octant_on_parent_face, Face, NodeId, Octree, VoxelNode};
use crate::oracle::FractalOracle;

use super::SubdivisionRequest;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Why a request was dropped without touching the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
  /// The handle's slot has been recycled.
  Stale,
  /// Collapsed away since the request was made.
  Deleted,
  /// Already split.
  NotLeaf,
  /// Emptied since the request was made.
  AlreadyEmpty,
  /// At the finest supported depth.
  MaxDepth,
}

/// What [`subdivide`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubdivisionOutcome {
  /// Children published. `bricked` when the node became a brick.
  Subdivided { bricked: bool },
  /// No child had detail; the node is now an empty leaf and
  /// `collapsed_ancestors` ancestors folded into empty leaves with it.
  Emptied { collapsed_ancestors: u32 },
  Skipped(SkipReason),
}

/// Releases the node's `QUEUED` gate however the request ends.
struct QueuedGuard<'a> {
  tree: &'a Octree,
  node: NodeId,
}

impl Drop for QueuedGuard<'_> {
  fn drop(&mut self) {
    self.tree.clear_queued(self.node);
  }
}

/// Probe radius for a child of edge `dim`: the half-diagonal, so the probe
/// sphere covers the whole child cube.
#[inline]
pub fn probe_radius(child_dim: f64) -> f64 {
  child_dim * SQRT_3 * 0.5
}

/// Split the full leaf named by `request`.
///
/// Oracle failures propagate and leave the tree untouched.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "subdivider::subdivide"))]
pub fn subdivide(
  tree: &Octree,
  oracle: &dyn FractalOracle,
  bricks: &BrickManager,
  request: SubdivisionRequest,
) -> Result<SubdivisionOutcome> {
  let SubdivisionRequest { node: id, bounds } = request;
  let _queued = QueuedGuard { tree, node: id };

  let Some(node) = tree.node(id) else {
    return Ok(SubdivisionOutcome::Skipped(SkipReason::Stale));
  };
  if let Some(reason) = skip_reason(node) {
    return Ok(SubdivisionOutcome::Skipped(reason));
  }

  let probe = probe_radius(bounds.dim * 0.5);
  let mut colors = [None; 8];
  for (octant, color) in (0u8..8).zip(colors.iter_mut()) {
    let center = bounds.child(octant).center();
    if oracle.contains_detail(center, probe)? {
      *color = Some(positional_color(center));
    }
  }

  if colors.iter().all(Option::is_none) {
    let collapsed_ancestors = empty_leaf(tree, id);
    return Ok(SubdivisionOutcome::Emptied { collapsed_ancestors });
  }

  let color = average(colors.iter().flatten().copied()).unwrap_or_else(|| node.color());
  match split_leaf(tree, bricks, id, colors, color, |node| !node.is_empty())? {
    Some(bricked) => Ok(SubdivisionOutcome::Subdivided { bricked }),
    None => Ok(SubdivisionOutcome::Skipped(
      skip_reason(node).unwrap_or(SkipReason::AlreadyEmpty),
    )),
  }
}

fn skip_reason(node: &VoxelNode) -> Option<SkipReason> {
  if node.is_deleted() || !node.is_live() {
    Some(SkipReason::Deleted)
  } else if !node.is_leaf() {
    Some(SkipReason::NotLeaf)
  } else if node.is_empty() {
    Some(SkipReason::AlreadyEmpty)
  } else if node.depth() >= MAX_DEPTH {
    Some(SkipReason::MaxDepth)
  } else {
    None
  }
}

/// Give leaf `id` eight children colored by `colors` (`None` = empty) and
/// recolor it `color`.
///
/// `still_wanted` re-checks the leaf under its lock. Returns `Some(bricked)`
/// once published, `None` if the leaf changed and the group was handed back.
pub(crate) fn split_leaf(
  tree: &Octree,
  bricks: &BrickManager,
  id: NodeId,
  colors: [Option<u32>; 8],
  color: u32,
  still_wanted: impl FnOnce(&VoxelNode) -> bool,
) -> Result<Option<bool>> {
  if tree.live_node(id).is_none() {
    return Ok(None);
  }
  let first = tree.arena().allocate_group()?;

  // The handle may have been recycled since the caller resolved it; only
  // trust the slot once its lock is held.
  let published = tree.lock_live(id).and_then(|(node, _lock)| {
    let depth = node.depth();
    if !node.is_leaf() || depth >= MAX_DEPTH || !still_wanted(node) {
      return None;
    }
    let bricked = is_brick_depth(depth);
    let child_brick = if bricked { Some(id) } else { node.brick() };
    wire_children(tree, node, id, first, child_brick, &colors);
    if bricked {
      node.brick.store(Some(id));
    }
    node.set_color(color);
    node.set_first_child(Some(first));
    node.clear_flags(flags::LEAF | flags::EMPTY);
    Some(bricked)
  });

  let Some(bricked) = published else {
    tree.arena().release_group(first);
    return Ok(None);
  };
  if bricked {
    bricks.add_brick(id);
  }
  Ok(Some(bricked))
}

/// Fill a fresh group as the children of `parent`. Internal faces link
/// siblings; outward faces inherit the parent's links, which are at most as
/// fine as the parent and so strictly coarser than the children.
fn wire_children(
  tree: &Octree,
  parent: &VoxelNode,
  parent_id: NodeId,
  first: NodeId,
  brick: Option<NodeId>,
  colors: &[Option<u32>; 8],
) {
  for octant in 0u8..8 {
    let child_id = first.sibling(octant);
    let Some(child) = tree.arena().get(child_id) else {
      continue;
    };
    child.set_depth(parent.depth() + 1);
    child.parent.store(Some(parent_id));
    child.brick.store(brick);
    child.set_color(colors[octant as usize].unwrap_or(BACKGROUND));
    for face in Face::ALL {
      let link = if octant_on_parent_face(octant, face) {
        parent.neighbor(face)
      } else {
        Some(child_id.sibling(octant_flip(octant, face.axis())))
      };
      child.neighbors[face.index()].store(link);
    }
    let empty = if colors[octant as usize].is_some() { 0 } else { flags::EMPTY };
    child.reset_flags(flags::LIVE | flags::LEAF | empty);
  }
}

/// Mark leaf `id` empty, then fold each ancestor whose children are now all
/// empty leaves. Returns the number of ancestors folded.
pub(crate) fn empty_leaf(tree: &Octree, id: NodeId) -> u32 {
  {
    let Some((node, _lock)) = tree.lock_live(id) else {
      return 0;
    };
    if !node.is_leaf() {
      return 0;
    }
    node.set_color(BACKGROUND);
    node.set_flags(flags::EMPTY);
  }
  collapse_empty_ancestors(tree, id)
}

/// Walk up from `id`, turning every parent whose eight children are empty
/// leaves into a single empty leaf.
pub(crate) fn collapse_empty_ancestors(tree: &Octree, id: NodeId) -> u32 {
  let mut collapsed = 0;
  let mut current = id;
  while let Some(parent_id) = tree.node(current).and_then(VoxelNode::parent) {
    let Some((parent, _parent_lock)) = tree.lock_live(parent_id) else {
      break;
    };
    if parent.is_leaf() {
      break;
    }
    let Some(first) = parent.first_child() else {
      break;
    };
    let children: Option<Vec<&VoxelNode>> = (0u8..8).map(|o| tree.live_node(first.sibling(o))).collect();
    let Some(children) = children else {
      break;
    };
    let _child_locks: Vec<_> = children.iter().map(|child| child.lock()).collect();
    if !children.iter().all(|child| child.is_leaf() && child.is_empty()) {
      break;
    }

    parent.set_flags(flags::LEAF | flags::EMPTY);
    parent.set_first_child(None);
    parent.set_color(BACKGROUND);
    for child in &children {
      child.mark_deleted(parent_id);
    }
    tree.arena().bury_group(first);
    tracing::trace!(node = ?parent_id, "folded empty children");

    collapsed += 1;
    current = parent_id;
  }
  collapsed
}

#[cfg(test)]
#[path = "subdivide_test.rs"]
mod subdivide_test;
