//! Tree-building helpers shared by the unit tests.

use std::sync::{Arc, Mutex};

use crate::bricks::BrickManager;
use crate::octree::{NodeBox, NodeId, Octree};
use crate::oracle::FractalOracle;
use crate::subdivider::{subdivide, SubdivisionOutcome, SubdivisionRequest, SubdivisionSink};

/// Single-threaded brick manager for `tree`.
pub fn bricks_for(tree: &Arc<Octree>) -> BrickManager {
  BrickManager::new(Arc::clone(tree), 1).expect("unify pool")
}

/// Split `id` synchronously with `oracle`.
pub fn split(
  tree: &Octree,
  bricks: &BrickManager,
  id: NodeId,
  bounds: NodeBox,
  oracle: &dyn FractalOracle,
) -> SubdivisionOutcome {
  subdivide(tree, oracle, bricks, SubdivisionRequest { node: id, bounds }).expect("subdivide")
}

/// Split every full leaf until all of them sit at `depth`.
pub fn split_to_depth(tree: &Octree, bricks: &BrickManager, oracle: &dyn FractalOracle, depth: u8) {
  let mut frontier = vec![(tree.root(), NodeBox::ROOT)];
  while let Some((id, bounds)) = frontier.pop() {
    let Some(node) = tree.live_node(id) else {
      continue;
    };
    if node.depth() >= depth || node.is_empty() {
      continue;
    }
    if node.is_leaf() {
      split(tree, bricks, id, bounds, oracle);
    }
    let Some(first) = tree.live_node(id).and_then(|n| n.first_child()) else {
      continue;
    };
    frontier.extend((0u8..8).map(|octant| (first.sibling(octant), bounds.child(octant))));
  }
}

/// Sink that accepts and records every request.
#[derive(Default)]
pub struct RecordingSink {
  requests: Mutex<Vec<SubdivisionRequest>>,
}

impl RecordingSink {
  pub fn requests(&self) -> Vec<SubdivisionRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn len(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

impl SubdivisionSink for RecordingSink {
  fn submit(&self, request: SubdivisionRequest) -> bool {
    self.requests.lock().unwrap().push(request);
    true
  }
}
