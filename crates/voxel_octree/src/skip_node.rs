//! Skip node - the smallest known node holding the camera.
//!
//! Rays from a camera inside the root cube all start in the same leaf, so
//! the renderer starts them there instead of descending from the root for
//! every pixel. The node is tracked across frames: it is refined while the
//! camera stays inside, and moved through one face link when the camera
//! crosses a face.

use glam::DVec3;

use crate::octree::{Face, NodeBox, NodeId, Octree};

/// Frame-to-frame tracker of the leaf containing the camera.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipNode {
  current: Option<(NodeId, NodeBox)>,
}

impl SkipNode {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn current(&self) -> Option<(NodeId, NodeBox)> {
    self.current
  }

  pub fn reset(&mut self) {
    self.current = None;
  }

  /// Move the skip node to follow `camera` and return it.
  ///
  /// `None` means rays should start at the root this frame.
  pub fn update(&mut self, tree: &Octree, camera: DVec3) -> Option<(NodeId, NodeBox)> {
    self.current = match self.current.take() {
      None => from_root(tree, camera),
      Some((id, _)) if tree.live_node(id).is_none() => {
        tracing::debug!(node = ?id, "skip node is gone, restarting from the root");
        from_root(tree, camera)
      }
      Some((id, bounds)) if bounds.strictly_contains(camera) => tree.locate(id, bounds, camera),
      Some((id, bounds)) => step_out(tree, id, bounds, camera),
    };
    self.current
  }
}

fn from_root(tree: &Octree, camera: DVec3) -> Option<(NodeId, NodeBox)> {
  if !NodeBox::ROOT.strictly_contains(camera) {
    return None;
  }
  tree.locate(tree.root(), NodeBox::ROOT, camera)
}

/// Face the camera left `bounds` through, checking X then Y then Z.
fn exit_face(bounds: &NodeBox, camera: DVec3) -> Option<Face> {
  let max = bounds.max();
  (0..3).find_map(|axis| {
    if camera[axis] < bounds.min[axis] {
      Some(Face::from_axis(axis, false))
    } else if camera[axis] > max[axis] {
      Some(Face::from_axis(axis, true))
    } else {
      None
    }
  })
}

/// Step across the face the camera crossed. Gives up unless the neighbor
/// strictly contains the camera.
fn step_out(tree: &Octree, id: NodeId, bounds: NodeBox, camera: DVec3) -> Option<(NodeId, NodeBox)> {
  let face = exit_face(&bounds, camera)?;
  let neighbor = match tree.resolve_neighbor(id, face) {
    Ok(neighbor) => neighbor?,
    Err(err) => {
      tracing::warn!(node = ?id, error = %err, "skip node lost its neighbor link");
      return None;
    }
  };
  let depth = tree.live_node(id)?.depth();
  let neighbor_depth = tree.live_node(neighbor)?.depth();
  if neighbor_depth > depth {
    return None;
  }

  let mut next = bounds.step(face);
  if neighbor_depth < depth {
    next = next.snap_to_depth(neighbor_depth);
  }
  if !next.strictly_contains(camera) {
    return None;
  }
  tree.locate(neighbor, next, camera)
}
