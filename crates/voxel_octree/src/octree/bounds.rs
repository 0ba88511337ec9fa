//! Axis-aligned cube carried alongside a node handle during traversal.

use glam::DVec3;

use super::node::{octant_from_halves, octant_is_upper, Face};
use crate::constants::{box_dim_at_depth, ROOT_DIM, ROOT_MIN};

/// Double-precision cube given by its minimum corner and edge length.
///
/// Nodes do not store positions; every walker threads a `NodeBox` next to
/// the node it describes and updates both in lock step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeBox {
	/// Minimum corner (inclusive).
	pub min: DVec3,
	/// Edge length.
	pub dim: f64,
}

impl NodeBox {
	/// The root cube `[-1, 1]³`.
	pub const ROOT: Self = Self {
		min: ROOT_MIN,
		dim: ROOT_DIM,
	};

	/// Create a new cube from its minimum corner and edge length.
	///
	/// # Panics
	/// Debug-asserts that `dim` is positive.
	pub fn new(min: DVec3, dim: f64) -> Self {
		debug_assert!(dim > 0.0, "cube edge must be positive");
		Self { min, dim }
	}

	/// Maximum corner.
	#[inline]
	pub fn max(&self) -> DVec3 {
		self.min + DVec3::splat(self.dim)
	}

	/// Center of the cube.
	#[inline]
	pub fn center(&self) -> DVec3 {
		self.min + DVec3::splat(self.dim * 0.5)
	}

	/// Check if the cube contains a point, boundary included.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		let max = self.max();
		point.x >= self.min.x
			&& point.x <= max.x
			&& point.y >= self.min.y
			&& point.y <= max.y
			&& point.z >= self.min.z
			&& point.z <= max.z
	}

	/// Check if the cube strictly contains a point (boundary excluded).
	#[inline]
	pub fn strictly_contains(&self, point: DVec3) -> bool {
		let max = self.max();
		point.x > self.min.x
			&& point.x < max.x
			&& point.y > self.min.y
			&& point.y < max.y
			&& point.z > self.min.z
			&& point.z < max.z
	}

	/// Octant whose half-cube holds `point`, by a per-axis step test against
	/// the midpoint. Points on the midpoint plane go to the upper half.
	#[inline]
	pub fn octant_of(&self, point: DVec3) -> u8 {
		let mid = self.min + DVec3::splat(self.dim * 0.5);
		octant_from_halves(point.x >= mid.x, point.y >= mid.y, point.z >= mid.z)
	}

	/// Box of the child in `octant`.
	#[inline]
	pub fn child(&self, octant: u8) -> Self {
		let half = self.dim * 0.5;
		let offset = DVec3::new(
			if octant_is_upper(octant, 0) { half } else { 0.0 },
			if octant_is_upper(octant, 1) { half } else { 0.0 },
			if octant_is_upper(octant, 2) { half } else { 0.0 },
		);
		Self {
			min: self.min + offset,
			dim: half,
		}
	}

	/// Same-size box on the other side of `face`.
	#[inline]
	pub fn step(&self, face: Face) -> Self {
		let mut min = self.min;
		min[face.axis()] += face.sign() * self.dim;
		Self { min, dim: self.dim }
	}

	/// Box of the depth-`depth` node containing this box's minimum corner.
	///
	/// Used when a neighbor pointer leads to a coarser node: the box is
	/// floor-aligned onto the coarser grid, measured from the root corner.
	pub fn snap_to_depth(&self, depth: u8) -> Self {
		let dim = box_dim_at_depth(depth);
		let rel = (self.min - ROOT_MIN) / dim;
		Self {
			min: ROOT_MIN + rel.floor() * dim,
			dim,
		}
	}

	/// Box offset by whole box widths along each axis.
	#[inline]
	pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
		Self {
			min: self.min + DVec3::new(dx as f64, dy as f64, dz as f64) * self.dim,
			dim: self.dim,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_root() {
		assert_eq!(NodeBox::ROOT.min, DVec3::splat(-1.0));
		assert_eq!(NodeBox::ROOT.max(), DVec3::splat(1.0));
		assert_eq!(NodeBox::ROOT.center(), DVec3::ZERO);
	}

	#[test]
	fn test_contains_point() {
		let cube = NodeBox::new(DVec3::ZERO, 10.0);

		// Inside
		assert!(cube.contains_point(DVec3::splat(5.0)));

		// On boundary
		assert!(cube.contains_point(DVec3::ZERO));
		assert!(cube.contains_point(DVec3::splat(10.0)));
		assert!(!cube.strictly_contains(DVec3::ZERO));

		// Outside
		assert!(!cube.contains_point(DVec3::splat(-1.0)));
		assert!(!cube.contains_point(DVec3::splat(11.0)));
	}

	#[test]
	fn test_octant_of_step_test() {
		let root = NodeBox::ROOT;
		assert_eq!(root.octant_of(DVec3::splat(-0.5)), 0);
		assert_eq!(root.octant_of(DVec3::new(0.5, -0.5, -0.5)), 1);
		assert_eq!(root.octant_of(DVec3::new(-0.5, 0.5, 0.5)), 6);
		// Midpoint plane belongs to the upper half.
		assert_eq!(root.octant_of(DVec3::ZERO), 7);
	}

	#[test]
	fn test_child_boxes_tile_parent() {
		let root = NodeBox::ROOT;
		for octant in 0u8..8 {
			let child = root.child(octant);
			assert_eq!(child.dim, 1.0);
			assert_eq!(root.octant_of(child.center()), octant);
		}
		assert_eq!(root.child(7).min, DVec3::ZERO);
	}

	#[test]
	fn test_step() {
		let cube = NodeBox::new(DVec3::ZERO, 0.5);
		assert_eq!(cube.step(Face::PosX).min, DVec3::new(0.5, 0.0, 0.0));
		assert_eq!(cube.step(Face::NegZ).min, DVec3::new(0.0, 0.0, -0.5));
	}

	/// Snapping onto a coarser grid lands on the ancestor-level cell.
	#[test]
	fn test_snap_to_depth() {
		// Depth-3 cell at (0.25, -0.75, 0.5) snaps to its depth-1 ancestor.
		let fine = NodeBox::new(DVec3::new(0.25, -0.75, 0.5), 0.25);
		let coarse = fine.snap_to_depth(1);
		assert_eq!(coarse.dim, 1.0);
		assert_eq!(coarse.min, DVec3::new(0.0, -1.0, 0.0));

		let root = fine.snap_to_depth(0);
		assert_eq!(root, NodeBox::ROOT);
	}

	#[test]
	fn test_offset() {
		let cube = NodeBox::new(DVec3::ZERO, 0.5);
		assert_eq!(cube.offset(1, -1, 0).min, DVec3::new(0.5, -0.5, 0.0));
	}
}
