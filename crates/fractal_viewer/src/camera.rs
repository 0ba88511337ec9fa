//! Live camera driven by the flight path.

use glam::{DQuat, DVec3};
use voxel_octree::{CameraProvider, CameraSnapshot};

/// Mutable camera. The renderer only ever sees [`CameraSnapshot`]s of it.
#[derive(Clone, Debug)]
pub struct Camera {
	position: DVec3,
	look_point: DVec3,
	look_vector: DVec3,
	up_vector: DVec3,
	viewplane_top: DVec3,
	viewplane_left: DVec3,
	distance_to_viewplane: f64,
}

impl Camera {
	pub fn new(
		position: DVec3,
		look_point: DVec3,
		distance_to_viewplane: f64,
		viewplane_width: f64,
		viewplane_height: f64,
	) -> Self {
		let snapshot = CameraSnapshot::look_at(
			position,
			look_point,
			distance_to_viewplane,
			viewplane_width,
			viewplane_height,
		);
		Self {
			position,
			look_point,
			look_vector: snapshot.look_vector,
			up_vector: snapshot.up_vector,
			viewplane_top: snapshot.viewplane_top,
			viewplane_left: snapshot.viewplane_left,
			distance_to_viewplane,
		}
	}

	pub fn position(&self) -> DVec3 {
		self.position
	}

	pub fn look_vector(&self) -> DVec3 {
		self.look_vector
	}

	/// Translate the camera and its look point.
	pub fn move_by(&mut self, offset: DVec3) {
		self.position += offset;
		self.look_point += offset;
	}

	pub fn move_to(&mut self, position: DVec3) {
		self.move_by(position - self.position);
	}

	/// Point the camera along `look`, keeping the viewplane size and
	/// rebuilding the basis around the current up vector.
	pub fn set_look_vector(&mut self, look: DVec3) {
		let look = look.normalize_or_zero();
		if look == DVec3::ZERO {
			return;
		}
		let width = self.viewplane_top.length();
		let height = self.viewplane_left.length();
		let mut right = self.up_vector.cross(look);
		if right.length_squared() < 1e-12 {
			// Looking straight along the up vector: borrow another axis.
			right = DVec3::Z.cross(look);
		}
		let right = right.normalize();
		self.up_vector = look.cross(right).normalize();
		self.look_vector = look;
		self.look_point = self.position + look;
		self.viewplane_top = -right * width;
		self.viewplane_left = -self.up_vector * height;
	}

	pub fn set_distance_to_viewplane(&mut self, distance: f64) {
		self.distance_to_viewplane = distance;
	}

	/// Rotate the whole camera frame by `angle` radians about `axis`
	/// through `origin`.
	pub fn rotate_around(&mut self, origin: DVec3, axis: DVec3, angle: f64) {
		let rotation = DQuat::from_axis_angle(axis.normalize(), angle);
		self.position = origin + rotation * (self.position - origin);
		self.look_point = origin + rotation * (self.look_point - origin);
		self.look_vector = rotation * self.look_vector;
		self.up_vector = rotation * self.up_vector;
		self.viewplane_top = rotation * self.viewplane_top;
		self.viewplane_left = rotation * self.viewplane_left;
	}
}

impl CameraProvider for Camera {
	fn snapshot(&self) -> CameraSnapshot {
		CameraSnapshot {
			position: self.position,
			look_vector: self.look_vector,
			up_vector: self.up_vector,
			viewplane_top: self.viewplane_top,
			viewplane_left: self.viewplane_left,
			distance_to_viewplane: self.distance_to_viewplane,
		}
	}
}

impl Default for Camera {
	fn default() -> Self {
		Self::new(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, 3.0, 1.5, 1.5)
	}
}

#[cfg(test)]
mod tests {
	use std::f64::consts::FRAC_PI_2;

	use super::*;

	fn close(a: DVec3, b: DVec3) -> bool {
		(a - b).length() < 1e-9
	}

	/// A fresh camera matches the core snapshot constructor.
	#[test]
	fn test_snapshot_matches_look_at() {
		let camera = Camera::default();
		assert_eq!(camera.snapshot(), CameraSnapshot::default());
	}

	#[test]
	fn test_move() {
		let mut camera = Camera::default();
		camera.move_by(DVec3::new(1.0, 0.0, 0.0));
		assert!(close(camera.position(), DVec3::new(1.0, 0.0, 5.0)));
		camera.move_to(DVec3::new(0.0, 2.0, 0.0));
		assert!(close(camera.position(), DVec3::new(0.0, 2.0, 0.0)));
		assert!(close(camera.look_vector(), DVec3::NEG_Z));
	}

	/// A quarter turn about +Y through the origin swings the camera from +Z
	/// to +X, still facing the origin.
	#[test]
	fn test_rotate_around_origin() {
		let mut camera = Camera::default();
		camera.rotate_around(DVec3::ZERO, DVec3::Y, FRAC_PI_2);
		assert!(close(camera.position(), DVec3::new(5.0, 0.0, 0.0)));
		assert!(close(camera.look_vector(), DVec3::NEG_X));
		assert!((camera.snapshot().viewplane_top.length() - 1.5).abs() < 1e-9);
	}

	#[test]
	fn test_set_look_vector_keeps_viewplane() {
		let mut camera = Camera::default();
		camera.set_look_vector(DVec3::new(1.0, 1.0, -1.0));
		let snapshot = camera.snapshot();
		assert!(close(snapshot.look_vector, DVec3::new(1.0, 1.0, -1.0).normalize()));
		assert!((snapshot.viewplane_top.length() - 1.5).abs() < 1e-9);
		assert!((snapshot.viewplane_left.length() - 1.5).abs() < 1e-9);
		assert!(snapshot.viewplane_top.dot(snapshot.look_vector).abs() < 1e-9);
	}
}
