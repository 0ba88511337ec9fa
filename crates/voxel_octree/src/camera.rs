//! Camera snapshot consumed by the renderer.
//!
//! The camera itself (input handling, flight paths) lives with the
//! application. Each frame the renderer takes one immutable snapshot so all
//! rays of that frame agree on the view.

use glam::DVec3;

use crate::ray::Ray;

/// Frozen view parameters for one frame.
///
/// The viewplane is a rectangle `distance_to_viewplane` in front of the
/// camera. `viewplane_top` runs along the top edge left to right and
/// `viewplane_left` down the left edge; their lengths are the viewplane's
/// width and height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
  pub position: DVec3,
  pub look_vector: DVec3,
  pub up_vector: DVec3,
  pub viewplane_top: DVec3,
  pub viewplane_left: DVec3,
  pub distance_to_viewplane: f64,
}

impl CameraSnapshot {
  /// Camera at `position` looking at `look_point`, with world +Y as up.
  pub fn look_at(
    position: DVec3,
    look_point: DVec3,
    distance_to_viewplane: f64,
    viewplane_width: f64,
    viewplane_height: f64,
  ) -> Self {
    let look_vector = (look_point - position).normalize();
    let up_vector = DVec3::Y;
    Self {
      position,
      look_vector,
      up_vector,
      viewplane_top: -up_vector.cross(look_vector) * viewplane_width,
      viewplane_left: -up_vector * viewplane_height,
      distance_to_viewplane,
    }
  }

  /// Width of the viewplane.
  #[inline]
  pub fn viewplane_width(&self) -> f64 {
    self.viewplane_top.length()
  }

  /// World position of screen coordinate `(x, y)` on the viewplane, for a
  /// `resolution_x` by `resolution_y` screen. `(0, 0)` is the top-left corner.
  pub fn pixel_position(&self, x: f64, y: f64, resolution_x: f64, resolution_y: f64) -> DVec3 {
    self.position + self.look_vector * self.distance_to_viewplane
      - self.viewplane_top * 0.5
      - self.viewplane_left * 0.5
      + self.viewplane_top * (x / resolution_x)
      + self.viewplane_left * (y / resolution_y)
  }

  /// Primary ray for pixel `(column, row)`.
  pub fn ray_through_pixel(&self, column: u32, row: u32, width: u32, height: u32) -> Ray {
    let target = self.pixel_position(column as f64, row as f64, width as f64, height as f64);
    Ray::through(self.position, target)
  }
}

impl Default for CameraSnapshot {
  /// Five units back on +Z, looking at the origin.
  fn default() -> Self {
    Self::look_at(DVec3::new(0.0, 0.0, 5.0), DVec3::ZERO, 3.0, 1.5, 1.5)
  }
}

/// Source of per-frame camera snapshots.
pub trait CameraProvider {
  fn snapshot(&self) -> CameraSnapshot;
}

impl CameraProvider for CameraSnapshot {
  fn snapshot(&self) -> CameraSnapshot {
    *self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: DVec3, b: DVec3) -> bool {
    (a - b).length() < 1e-12
  }

  #[test]
  fn test_look_at_basis() {
    let camera = CameraSnapshot::default();
    assert!(close(camera.look_vector, DVec3::NEG_Z));
    // Top edge runs toward +X, left edge runs down.
    assert!(close(camera.viewplane_top, DVec3::new(1.5, 0.0, 0.0)));
    assert!(close(camera.viewplane_left, DVec3::new(0.0, -1.5, 0.0)));
    assert!((camera.viewplane_width() - 1.5).abs() < 1e-12);
  }

  #[test]
  fn test_pixel_position_corners() {
    let camera = CameraSnapshot::default();
    let center = camera.pixel_position(50.0, 50.0, 100.0, 100.0);
    assert!(close(center, DVec3::new(0.0, 0.0, 2.0)));

    let top_left = camera.pixel_position(0.0, 0.0, 100.0, 100.0);
    assert!(close(top_left, DVec3::new(-0.75, 0.75, 2.0)));

    let bottom_right = camera.pixel_position(100.0, 100.0, 100.0, 100.0);
    assert!(close(bottom_right, DVec3::new(0.75, -0.75, 2.0)));
  }

  #[test]
  fn test_center_ray_points_forward() {
    let camera = CameraSnapshot::default();
    let ray = camera.ray_through_pixel(4, 4, 8, 8);
    assert!(close(ray.origin, camera.position));
    assert!(close(ray.dir, DVec3::NEG_Z));
  }
}
