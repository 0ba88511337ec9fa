//! Screen-space level-of-detail test.
//!
//! A cube of edge `dim` at ray distance `t` projects to roughly
//! `dim * distance_to_viewplane * width / (t * viewplane_width)` pixels.
//! Both comparisons below are that ratio against a fixed threshold, with the
//! division cleared so the hot path is two multiplies.

use crate::camera::CameraSnapshot;

/// Per-frame constants of the projected-size test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodConstants {
  /// `distance_to_viewplane * screen_width`.
  pub pixel_scale: f64,
  /// `|viewplane_top| * 0.5`.
  pub distance_scale: f64,
}

impl LodConstants {
  pub fn new(pixel_scale: f64, distance_scale: f64) -> Self {
    Self {
      pixel_scale,
      distance_scale,
    }
  }

  /// Constants for `camera` rendering at `screen_width` pixels across.
  pub fn from_camera(camera: &CameraSnapshot, screen_width: u32) -> Self {
    Self::new(
      camera.distance_to_viewplane * screen_width as f64,
      camera.viewplane_width() * 0.5,
    )
  }

  /// Cube too small on screen to be worth refining further.
  #[inline]
  pub fn is_sub_pixel(&self, dim: f64, t: f64) -> bool {
    dim * self.pixel_scale < t * self.distance_scale
  }

  /// Cube large enough on screen that a full leaf should be subdivided.
  #[inline]
  pub fn wants_subdivision(&self, dim: f64, t: f64) -> bool {
    dim * self.pixel_scale > t * self.distance_scale
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_camera() {
    let lod = LodConstants::from_camera(&CameraSnapshot::default(), 100);
    assert_eq!(lod.pixel_scale, 300.0);
    assert!((lod.distance_scale - 0.75).abs() < 1e-12);
  }

  /// Near cubes want detail, far ones are sub-pixel, the boundary is neither.
  #[test]
  fn test_thresholds() {
    let lod = LodConstants::new(100.0, 1.0);
    assert!(lod.wants_subdivision(0.5, 10.0));
    assert!(!lod.is_sub_pixel(0.5, 10.0));

    assert!(lod.is_sub_pixel(0.001, 10.0));
    assert!(!lod.wants_subdivision(0.001, 10.0));

    assert!(!lod.is_sub_pixel(0.1, 10.0));
    assert!(!lod.wants_subdivision(0.1, 10.0));
  }
}
