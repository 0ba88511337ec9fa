//! Mandelbox: box fold, sphere fold, scale and translate.
//!
//! The fractal spans roughly `[-6, 6]³`, so points are scaled by
//! [`PRE_SCALE`] to fit it into the root cube.

use glam::DVec3;
use voxel_octree::{FractalOracle, OracleResult};

use crate::within;

/// World-to-fractal scale applied to the point and the probe radius.
pub const PRE_SCALE: f64 = 7.0;
const SCALE: f64 = 2.0;
const MIN_RADIUS_SQ: f64 = 0.25;
const FIXED_RADIUS_SQ: f64 = 1.0;
const MAX_ITERATIONS: usize = 50;

#[derive(Clone, Copy, Debug, Default)]
pub struct Mandelbox;

#[inline]
fn box_fold(v: f64) -> f64 {
  if v > 1.0 {
    2.0 - v
  } else if v < -1.0 {
    -2.0 - v
  } else {
    v
  }
}

impl Mandelbox {
  /// Distance estimate `r / |dr|`, in fractal units.
  pub fn distance(scaled: DVec3) -> f64 {
    let mut z = scaled;
    let mut dr: f64 = 1.0;
    for _ in 0..MAX_ITERATIONS {
      z = DVec3::new(box_fold(z.x), box_fold(z.y), box_fold(z.z));

      let r2 = z.length_squared();
      if r2 < MIN_RADIUS_SQ {
        let k = FIXED_RADIUS_SQ / MIN_RADIUS_SQ;
        z *= k;
        dr *= k;
      } else if r2 < FIXED_RADIUS_SQ {
        let k = FIXED_RADIUS_SQ / r2;
        z *= k;
        dr *= k;
      }

      z = z * SCALE + scaled;
      dr *= SCALE;
    }
    z.length() / dr.abs()
  }
}

impl FractalOracle for Mandelbox {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    within(point, Self::distance(point * PRE_SCALE), max_distance * PRE_SCALE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detail(x: f64, y: f64, z: f64, d: f64) -> bool {
    Mandelbox.contains_detail(DVec3::new(x, y, z), d).unwrap()
  }

  #[test]
  fn test_inside_points() {
    assert!(detail(0.0, 0.0, 0.0, 0.01));
    assert!(detail(0.5, 0.1, 0.2, 0.01));
  }

  #[test]
  fn test_outside_points() {
    assert!(!detail(0.9, 0.9, 0.9, 0.01));
    assert!(!detail(1.0, 1.0, 1.0, 0.01));
  }
}
