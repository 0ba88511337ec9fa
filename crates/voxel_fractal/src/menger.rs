//! Menger sponge by folding: sort the absolute coordinates, then scale the
//! point away from the nearest kept sub-cube.

use glam::DVec3;
use voxel_octree::{FractalOracle, OracleResult};

use crate::within;

const SCALE: f64 = 3.0;
const MAX_ITERATIONS: i32 = 100;
const BAILOUT_SQ: f64 = 9.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct MengerSponge;

impl MengerSponge {
  /// Distance estimate from `point` to the sponge.
  pub fn distance(point: DVec3) -> f64 {
    let mut p = point;
    let mut r2 = p.length_squared();
    let mut i = 0;
    while i < MAX_ITERATIONS && r2 < BAILOUT_SQ {
      p = p.abs();
      if p.x < p.y {
        (p.x, p.y) = (p.y, p.x);
      }
      if p.x < p.z {
        (p.x, p.z) = (p.z, p.x);
      }
      if p.y < p.z {
        (p.y, p.z) = (p.z, p.y);
      }
      p.x = SCALE * p.x - (SCALE - 1.0);
      p.y = SCALE * p.y - (SCALE - 1.0);
      p.z *= SCALE;
      if p.z > 0.5 * (SCALE - 1.0) {
        p.z -= SCALE - 1.0;
      }
      r2 = p.length_squared();
      i += 1;
    }
    r2.sqrt() * SCALE.powi(-i)
  }
}

impl FractalOracle for MengerSponge {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    within(point, Self::distance(point), max_distance)
  }
}
