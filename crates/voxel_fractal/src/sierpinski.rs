//! Sierpinski gasket: a tetrahedron folded onto itself across its three
//! symmetry planes, then scaled away from the corner at (1, 1, 1).

use glam::DVec3;
use voxel_octree::{FractalOracle, OracleResult};

use crate::within;

const SCALE: f64 = 2.0;
const MAX_ITERATIONS: i32 = 100;
const BAILOUT_SQ: f64 = 7.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct SierpinskiGasket;

impl SierpinskiGasket {
  /// Distance estimate from `point` to the gasket surface.
  pub fn distance(point: DVec3) -> f64 {
    let mut p = point;
    let mut r2 = p.length_squared();
    let mut i = 0;
    while i < MAX_ITERATIONS && r2 < BAILOUT_SQ {
      if p.x + p.y < 0.0 {
        (p.x, p.y) = (-p.y, -p.x);
      }
      if p.x + p.z < 0.0 {
        (p.x, p.z) = (-p.z, -p.x);
      }
      if p.y + p.z < 0.0 {
        (p.y, p.z) = (-p.z, -p.y);
      }
      p = p * SCALE - DVec3::splat(SCALE - 1.0);
      r2 = p.length_squared();
      i += 1;
    }
    (r2.sqrt() - 2.0) * SCALE.powi(-i)
  }
}

impl FractalOracle for SierpinskiGasket {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    within(point, Self::distance(point), max_distance)
  }
}
