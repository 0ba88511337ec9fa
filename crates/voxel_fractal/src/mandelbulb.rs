//! Power-8 Mandelbulb, iterated in spherical coordinates.

use glam::DVec3;
use voxel_octree::{FractalOracle, OracleResult};

use crate::within;

const POWER: f64 = 8.0;
const MAX_ITERATIONS: usize = 10;
const BAILOUT: f64 = 10_000.0;

#[derive(Clone, Copy, Debug, Default)]
pub struct Mandelbulb;

impl Mandelbulb {
  /// Distance estimate `0.5 * ln(r) * r / dr`.
  pub fn distance(point: DVec3) -> f64 {
    let mut z = point;
    let mut dr: f64 = 1.0;
    let mut r: f64 = 0.0;
    for _ in 0..MAX_ITERATIONS {
      r = z.length();
      if r > BAILOUT {
        break;
      }
      let theta = if r > 0.0 { (z.z / r).acos() } else { 0.0 };
      let phi = z.y.atan2(z.x);
      dr = r.powf(POWER - 1.0) * POWER * dr + 1.0;

      let zr = r.powf(POWER);
      let (theta, phi) = (theta * POWER, phi * POWER);
      z = DVec3::new(
        theta.sin() * phi.cos(),
        phi.sin() * theta.sin(),
        theta.cos(),
      ) * zr
        + point;
    }
    // The orbit never left the origin, which lies inside the set.
    if r == 0.0 {
      return 0.0;
    }
    0.5 * r.ln() * r / dr
  }
}

impl FractalOracle for Mandelbulb {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    within(point, Self::distance(point), max_distance)
  }
}
