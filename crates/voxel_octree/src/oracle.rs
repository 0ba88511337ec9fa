//! Shape predicate consulted by the subdivider.
//!
//! The tree never knows what it is drawing. Whenever a leaf is split, the
//! subdivider asks a [`FractalOracle`] whether any surface detail lies within
//! a probe radius of each child's center; children with no detail become
//! empty leaves.
//!
//! The simple shapes in this module are deterministic and cheap, which makes
//! them useful for tests and benchmarks where a real fractal would obscure the
//! tree behavior being checked.

use glam::DVec3;

use crate::error::OracleError;

/// Result of a single oracle probe.
pub type OracleResult = Result<bool, OracleError>;

/// Pure "is there detail within `max_distance` of `point`?" predicate.
///
/// Implementations are called concurrently from the subdivision pool with no
/// synchronization, so they must be stateless (or internally synchronized).
pub trait FractalOracle: Send + Sync {
  /// True when the shape comes within `max_distance` of `point`.
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult;
}

impl<T: FractalOracle + ?Sized> FractalOracle for std::sync::Arc<T> {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    (**self).contains_detail(point, max_distance)
  }
}

impl<T: FractalOracle + ?Sized> FractalOracle for Box<T> {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    (**self).contains_detail(point, max_distance)
  }
}

// =============================================================================
// Test shapes
// =============================================================================

/// Detail everywhere: every child of every split is full.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolidOracle;

impl FractalOracle for SolidOracle {
  fn contains_detail(&self, _point: DVec3, _max_distance: f64) -> OracleResult {
    Ok(true)
  }
}

/// No detail anywhere: every split collapses back to an empty leaf.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyOracle;

impl FractalOracle for EmptyOracle {
  fn contains_detail(&self, _point: DVec3, _max_distance: f64) -> OracleResult {
    Ok(false)
  }
}

/// Solid sphere, answered with its exact distance function.
#[derive(Clone, Copy, Debug)]
pub struct SphereOracle {
  /// Sphere center.
  pub center: DVec3,
  /// Sphere radius.
  pub radius: f64,
}

impl Default for SphereOracle {
  fn default() -> Self {
    Self {
      center: DVec3::ZERO,
      radius: 0.75,
    }
  }
}

impl SphereOracle {
  pub fn new(center: DVec3, radius: f64) -> Self {
    Self { center, radius }
  }
}

impl FractalOracle for SphereOracle {
  fn contains_detail(&self, point: DVec3, max_distance: f64) -> OracleResult {
    Ok(point.distance(self.center) - self.radius < max_distance)
  }
}

/// Oracle backed by a closure over the probe point.
///
/// The probe radius is ignored; the closure decides on the center alone.
pub struct FnOracle<F>(pub F);

impl<F> FractalOracle for FnOracle<F>
where
  F: Fn(DVec3) -> OracleResult + Send + Sync,
{
  fn contains_detail(&self, point: DVec3, _max_distance: f64) -> OracleResult {
    (self.0)(point)
  }
}
