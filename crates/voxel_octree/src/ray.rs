//! Rays and slab-method cube intersection.
//!
//! Axis-parallel rays divide by a zero direction component and produce
//! `±inf` slab bounds, which never bind in the min/max reductions. No axis
//! is special-cased.

use glam::DVec3;

use crate::octree::{Face, NodeBox};

/// Half-line `origin + t * dir`, `t >= 0`, with unit-length `dir`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
  pub origin: DVec3,
  pub dir: DVec3,
}

/// Parameter interval where a ray is inside a cube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaySpan {
  /// Entry parameter, clamped to zero for rays starting inside.
  pub tmin: f64,
  /// Exit parameter.
  pub tmax: f64,
}

impl Ray {
  /// Ray from `origin` along `dir` (normalized here).
  pub fn new(origin: DVec3, dir: DVec3) -> Self {
    Self {
      origin,
      dir: dir.normalize(),
    }
  }

  /// Ray from `origin` through `target`.
  pub fn through(origin: DVec3, target: DVec3) -> Self {
    Self::new(origin, target - origin)
  }

  /// Point at parameter `t`.
  #[inline]
  pub fn at(&self, t: f64) -> DVec3 {
    self.origin + self.dir * t
  }

  /// Per-axis near and far slab parameters for `cube`.
  #[inline]
  fn slabs(&self, cube: &NodeBox) -> (DVec3, DVec3) {
    let t0 = (cube.min - self.origin) / self.dir;
    let t1 = (cube.max() - self.origin) / self.dir;
    (t0.min(t1), t0.max(t1))
  }

  /// Intersect with `cube`; `None` when the ray misses it.
  #[inline]
  pub fn clip(&self, cube: &NodeBox) -> Option<RaySpan> {
    let (near, far) = self.slabs(cube);
    let tmin = near.max_element().max(0.0);
    let tmax = far.min_element();
    (tmin <= tmax).then_some(RaySpan { tmin, tmax })
  }

  /// Exit parameter from `cube` and the face the ray leaves through.
  ///
  /// Ties resolve X before Y before Z.
  #[inline]
  pub fn exit(&self, cube: &NodeBox) -> (f64, Face) {
    let (_, far) = self.slabs(cube);
    let tmax = far.min_element();
    let axis = if tmax == far.x {
      0
    } else if tmax == far.y {
      1
    } else {
      2
    };
    (tmax, Face::from_axis(axis, self.dir[axis] > 0.0))
  }
}
