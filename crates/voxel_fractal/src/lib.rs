//! Distance-estimated fractals as octree oracles.
//!
//! Each fractal answers one question: does its surface come within
//! `max_distance` of a point? The answer comes from an escape-time distance
//! estimate, so it is conservative near the surface and cheap far from it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ FractalKind ── "sierpinski" | "menger" | …   │
//! │      │                                       │
//! │      ▼ oracle(kind)                          │
//! │ Arc<dyn FractalOracle>                       │
//! │   ├── SierpinskiGasket   fold + scale 2      │
//! │   ├── MengerSponge       fold + scale 3      │
//! │   ├── Mandelbulb         power 8 polar map   │
//! │   └── Mandelbox          box + sphere fold   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//! ```ignore
//! use voxel_fractal::{oracle, FractalKind};
//!
//! let kind: FractalKind = "menger".parse()?;
//! let fractal = oracle(kind);
//! assert!(fractal.contains_detail(glam::DVec3::ONE, 0.1)?);
//! ```

mod mandelbox;
mod mandelbulb;
mod menger;
mod sierpinski;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use glam::DVec3;
use thiserror::Error;
use voxel_octree::{FractalOracle, OracleError, OracleResult};

pub use mandelbox::Mandelbox;
pub use mandelbulb::Mandelbulb;
pub use menger::MengerSponge;
pub use sierpinski::SierpinskiGasket;

/// Fractal name that matched no known kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fractal '{0}' (expected sierpinski, menger, mandelbulb or mandelbox)")]
pub struct UnknownFractal(pub String);

/// The fractals this crate provides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FractalKind {
  #[default]
  Sierpinski,
  Menger,
  Mandelbulb,
  Mandelbox,
}

impl FractalKind {
  pub const ALL: [FractalKind; 4] = [
    FractalKind::Sierpinski,
    FractalKind::Menger,
    FractalKind::Mandelbulb,
    FractalKind::Mandelbox,
  ];

  pub fn name(self) -> &'static str {
    match self {
      FractalKind::Sierpinski => "sierpinski",
      FractalKind::Menger => "menger",
      FractalKind::Mandelbulb => "mandelbulb",
      FractalKind::Mandelbox => "mandelbox",
    }
  }
}

impl fmt::Display for FractalKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for FractalKind {
  type Err = UnknownFractal;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "sierpinski" | "sierpinski_gasket" | "gasket" => Ok(FractalKind::Sierpinski),
      "menger" | "menger_sponge" | "sponge" => Ok(FractalKind::Menger),
      "mandelbulb" | "bulb" => Ok(FractalKind::Mandelbulb),
      "mandelbox" | "box" => Ok(FractalKind::Mandelbox),
      _ => Err(UnknownFractal(s.to_string())),
    }
  }
}

/// Shared oracle for `kind`.
pub fn oracle(kind: FractalKind) -> Arc<dyn FractalOracle> {
  match kind {
    FractalKind::Sierpinski => Arc::new(SierpinskiGasket),
    FractalKind::Menger => Arc::new(MengerSponge),
    FractalKind::Mandelbulb => Arc::new(Mandelbulb),
    FractalKind::Mandelbox => Arc::new(Mandelbox),
  }
}

/// Compare a distance estimate against the probe radius, rejecting NaN and
/// infinities.
#[inline]
pub(crate) fn within(point: DVec3, estimate: f64, max_distance: f64) -> OracleResult {
  if !estimate.is_finite() {
    return Err(OracleError::NonFinite {
      x: point.x,
      y: point.y,
      z: point.z,
    });
  }
  Ok(estimate < max_distance)
}
