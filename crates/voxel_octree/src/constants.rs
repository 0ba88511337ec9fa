//! Tree layout constants.
//!
//! The octree covers a fixed cube of world space. Every node's box is derived
//! from its depth and its path from the root, so these values are the only
//! absolute coordinates the crate ever needs.
//!
//! # Box Sizes
//!
//! ```text
//! depth:      0      1      2      3    ...    d
//! box dim:    2      1     1/2    1/4         2^(1-d)
//!
//! ┌───────────────┐ (1,1,1)
//! │       │       │
//! │  dim  │       │      root cube spans [-1,1]³
//! │───────┼───────│      depth-1 children span unit cubes
//! │       │       │
//! │       │       │
//! └───────────────┘
//! (-1,-1,-1)
//! ```
//!
//! # Brick Checkpoints
//!
//! Every `BRICK_INTERVAL`-th depth designates a checkpoint node. Subdividing a
//! node at `depth % BRICK_INTERVAL == 0` turns that node into a brick; its
//! children (and grandchildren, until the next checkpoint) point back to it.

use glam::DVec3;

/// Minimum corner of the root cube.
pub const ROOT_MIN: DVec3 = DVec3::splat(-1.0);

/// Edge length of the root cube.
pub const ROOT_DIM: f64 = 2.0;

/// Depth interval between brick checkpoints.
pub const BRICK_INTERVAL: u8 = 2;

/// Deepest level a node may reach. Past this the `ENTRY_NUDGE * dim` step
/// falls under a few ulps of the coordinates it is added to.
pub const MAX_DEPTH: u8 = 32;

/// Relative nudge applied to the ray entry parameter before locating the
/// octant, so the sample point lands strictly inside the entered box.
pub const ENTRY_NUDGE: f64 = 0.0001;

/// Color returned when a ray leaves the root cube without hitting anything.
pub const BACKGROUND: u32 = 0;

/// Hit distance reported for rays that miss.
pub const NO_HIT: f64 = f64::MAX;

/// Sweeps a tombstoned group waits in the graveyard before its slot is reused.
pub const TOMBSTONE_GRACE_SWEEPS: u64 = 2;

/// Edge length of a box at `depth`.
///
/// `dim(0) = 2`, `dim(d) = 2^(1-d)`.
#[inline]
pub fn box_dim_at_depth(depth: u8) -> f64 {
  ROOT_DIM * 0.5f64.powi(depth as i32)
}

/// True when subdividing a node at `depth` turns it into a brick checkpoint.
#[inline]
pub fn is_brick_depth(depth: u8) -> bool {
  depth % BRICK_INTERVAL == 0
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
