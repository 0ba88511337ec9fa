//! voxel_octree - sparse voxel octree ray-marcher for distance-estimated fractals
//!
//! The scene is a sparse octree over the cube `[-1, 1]³` that starts as a
//! single full leaf and is refined on demand while it is being rendered.
//! Rays walk the leaves through face-neighbor pointers; full leaves that
//! still cover more than a pixel are queued for subdivision, and a
//! [`FractalOracle`] decides which children hold surface detail. Subtrees no
//! ray has touched for a while are folded back into their brick.
//!
//! # Features
//!
//! - **Neighbor-walk traversal**: leaf-to-leaf stepping without descending
//!   from the root, with a restart walker for comparison
//! - **Adaptive subdivision**: a bounded request queue drained by a
//!   dedicated worker pool while frames keep rendering
//! - **Brick unification**: periodic collapse of unvisited subtrees, with
//!   tombstones that forward stale neighbor links
//! - **Frame orchestration**: skip node, parallel per-pixel casting, depth
//!   buffer and an optional post-process hook
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use voxel_octree::{CameraSnapshot, RenderConfig, Renderer, SphereOracle};
//!
//! let config = RenderConfig::new(320, 240);
//! let mut renderer = Renderer::new(config, Arc::new(SphereOracle::default()))?;
//! let mut colors = vec![0u32; 320 * 240];
//!
//! for _ in 0..30 {
//!     let stats = renderer.render_frame(&CameraSnapshot::default(), &mut colors)?;
//!     println!("frame {}: {} hits", stats.frame_index, stats.hits);
//! }
//! ```

pub mod bricks;
pub mod camera;
pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod lod;
pub mod octree;
pub mod oracle;
pub mod ray;
pub mod renderer;
pub mod skip_node;
pub mod subdivider;
pub mod traversal;

#[cfg(test)]
mod test_utils;

pub use bricks::{BrickManager, UnifyStats};
pub use camera::{CameraProvider, CameraSnapshot};
pub use config::RenderConfig;
pub use error::{OctreeError, OracleError, Result};
pub use lod::LodConstants;
pub use octree::{Face, NodeBox, NodeId, Octree, TreeCounts, VoxelNode};
pub use oracle::{EmptyOracle, FnOracle, FractalOracle, OracleResult, SolidOracle, SphereOracle};
pub use ray::Ray;
pub use renderer::{FrameStats, PostProcess, Renderer};
pub use skip_node::SkipNode;
pub use subdivider::{
  AdaptiveSubdivider, NullSink, SubdividerConfig, SubdivisionQueue, SubdivisionRequest,
  SubdivisionSink, SubdivisionStats,
};
pub use traversal::{RayHit, Traversal, TraversalStrategy};
