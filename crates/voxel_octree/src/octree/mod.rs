//! Sparse voxel octree storage.
//!
//! The tree is an explicit node graph kept in a segmented arena. Each node
//! links to its children, its parent, its nearest brick checkpoint and its
//! six face neighbors. Positions are never stored; they are implied by the
//! path from the root and carried alongside handles as [`NodeBox`]es.
//!
//! # Depth Convention
//!
//! Depth 0 = root (coarsest), higher depth = finer.
//!
//! ```text
//! Box edge = 2^(1 - depth)       root cube is [-1, 1]³
//! ```
//!
//! # Module Structure
//!
//! - [`node`]: `VoxelNode`, `NodeId`, `Face` and octant helpers
//! - [`bounds`]: `NodeBox` - cube geometry carried during walks
//! - [`arena`]: `NodeArena` - sibling-group storage with deferred reuse
//! - [`tree`]: `Octree` - root, forwarding, neighbor healing, queries

pub mod arena;
pub mod bounds;
pub mod node;
pub mod tree;

pub use arena::{NodeArena, NodeGroup, DEFAULT_MAX_GROUPS};
pub use bounds::NodeBox;
pub use node::{
  flags, octant_flip, octant_from_halves, octant_is_upper, octant_on_parent_face, Face, NodeId,
  NodeRef, VoxelNode,
};
pub use tree::{Octree, TreeCounts};
