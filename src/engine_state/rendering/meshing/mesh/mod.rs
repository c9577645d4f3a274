//! Mesh generation for voxel rendering.
//!
//! This module provides the core functionality for converting voxel data into
//! renderer-ready mesh buffers. It implements greedy meshing to reduce the number
//! of vertices and faces by combining coplanar faces with the same block type,
//! plus a naive one-quad-per-face path used as a correctness baseline.
//!
//! # Architecture
//! - [`ChunkMesh`]: The complete mesh of a chunk, one [`MeshSide`] per direction
//! - [`Face`]: A rectangle of visible block faces on one side
//! - [`Occupancy`]: Padded solidity bitmap answering face-visibility queries
//! - [`greedy_faces`] / [`naive_faces`]: The two face extraction paths

mod face;
mod greedy;
#[allow(clippy::module_inception)]
mod mesh;
mod occupancy;

pub use face::Face;
pub use greedy::{greedy_faces, naive_faces};
pub use mesh::{ChunkMesh, MeshSide};
pub use occupancy::Occupancy;
