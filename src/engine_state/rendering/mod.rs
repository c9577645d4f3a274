//! Rendering boundary of the voxel engine.
//!
//! This module owns mesh generation and defines the renderer collaborator the
//! chunk manager talks to. Drawing itself happens outside the crate: the core
//! hands over finished meshes and unload notifications, and never calls a
//! graphics API.

use cgmath::Point3;
use log::trace;

use super::voxels::chunk::ChunkCoordinate;

pub mod meshing;
mod vertex;

// Re-export commonly used types
pub use meshing::{ChunkMesh, MeshingStrategy, SurfaceMesher};
pub use vertex::Vertex;

/// Receives meshes for display and releases them on unload.
///
/// Implementations live on the control thread; the chunk manager calls them
/// synchronously while processing completions and unloads.
pub trait ChunkRenderer {
    /// Displays `mesh` at world-space `origin` (`coordinate × chunk side`).
    ///
    /// Called once per chunk that enters the hot tier. An empty mesh is still
    /// delivered so the renderer can track the chunk as loaded.
    fn upload(&mut self, coordinate: ChunkCoordinate, origin: Point3<i32>, mesh: &ChunkMesh);

    /// Releases any resources tied to `coordinate`.
    fn unload(&mut self, coordinate: ChunkCoordinate);
}

/// Renderer that draws nothing, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl ChunkRenderer for NullRenderer {
    fn upload(&mut self, coordinate: ChunkCoordinate, origin: Point3<i32>, mesh: &ChunkMesh) {
        trace!(
            "upload {} at {:?}: {} vertices",
            coordinate,
            origin,
            mesh.vertex_count()
        );
    }

    fn unload(&mut self, coordinate: ChunkCoordinate) {
        trace!("unload {}", coordinate);
    }
}
