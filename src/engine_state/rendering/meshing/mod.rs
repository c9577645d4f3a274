//! Mesh generation for chunk rendering.
//!
//! This module converts a chunk's voxel buffer into a [`ChunkMesh`]: per-side
//! vertex and index buffers with normals, UVs and block colors, plus the set of
//! block types present for material assignment.
//!
//! # Architecture
//! - `SurfaceMesher`: Entry point, selecting the greedy or naive path
//! - `mesh/`: Face extraction, visibility bitmap and buffer assembly
//!
//! # Visibility Rules
//! A face is emitted when its block is not `AIR` and the neighbour in the face
//! direction is `AIR` or outside the chunk. There is no cross-chunk culling, so
//! chunk borders always render their outer faces.
//!
//! # Performance Considerations
//! - Greedy meshing minimizes vertex count; the naive path emits four vertices
//!   per visible face and exists to check the greedy path against
//! - Visibility queries read a padded bitmap instead of the byte buffer
//! - Meshes are kept per block side so a renderer can cull whole sides

use log::trace;
use web_time::Instant;

use crate::engine_state::voxels::{block::block_side::BlockSide, chunk::VoxelBuffer};

/// Core mesh generation algorithms and data structures.
pub mod mesh;

pub use mesh::{ChunkMesh, Face, MeshSide};

use mesh::{greedy_faces, naive_faces, Occupancy};

/// Which face extraction path a [`SurfaceMesher`] uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MeshingStrategy {
    /// Merge coplanar same-type faces into maximal rectangles.
    #[default]
    Greedy,
    /// One quad per visible voxel face.
    Naive,
}

/// Converts voxel buffers into chunk meshes.
#[derive(Copy, Clone, Debug, Default)]
pub struct SurfaceMesher {
    strategy: MeshingStrategy,
}

impl SurfaceMesher {
    /// Creates a mesher using `strategy`.
    pub fn new(strategy: MeshingStrategy) -> Self {
        SurfaceMesher { strategy }
    }

    /// The configured strategy.
    pub fn strategy(&self) -> MeshingStrategy {
        self.strategy
    }

    /// Meshes `voxels` with the configured strategy.
    ///
    /// An all-air buffer yields an empty mesh.
    pub fn mesh(&self, voxels: &VoxelBuffer) -> ChunkMesh {
        match self.strategy {
            MeshingStrategy::Greedy => Self::greedy(voxels),
            MeshingStrategy::Naive => Self::naive(voxels),
        }
    }

    /// Meshes every side with greedy merging.
    pub fn greedy(voxels: &VoxelBuffer) -> ChunkMesh {
        Self::build(voxels, MeshingStrategy::Greedy)
    }

    /// Meshes every side with one quad per visible face.
    pub fn naive(voxels: &VoxelBuffer) -> ChunkMesh {
        Self::build(voxels, MeshingStrategy::Naive)
    }

    fn build(voxels: &VoxelBuffer, strategy: MeshingStrategy) -> ChunkMesh {
        let start = Instant::now();
        let mut chunk_mesh = ChunkMesh::new();
        if voxels.is_all_air() {
            return chunk_mesh;
        }

        let occupancy = Occupancy::new(voxels);
        for side in BlockSide::all() {
            let faces = match strategy {
                MeshingStrategy::Greedy => greedy_faces(voxels, &occupancy, side),
                MeshingStrategy::Naive => naive_faces(voxels, &occupancy, side),
            };
            for face in faces {
                chunk_mesh.add_face(face);
            }
        }

        trace!(
            "{:?} meshing produced {} quads in {:?}",
            strategy,
            chunk_mesh.quad_count(),
            start.elapsed()
        );
        chunk_mesh
    }
}
