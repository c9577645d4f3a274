//! Mesh data structures and operations for voxel rendering.
//!
//! This module provides the core data structures for chunk meshes and the
//! conversion from merged faces to vertex and index buffers.

use std::collections::BTreeSet;

use crate::engine_state::{
    rendering::Vertex,
    voxels::block::{block_side::BlockSide, block_type::BlockType},
};

use super::face::Face;

/// Represents a single side of a mesh with its associated vertices and indices.
///
/// Each `MeshSide` corresponds to one of the six possible block faces and contains
/// the vertex and index data needed to render that face.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSide {
    /// The vertex data for this mesh side
    pub vertices: Vec<Vertex>,
    /// The index data for this mesh side
    pub indices: Vec<u32>,
    /// The faces the buffers were built from
    pub faces: Vec<Face>,
    /// Which block side this mesh represents
    pub side: BlockSide,
}

impl MeshSide {
    /// Creates a new, empty `MeshSide` for the specified block side.
    pub fn new(side: BlockSide) -> Self {
        MeshSide {
            vertices: Vec::new(),
            indices: Vec::new(),
            faces: Vec::new(),
            side,
        }
    }
}

/// A complete chunk mesh, one [`MeshSide`] per face direction.
///
/// An empty mesh (no visible faces) is a normal result meaning "nothing to
/// render".
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMesh {
    /// Array of mesh sides, indexed by `BlockSide` enum values.
    pub mesh: [MeshSide; 6],
    /// Every block type with at least one visible face, for material assignment.
    pub block_types: BTreeSet<BlockType>,
}

impl Default for ChunkMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkMesh {
    /// Creates a new, empty mesh with all sides initialized.
    pub fn new() -> Self {
        ChunkMesh {
            mesh: BlockSide::all().map(MeshSide::new),
            block_types: BTreeSet::new(),
        }
    }

    /// Appends one face: four vertices and six indices on its side.
    pub fn add_face(&mut self, face: Face) {
        let side = &mut self.mesh[face.block_side as usize];
        let num_faces_generated = side.faces.len() as u32;

        side.vertices.extend(Self::generate_face_vertices(&face));
        side.indices.extend(Self::generate_face_indices(num_faces_generated));
        side.faces.push(face);
        self.block_types.insert(face.block_type);
    }

    /// Generates vertex data for a single face.
    ///
    /// # Returns
    /// The four corners in the order `ll, lr, ul, ur` for positive sides, and
    /// `ll, ul, lr, ur` for negative sides, so the triangles from
    /// [`generate_face_indices`](Self::generate_face_indices) wind
    /// counter-clockwise when seen from outside the block.
    pub fn generate_face_vertices(face: &Face) -> [Vertex; 4] {
        let [ll, lr, ul, ur] = face.corners();
        let normal = face.block_side.normal();
        let color = face.block_type.color_rgb();

        let ll = Vertex::new(ll, normal, 0.0, 0.0, color);
        let lr = Vertex::new(lr, normal, 1.0, 0.0, color);
        let ul = Vertex::new(ul, normal, 0.0, 1.0, color);
        let ur = Vertex::new(ur, normal, 1.0, 1.0, color);

        if face.block_side.is_positive() {
            [ll, lr, ul, ur]
        } else {
            [ll, ul, lr, ur]
        }
    }

    /// Generates index data for a face, adjusted by the number of previously generated faces.
    ///
    /// # Returns
    /// Six indices forming two triangles over the face's four vertices.
    pub fn generate_face_indices(num_faces_generated: u32) -> [u32; 6] {
        let base = num_faces_generated * 4;
        [base, base + 1, base + 3, base, base + 3, base + 2]
    }

    /// The mesh side for `side`.
    pub fn side(&self, side: BlockSide) -> &MeshSide {
        &self.mesh[side as usize]
    }

    /// Gets the number of vertices for each side of the mesh.
    pub fn get_vertex_lens(&self) -> [u64; 6] {
        std::array::from_fn(|i| self.mesh[i].vertices.len() as u64)
    }

    /// Total vertex count across all sides.
    pub fn vertex_count(&self) -> usize {
        self.mesh.iter().map(|side| side.vertices.len()).sum()
    }

    /// Total index count across all sides.
    pub fn index_count(&self) -> usize {
        self.mesh.iter().map(|side| side.indices.len()).sum()
    }

    /// Total number of quads.
    pub fn quad_count(&self) -> usize {
        self.mesh.iter().map(|side| side.faces.len()).sum()
    }

    /// `true` when the mesh has nothing to render.
    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Every covered unit face as `(voxel, side)`, the rasterized visibility set.
    pub fn visible_faces(&self) -> BTreeSet<([usize; 3], BlockSide)> {
        self.mesh
            .iter()
            .flat_map(|side| side.faces.iter())
            .flat_map(|face| {
                face.unit_cells()
                    .map(move |cell| ([cell.x, cell.y, cell.z], face.block_side))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Point3, Vector3};

    use super::*;

    fn triangle_normal(vertices: &[Vertex], indices: &[u32]) -> Vector3<f32> {
        let p = |i: u32| Vector3::from(vertices[i as usize].position);
        let (a, b, c) = (p(indices[0]), p(indices[1]), p(indices[2]));
        (b - a).cross(c - a).normalize()
    }

    #[test]
    fn triangles_wind_outwards_on_every_side() {
        for side in BlockSide::all() {
            let mut mesh = ChunkMesh::new();
            mesh.add_face(Face::new(side, BlockType::STONE, Point3::new(1, 1, 1), 2, 3));
            let mesh_side = mesh.side(side);

            for triangle in mesh_side.indices.chunks(3) {
                let normal = triangle_normal(&mesh_side.vertices, triangle);
                let expected = side.normal();
                assert_relative_eq!(normal.x, expected.x);
                assert_relative_eq!(normal.y, expected.y);
                assert_relative_eq!(normal.z, expected.z);
            }
        }
    }

    #[test]
    fn indices_offset_by_previous_faces() {
        assert_eq!(ChunkMesh::generate_face_indices(0), [0, 1, 3, 0, 3, 2]);
        assert_eq!(ChunkMesh::generate_face_indices(2), [8, 9, 11, 8, 11, 10]);
    }

    #[test]
    fn uvs_span_the_unit_square() {
        let face = Face::new(BlockSide::TOP, BlockType::GRASS, Point3::new(0, 0, 0), 4, 4);
        let vertices = ChunkMesh::generate_face_vertices(&face);
        for vertex in vertices {
            assert!(vertex.tex_coords.iter().all(|&t| t == 0.0 || t == 1.0));
            assert_eq!(vertex.color, BlockType::GRASS.color_rgb());
        }
    }

    #[test]
    fn counts_and_block_types() {
        let mut mesh = ChunkMesh::new();
        assert!(mesh.is_empty());
        mesh.add_face(Face::unit(BlockSide::TOP, BlockType::SAND, Point3::new(0, 0, 0)));
        mesh.add_face(Face::unit(BlockSide::LEFT, BlockType::WOOD, Point3::new(0, 0, 0)));

        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.index_count(), 12);
        assert_eq!(mesh.get_vertex_lens()[BlockSide::TOP as usize], 4);
        assert_eq!(
            mesh.block_types.iter().copied().collect::<Vec<_>>(),
            vec![BlockType::WOOD, BlockType::SAND]
        );
    }
}
