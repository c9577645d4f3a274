//! Vertex data structures for chunk meshes.
//!
//! This module defines the vertex format handed to the renderer collaborator.

use cgmath::{Point3, Vector3};

/// A vertex of a chunk mesh.
///
/// Positions are chunk-local; the renderer places the mesh at the chunk's world
/// origin. The struct is `Pod` so it can be uploaded as raw bytes.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Color: [f32; 3] (12 bytes)
///
/// Total size: 44 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Chunk-local position
    pub position: [f32; 3],
    /// Outward face normal
    pub normal: [f32; 3],
    /// UV coordinates, spanning [0, 1] across each quad
    pub tex_coords: [f32; 2],
    /// Linear RGB color of the block
    pub color: [f32; 3],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `pos` - Chunk-local corner position
    /// * `normal` - Face normal
    /// * `u`, `v` - Texture coordinates
    /// * `color` - Block color
    pub fn new(pos: Point3<usize>, normal: Vector3<f32>, u: f32, v: f32, color: [f32; 3]) -> Self {
        Vertex {
            position: [pos.x as f32, pos.y as f32, pos.z as f32],
            normal: normal.into(),
            tex_coords: [u, v],
            color,
        }
    }
}
