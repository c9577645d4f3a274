//! # Chunk Iteration Module
//!
//! An iterator over the non-air voxels of a [`VoxelBuffer`], in storage order.
//! The naive mesher walks chunks with it.

use cgmath::Point3;

use crate::engine_state::voxels::block::block_type::BlockType;

use super::VoxelBuffer;

/// Iterator over every non-air voxel and its chunk-local position.
pub struct ChunkBlockIterator<'a> {
    buffer: &'a VoxelBuffer,
    offset: usize,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Starts iterating at the first voxel of `buffer`.
    pub fn new(buffer: &'a VoxelBuffer) -> Self {
        ChunkBlockIterator { buffer, offset: 0 }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = (Point3<usize>, BlockType);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.buffer.as_bytes();
        let side = self.buffer.dimensions().side;
        let plane = side * side;

        while self.offset < bytes.len() {
            let offset = self.offset;
            self.offset += 1;

            let block = BlockType::from_id(bytes[offset]);
            if block.is_empty() {
                continue;
            }
            // Inverse of `x + y * side² + z * side`
            let y = offset / plane;
            let rest = offset % plane;
            let z = rest / side;
            let x = rest % side;
            return Some((Point3::new(x, y, z), block));
        }

        None
    }
}
