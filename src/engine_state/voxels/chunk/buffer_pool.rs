//! # Voxel Buffer Pool
//!
//! A freelist of released [`VoxelBuffer`]s. Buffers discarded by cache eviction
//! are returned here and handed to the next generation task, so steady-state
//! streaming stops allocating chunk-sized arrays.
//!
//! Recycled buffers keep whatever the previous chunk left in them; the
//! generator clears the buffer it is handed.

use log::trace;

use super::{ChunkDimensions, VoxelBuffer};

/// Bounded freelist of voxel buffers with a fixed shape.
#[derive(Debug)]
pub struct VoxelBufferPool {
    dimensions: ChunkDimensions,
    capacity: usize,
    free: Vec<VoxelBuffer>,
    allocated: usize,
    reused: usize,
}

impl VoxelBufferPool {
    /// Creates an empty pool holding at most `capacity` released buffers.
    pub fn new(dimensions: ChunkDimensions, capacity: usize) -> Self {
        VoxelBufferPool {
            dimensions,
            capacity,
            free: Vec::with_capacity(capacity),
            allocated: 0,
            reused: 0,
        }
    }

    /// Takes a buffer from the freelist, allocating if it is empty.
    pub fn acquire(&mut self) -> VoxelBuffer {
        match self.free.pop() {
            Some(buffer) => {
                self.reused += 1;
                buffer
            }
            None => {
                self.allocated += 1;
                VoxelBuffer::new(self.dimensions)
            }
        }
    }

    /// Returns a buffer to the freelist. Buffers of another shape, or beyond the
    /// pool's capacity, are dropped.
    pub fn release(&mut self, buffer: VoxelBuffer) {
        if buffer.dimensions() != self.dimensions || self.free.len() >= self.capacity {
            trace!("dropping released voxel buffer");
            return;
        }
        self.free.push(buffer);
    }

    /// Number of buffers currently on the freelist.
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Total fresh allocations performed by [`acquire`](Self::acquire).
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Total acquisitions served from the freelist.
    pub fn reused(&self) -> usize {
        self.reused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::block_type::BlockType;

    #[test]
    fn released_buffers_are_reused_without_reallocation() {
        let dims = ChunkDimensions::new(4, 4);
        let mut pool = VoxelBufferPool::new(dims, 2);
        let mut buffer = pool.acquire();
        buffer.set(1, 1, 1, BlockType::DIRT);
        pool.release(buffer);
        assert_eq!(pool.available(), 1);

        // Contents survive; clearing is the generator's job.
        let again = pool.acquire();
        assert_eq!(again.get(1, 1, 1), BlockType::DIRT);
        assert_eq!(pool.allocated(), 1);
        assert_eq!(pool.reused(), 1);
    }

    #[test]
    fn capacity_and_shape_are_enforced() {
        let dims = ChunkDimensions::new(4, 4);
        let mut pool = VoxelBufferPool::new(dims, 1);
        pool.release(VoxelBuffer::new(dims));
        pool.release(VoxelBuffer::new(dims));
        pool.release(VoxelBuffer::new(ChunkDimensions::new(2, 2)));
        assert_eq!(pool.available(), 1);
    }
}
