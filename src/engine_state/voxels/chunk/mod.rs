//! # Chunk Module
//!
//! This module provides the data types every other subsystem passes around:
//!
//! - [`ChunkCoordinate`]: the `(cx, cz)` identity key of a chunk column
//! - [`ChunkDimensions`]: side length and height, fixed at construction
//! - [`VoxelBuffer`]: the dense block-ID array of one chunk
//! - [`ColumnMap`]: per-column auxiliary floats (height and biome maps)
//!
//! ## Memory Layout
//!
//! Voxels are stored row-major with index `x + y * side² + z * side`, one byte
//! per voxel. Every accessor bounds-checks and out-of-range reads return `AIR`,
//! so neighbour lookups at chunk borders never need special cases.

use std::fmt;

use cgmath::Point3;

use super::block::{block_type::BlockType, BlockTypeSize};

mod buffer_pool;
pub mod chunk_iteration;

pub use buffer_pool::VoxelBufferPool;

/// Integer `(cx, cz)` position of a chunk column on the chunk grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoordinate {
    /// Chunk index along world X.
    pub x: i32,
    /// Chunk index along world Z.
    pub z: i32,
}

impl ChunkCoordinate {
    /// Creates a coordinate.
    pub const fn new(x: i32, z: i32) -> Self {
        ChunkCoordinate { x, z }
    }

    /// The chunk containing a world-space position.
    pub fn from_world(position: Point3<f32>, chunk_side: usize) -> Self {
        let side = chunk_side as f32;
        ChunkCoordinate {
            x: (position.x / side).floor() as i32,
            z: (position.z / side).floor() as i32,
        }
    }

    /// World-space position of the chunk's minimum corner.
    pub fn origin(self, chunk_side: usize) -> Point3<i32> {
        let side = chunk_side as i32;
        Point3::new(self.x.saturating_mul(side), 0, self.z.saturating_mul(side))
    }

    /// Euclidean distance on the chunk grid.
    pub fn distance_to(self, other: ChunkCoordinate) -> f32 {
        let dx = (self.x as f64) - (other.x as f64);
        let dz = (self.z as f64) - (other.z as f64);
        (dx * dx + dz * dz).sqrt() as f32
    }
}

impl fmt::Display for ChunkCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Fixed chunk dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkDimensions {
    /// Horizontal side length (X and Z).
    pub side: usize,
    /// Vertical height (Y).
    pub height: usize,
}

impl ChunkDimensions {
    /// Creates a dimension pair.
    pub const fn new(side: usize, height: usize) -> Self {
        ChunkDimensions { side, height }
    }

    /// Extent along each axis, as `[x, y, z]`.
    #[inline]
    pub fn extent(&self) -> [usize; 3] {
        [self.side, self.height, self.side]
    }

    /// Number of voxels in a chunk.
    #[inline]
    pub fn volume(&self) -> usize {
        self.side * self.side * self.height
    }

    /// Number of columns in a chunk.
    #[inline]
    pub fn columns(&self) -> usize {
        self.side * self.side
    }

    /// Linear index of `(x, y, z)`, or `None` outside the chunk.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        if x < self.side && y < self.height && z < self.side {
            Some(x + y * self.side * self.side + z * self.side)
        } else {
            None
        }
    }
}

/// Dense block-ID array for one chunk.
#[derive(Clone, PartialEq, Eq)]
pub struct VoxelBuffer {
    dimensions: ChunkDimensions,
    data: Vec<BlockTypeSize>,
}

impl VoxelBuffer {
    /// Allocates an all-air buffer.
    pub fn new(dimensions: ChunkDimensions) -> Self {
        VoxelBuffer {
            dimensions,
            data: vec![BlockType::AIR.id(); dimensions.volume()],
        }
    }

    /// The buffer's dimensions.
    #[inline]
    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Block at `(x, y, z)`. Out-of-range positions read as `AIR`.
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> BlockType {
        match self.dimensions.index(x, y, z) {
            Some(i) => BlockType::from_id(self.data[i]),
            None => BlockType::AIR,
        }
    }

    /// Signed variant of [`get`](Self::get) for neighbour lookups.
    #[inline]
    pub fn get_signed(&self, x: i32, y: i32, z: i32) -> BlockType {
        if x < 0 || y < 0 || z < 0 {
            return BlockType::AIR;
        }
        self.get(x as usize, y as usize, z as usize)
    }

    /// Writes a block. Returns `false` (and writes nothing) outside the chunk.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, block: BlockType) -> bool {
        match self.dimensions.index(x, y, z) {
            Some(i) => {
                self.data[i] = block.id();
                true
            }
            None => false,
        }
    }

    /// Resets every voxel to `AIR`.
    pub fn clear(&mut self) {
        self.data.fill(BlockType::AIR.id());
    }

    /// `true` when no voxel holds a block.
    pub fn is_all_air(&self) -> bool {
        self.data.iter().all(|&id| id == BlockType::AIR.id())
    }

    /// Number of non-air voxels.
    pub fn solid_count(&self) -> usize {
        self.data.iter().filter(|&&id| id != BlockType::AIR.id()).count()
    }

    /// Raw block IDs in storage order.
    pub fn as_bytes(&self) -> &[BlockTypeSize] {
        &self.data
    }
}

impl fmt::Debug for VoxelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoxelBuffer")
            .field("dimensions", &self.dimensions)
            .field("solid", &self.solid_count())
            .finish()
    }
}

/// One float per `(x, z)` column, indexed `x + z * side`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMap {
    side: usize,
    values: Vec<f32>,
}

impl ColumnMap {
    /// Allocates a zeroed map.
    pub fn new(side: usize) -> Self {
        ColumnMap {
            side,
            values: vec![0.0; side * side],
        }
    }

    /// Value for column `(x, z)`, or `0.0` outside the chunk.
    #[inline]
    pub fn get(&self, x: usize, z: usize) -> f32 {
        if x < self.side && z < self.side {
            self.values[x + z * self.side]
        } else {
            0.0
        }
    }

    /// Writes column `(x, z)`; ignored outside the chunk.
    #[inline]
    pub fn set(&mut self, x: usize, z: usize, value: f32) {
        if x < self.side && z < self.side {
            self.values[x + z * self.side] = value;
        }
    }

    /// Side length of the map.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Raw values in storage order.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_follows_row_major_convention() {
        let dims = ChunkDimensions::new(16, 64);
        assert_eq!(dims.index(0, 0, 0), Some(0));
        assert_eq!(dims.index(1, 0, 0), Some(1));
        assert_eq!(dims.index(0, 0, 1), Some(16));
        assert_eq!(dims.index(0, 1, 0), Some(256));
        assert_eq!(dims.index(16, 0, 0), None);
        assert_eq!(dims.index(0, 64, 0), None);
    }

    #[test]
    fn out_of_bounds_reads_are_air() {
        let mut buffer = VoxelBuffer::new(ChunkDimensions::new(4, 8));
        assert!(buffer.set(3, 7, 3, BlockType::STONE));
        assert!(!buffer.set(4, 0, 0, BlockType::STONE));
        assert_eq!(buffer.get(3, 7, 3), BlockType::STONE);
        assert_eq!(buffer.get(9, 9, 9), BlockType::AIR);
        assert_eq!(buffer.get_signed(-1, 0, 0), BlockType::AIR);
        assert_eq!(buffer.solid_count(), 1);
    }

    #[test]
    fn world_position_maps_to_floor_chunk() {
        assert_eq!(
            ChunkCoordinate::from_world(Point3::new(-0.5, 10.0, 15.9), 16),
            ChunkCoordinate::new(-1, 0)
        );
        assert_eq!(
            ChunkCoordinate::from_world(Point3::new(32.0, 0.0, -16.0), 16),
            ChunkCoordinate::new(2, -1)
        );
        assert_eq!(ChunkCoordinate::new(-1, 2).origin(16), Point3::new(-16, 0, 32));
    }

    #[test]
    fn column_map_ignores_out_of_range() {
        let mut map = ColumnMap::new(4);
        map.set(1, 2, 5.0);
        map.set(8, 0, 1.0);
        assert_eq!(map.get(1, 2), 5.0);
        assert_eq!(map.get(8, 0), 0.0);
        assert_eq!(map.as_slice()[1 + 2 * 4], 5.0);
    }
}
