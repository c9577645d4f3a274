//! Padded solidity bitmap used for face-visibility checks.
//!
//! The bitmap has a one-voxel border of empty cells around the chunk, so a
//! neighbour lookup one step outside the chunk needs no bounds check and reads
//! as empty.

use bitvec::vec::BitVec;

use crate::engine_state::voxels::{block::block_side::BlockSide, chunk::VoxelBuffer};

/// One bit per voxel (plus padding): set when the voxel holds a block.
pub struct Occupancy {
    wrapped: [usize; 3],
    bits: BitVec,
}

impl Occupancy {
    /// Builds the bitmap for `voxels`.
    pub fn new(voxels: &VoxelBuffer) -> Self {
        let [sx, sy, sz] = voxels.dimensions().extent();
        let wrapped = [sx + 2, sy + 2, sz + 2];
        let mut bits = BitVec::repeat(false, wrapped[0] * wrapped[1] * wrapped[2]);

        for y in 0..sy {
            for z in 0..sz {
                for x in 0..sx {
                    if !voxels.get(x, y, z).is_empty() {
                        let index = Self::wrapped_index(wrapped, x + 1, y + 1, z + 1);
                        bits.set(index, true);
                    }
                }
            }
        }

        Occupancy { wrapped, bits }
    }

    #[inline]
    fn wrapped_index(wrapped: [usize; 3], x: usize, y: usize, z: usize) -> usize {
        x + y * wrapped[0] * wrapped[2] + z * wrapped[0]
    }

    /// Whether the voxel at chunk-local `(x, y, z)` is solid.
    #[inline]
    pub fn is_solid(&self, x: usize, y: usize, z: usize) -> bool {
        self.bits[Self::wrapped_index(self.wrapped, x + 1, y + 1, z + 1)]
    }

    /// Whether the `side` face of the solid voxel at `(x, y, z)` is exposed.
    ///
    /// Neighbours outside the chunk count as empty.
    #[inline]
    pub fn is_face_exposed(&self, x: usize, y: usize, z: usize, side: BlockSide) -> bool {
        let [dx, dy, dz] = side.offset();
        // Padding keeps every shifted index in range
        let nx = (x as isize + 1 + dx as isize) as usize;
        let ny = (y as isize + 1 + dy as isize) as usize;
        let nz = (z as isize + 1 + dz as isize) as usize;
        !self.bits[Self::wrapped_index(self.wrapped, nx, ny, nz)]
    }
}
