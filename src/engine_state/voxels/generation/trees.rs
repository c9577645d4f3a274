//! Tree decoration.
//!
//! Placement is driven by an RNG seeded from the world seed and the chunk
//! coordinate, so decoration is as reproducible as the terrain itself.

use fastrand::Rng;

use crate::engine_state::voxels::{
    block::block_type::BlockType,
    chunk::{ChunkCoordinate, VoxelBuffer},
};

/// Chance that an eligible column grows a tree.
const TREE_CHANCE: f64 = 0.01;
const MIN_TRUNK: usize = 4;
const MAX_TRUNK: usize = 6;
/// Columns closer than this to the chunk border never grow trees, so crowns
/// stay inside the chunk.
const BORDER_MARGIN: usize = 2;
const CROWN_LAYERS: usize = 3;
const CROWN_RADIUS: i64 = 2;

/// Decoration RNG for one chunk.
pub fn chunk_rng(seed: u64, coordinate: ChunkCoordinate) -> Rng {
    let mixed = seed
        ^ (coordinate.x as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (coordinate.z as i64 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    Rng::with_seed(mixed)
}

/// `true` when column `(x, z)` is far enough from the border to hold a tree.
pub fn column_eligible(side: usize, x: usize, z: usize) -> bool {
    let limit = side.saturating_sub(BORDER_MARGIN);
    x > BORDER_MARGIN && x < limit && z > BORDER_MARGIN && z < limit
}

/// Rolls for a tree, returning its trunk height on success.
pub fn roll_tree(rng: &mut Rng) -> Option<usize> {
    if rng.f64() < TREE_CHANCE {
        Some(rng.usize(MIN_TRUNK..=MAX_TRUNK))
    } else {
        None
    }
}

/// Places a tree whose trunk starts just above `surface_y`.
///
/// Only `AIR` voxels are written, so a tree never replaces terrain, water or
/// another tree. Voxels outside the chunk are skipped.
///
/// # Arguments
/// * `voxels` - Chunk to decorate
/// * `x`, `z` - Trunk column
/// * `surface_y` - Height of the ground block under the trunk
/// * `trunk` - Trunk height in blocks
pub fn place_tree(voxels: &mut VoxelBuffer, x: usize, surface_y: usize, z: usize, trunk: usize) {
    for dy in 1..=trunk {
        place_if_air(voxels, x as i64, (surface_y + dy) as i64, z as i64, BlockType::WOOD);
    }

    let crown_start = (surface_y + trunk - 1) as i64;
    for layer in 0..CROWN_LAYERS as i64 {
        let radius = CROWN_RADIUS - layer / 2;
        let y = crown_start + layer;
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dz * dz > radius * radius {
                    continue;
                }
                place_if_air(voxels, x as i64 + dx, y, z as i64 + dz, BlockType::LEAVES);
            }
        }
    }
}

fn place_if_air(voxels: &mut VoxelBuffer, x: i64, y: i64, z: i64, block: BlockType) {
    if x < 0 || y < 0 || z < 0 {
        return;
    }
    let (x, y, z) = (x as usize, y as usize, z as usize);
    if voxels.get(x, y, z) == BlockType::AIR {
        voxels.set(x, y, z, block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::ChunkDimensions;

    #[test]
    fn tree_has_trunk_and_crown() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(16, 32));
        place_tree(&mut voxels, 8, 10, 8, 5);

        for y in 11..=13 {
            assert_eq!(voxels.get(8, y, 8), BlockType::WOOD);
        }
        assert_eq!(voxels.get(10, 14, 8), BlockType::LEAVES);
        assert_eq!(voxels.get(8, 14, 10), BlockType::LEAVES);
        assert_eq!(voxels.get(8, 10, 8), BlockType::AIR);
        assert_eq!(voxels.get(8, 20, 8), BlockType::AIR);
    }

    #[test]
    fn tree_only_fills_air() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(16, 32));
        voxels.set(9, 14, 8, BlockType::STONE);
        voxels.set(8, 12, 8, BlockType::GLASS);
        place_tree(&mut voxels, 8, 10, 8, 5);

        assert_eq!(voxels.get(9, 14, 8), BlockType::STONE);
        assert_eq!(voxels.get(8, 12, 8), BlockType::GLASS);
    }

    #[test]
    fn trees_near_the_border_are_clipped() {
        let mut voxels = VoxelBuffer::new(ChunkDimensions::new(4, 8));
        place_tree(&mut voxels, 0, 5, 0, 6);
        assert_eq!(voxels.get(0, 6, 0), BlockType::WOOD);
        assert_eq!(voxels.get(0, 7, 0), BlockType::WOOD);
    }

    #[test]
    fn border_columns_are_ineligible() {
        assert!(!column_eligible(16, 2, 8));
        assert!(!column_eligible(16, 8, 14));
        assert!(column_eligible(16, 3, 13));
        assert!(!column_eligible(4, 3, 3));
    }

    #[test]
    fn chunk_rng_is_reproducible() {
        let coordinate = ChunkCoordinate::new(-4, 9);
        let mut a = chunk_rng(42, coordinate);
        let mut b = chunk_rng(42, coordinate);
        let rolls_a: Vec<u64> = (0..8).map(|_| a.u64(..)).collect();
        let rolls_b: Vec<u64> = (0..8).map(|_| b.u64(..)).collect();
        assert_eq!(rolls_a, rolls_b);

        let mut c = chunk_rng(42, ChunkCoordinate::new(9, -4));
        assert_ne!(rolls_a[0], c.u64(..));
    }
}
