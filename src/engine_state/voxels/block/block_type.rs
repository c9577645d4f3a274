//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world and the
//! dense property table the mesher and the generator consult.

use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant is the block ID stored in a [`VoxelBuffer`]. `AIR` is 0, which
/// the rest of the engine treats as "empty".
///
/// [`VoxelBuffer`]: crate::engine_state::voxels::chunk::VoxelBuffer
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, FromPrimitive)]
pub enum BlockType {
    /// Empty space.
    AIR = 0,
    /// Surface block on dry land.
    GRASS = 1,
    /// Sub-surface band on dry land.
    DIRT = 2,
    /// Base rock, also exposed on high mountains.
    STONE = 3,
    /// Tree trunks.
    WOOD = 4,
    /// Beaches and lake beds.
    SAND = 5,
    /// Fills air between the surface and the water level.
    WATER = 6,
    /// Tree canopies.
    LEAVES = 7,
    /// Placeable glass.
    GLASS = 8,
    /// Ore found in the upper underground layers.
    COMMON_ORE = 9,
    /// Ore found only near the bottom of the world.
    RARE_ORE = 10,
    /// The immutable bottom layer.
    BEDROCK = 11,
}

/// Number of block types, and so the length of [`BLOCK_PROPERTIES`].
pub const BLOCK_TYPE_COUNT: usize = 12;

/// Static properties of a block type.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockProperties {
    /// Display color as 0xRRGGBB.
    pub color: u32,
    /// Whether the block blocks movement.
    pub solid: bool,
    /// Whether light passes through the block.
    pub transparent: bool,
}

impl BlockProperties {
    const fn new(color: u32, solid: bool, transparent: bool) -> Self {
        BlockProperties {
            color,
            solid,
            transparent,
        }
    }
}

/// Properties indexed by `BlockType as usize`.
pub static BLOCK_PROPERTIES: [BlockProperties; BLOCK_TYPE_COUNT] = [
    BlockProperties::new(0x000000, false, true),  // AIR
    BlockProperties::new(0x7CFC00, true, false),  // GRASS
    BlockProperties::new(0x8B4513, true, false),  // DIRT
    BlockProperties::new(0x808080, true, false),  // STONE
    BlockProperties::new(0x654321, true, false),  // WOOD
    BlockProperties::new(0xF4E4BC, true, false),  // SAND
    BlockProperties::new(0x006994, false, true),  // WATER
    BlockProperties::new(0x228B22, true, true),   // LEAVES
    BlockProperties::new(0xADD8E6, true, true),   // GLASS
    BlockProperties::new(0xB22222, true, false),  // COMMON_ORE
    BlockProperties::new(0xFF0000, true, false),  // RARE_ORE
    BlockProperties::new(0x1C1C1C, true, false),  // BEDROCK
];

impl BlockType {
    /// Converts a stored block ID back to a `BlockType`.
    ///
    /// Unknown IDs map to `AIR`, so a corrupt buffer renders as holes rather than
    /// aborting the mesher.
    pub fn from_id(id: BlockTypeSize) -> Self {
        BlockType::from_u8(id).unwrap_or(BlockType::AIR)
    }

    /// The ID stored in voxel buffers.
    #[inline]
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Looks up the static properties of this type.
    #[inline]
    pub fn properties(self) -> &'static BlockProperties {
        &BLOCK_PROPERTIES[self as usize]
    }

    /// `true` only for `AIR`.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == BlockType::AIR
    }

    /// The display color as normalized linear RGB.
    pub fn color_rgb(self) -> [f32; 3] {
        let c = self.properties().color;
        [
            ((c >> 16) & 0xFF) as f32 / 255.0,
            ((c >> 8) & 0xFF) as f32 / 255.0,
            (c & 0xFF) as f32 / 255.0,
        ]
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
