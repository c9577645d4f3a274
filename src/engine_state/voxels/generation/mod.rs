//! # Terrain Generation
//!
//! Turns a chunk coordinate and a seed into a filled [`VoxelBuffer`] plus its
//! height and biome maps. Generation is a pure function of
//! `(seed, coordinate, configuration)`: two calls with the same inputs produce
//! byte-identical output on any thread.
//!
//! ## Pipeline
//!
//! 1. **Columns**: base, detail and biome fractals give every `(x, z)` column a
//!    surface height and a biome value
//! 2. **Fill**: each column is filled bottom-up with bedrock, stone, ores,
//!    caves, the surface band, and water up to the water level
//! 3. **Decoration**: trees are placed on eligible hill columns
//! 4. **Edge smoothing**: border columns are pulled towards their inner
//!    neighbour so adjacent chunks meet with smaller steps
//!
//! By default smoothing runs last and only adjusts the returned height map.
//! With [`TerrainConfig::smooth_before_fill`] it runs before the fill and so
//! shapes the voxels too.

use std::time::Duration;

use log::trace;
use web_time::Instant;

use crate::{
    config::{FractalParams, TerrainConfig},
    engine_state::task_management::task::{ChunkSource, GenerationError},
};

use super::{
    block::block_type::BlockType,
    chunk::{ChunkCoordinate, ChunkDimensions, ColumnMap, VoxelBuffer},
    noise_field::NoiseField,
};

pub mod trees;

/// Seed offsets separating the independent noise fields.
const BIOME_SEED_OFFSET: u64 = 1000;
const CAVE_SEED_OFFSET: u64 = 2000;
const ORE_SEED_OFFSET: u64 = 3000;

const DETAIL_PARAMS: FractalParams = FractalParams::new(2, 0.3, 2.5, 0.1);
const BIOME_PARAMS: FractalParams = FractalParams::new(2, 0.5, 2.0, 0.01);
const BASE_WEIGHT: f64 = 0.7;
const DETAIL_WEIGHT: f64 = 0.3;
const HEIGHT_AMPLITUDE: f64 = 20.0;

const CAVE_SCALE: f64 = 0.1;
const CAVE_THRESHOLD_DEEP: f64 = 0.8;
const CAVE_THRESHOLD: f64 = 0.7;
const DEEP_LAYER: i64 = 10;
/// Caves never open within this many blocks of the surface.
const CAVE_SURFACE_GAP: i64 = 2;

const ORE_SCALE: f64 = 0.2;
const ORE_THRESHOLD: f64 = 0.85;
const COMMON_ORE_LAYER: i64 = 30;

/// Depth of the dirt/sand band below the surface block.
const SURFACE_BAND: i64 = 3;
/// Columns this far below the water level get sand instead of grass.
const BEACH_DEPTH: i64 = 2;
const MOUNTAIN_BIOME: f32 = 0.5;
const MOUNTAIN_STONE_HEIGHT: i64 = 40;
/// Trees grow where the biome value lies strictly inside this band.
const TREE_BIOME_LIMIT: f32 = 0.3;

const SMOOTHING_PASSES: usize = 2;
const SMOOTHING_THRESHOLD: f32 = 2.0;

/// Coarse terrain class derived from the biome field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Biome {
    /// Biome value below -0.3: flat terrain.
    Plains,
    /// Biome value in `[-0.3, 0.3)`: rolling terrain, where trees grow.
    Hills,
    /// Biome value of 0.3 and above: full relief.
    Mountains,
}

impl Biome {
    /// Classifies a biome field value.
    pub fn classify(value: f32) -> Self {
        if value < -0.3 {
            Biome::Plains
        } else if value < 0.3 {
            Biome::Hills
        } else {
            Biome::Mountains
        }
    }

    /// `true` for biome values strictly inside the tree band.
    ///
    /// Narrower than [`Biome::Hills`] by its lower bound: exactly `-0.3` is
    /// hills but grows no trees.
    pub fn grows_trees(value: f32) -> bool {
        value > -TREE_BIOME_LIMIT && value < TREE_BIOME_LIMIT
    }

    /// Scale applied to the height noise for this biome.
    pub fn height_multiplier(self) -> f64 {
        match self {
            Biome::Plains => 0.3,
            Biome::Hills => 0.6,
            Biome::Mountains => 1.0,
        }
    }
}

/// Output of one generation run.
#[derive(Clone, Debug)]
pub struct GeneratedChunk {
    /// Which chunk this is.
    pub coordinate: ChunkCoordinate,
    /// Block IDs, `x + y * side² + z * side`.
    pub voxels: VoxelBuffer,
    /// Surface height per column, after edge smoothing.
    pub height_map: ColumnMap,
    /// Raw biome field value per column.
    pub biome_map: ColumnMap,
    /// Wall-clock time spent generating.
    pub elapsed: Duration,
}

/// Deterministic seeded terrain generator.
///
/// Construction builds the permutation tables of every noise field once; each
/// worker owns its own generator.
#[derive(Debug)]
pub struct TerrainGenerator {
    dimensions: ChunkDimensions,
    water_level: i64,
    smooth_before_fill: bool,
    base_params: FractalParams,
    height_noise: NoiseField,
    biome_noise: NoiseField,
    cave_noise: NoiseField,
    ore_noise: NoiseField,
}

impl TerrainGenerator {
    /// Creates a generator for chunks of `dimensions`.
    ///
    /// # Arguments
    /// * `dimensions` - Chunk side and height
    /// * `config` - Seed, water level, base fractal and smoothing order
    pub fn new(dimensions: ChunkDimensions, config: &TerrainConfig) -> Self {
        let seed = config.seed;
        TerrainGenerator {
            dimensions,
            water_level: config.water_level as i64,
            smooth_before_fill: config.smooth_before_fill,
            base_params: config.base,
            height_noise: NoiseField::new(seed),
            biome_noise: NoiseField::new(seed.wrapping_add(BIOME_SEED_OFFSET)),
            cave_noise: NoiseField::new(seed.wrapping_add(CAVE_SEED_OFFSET)),
            ore_noise: NoiseField::new(seed.wrapping_add(ORE_SEED_OFFSET)),
        }
    }

    /// The seed of the height field, which every other field derives from.
    pub fn seed(&self) -> u64 {
        self.height_noise.seed()
    }

    /// Chunk dimensions this generator produces.
    pub fn dimensions(&self) -> ChunkDimensions {
        self.dimensions
    }

    /// Generates the chunk at `coordinate` into a freshly allocated buffer.
    pub fn generate(&self, coordinate: ChunkCoordinate) -> GeneratedChunk {
        self.generate_into(coordinate, VoxelBuffer::new(self.dimensions))
    }

    /// Generates the chunk at `coordinate`, reusing `voxels` as storage.
    ///
    /// The buffer is cleared first; a buffer of the wrong shape is replaced.
    pub fn generate_into(&self, coordinate: ChunkCoordinate, mut voxels: VoxelBuffer) -> GeneratedChunk {
        let start = Instant::now();

        if voxels.dimensions() == self.dimensions {
            voxels.clear();
        } else {
            voxels = VoxelBuffer::new(self.dimensions);
        }

        let (mut height_map, biome_map) = self.sample_columns(coordinate);

        if self.smooth_before_fill {
            smooth_edges(&mut height_map);
        }
        self.fill(coordinate, &mut voxels, &height_map, &biome_map);
        self.decorate(coordinate, &mut voxels, &height_map, &biome_map);
        if !self.smooth_before_fill {
            smooth_edges(&mut height_map);
        }

        let elapsed = start.elapsed();
        trace!("Generated chunk {} in {:?}", coordinate, elapsed);

        GeneratedChunk {
            coordinate,
            voxels,
            height_map,
            biome_map,
            elapsed,
        }
    }

    /// World-space X and Z of a column.
    fn world_column(&self, coordinate: ChunkCoordinate, x: usize, z: usize) -> (f64, f64) {
        let side = self.dimensions.side as i64;
        let wx = coordinate.x as i64 * side + x as i64;
        let wz = coordinate.z as i64 * side + z as i64;
        (wx as f64, wz as f64)
    }

    fn sample_columns(&self, coordinate: ChunkCoordinate) -> (ColumnMap, ColumnMap) {
        let side = self.dimensions.side;
        let max_height = self.dimensions.height.saturating_sub(1).max(1) as f64;
        let mut height_map = ColumnMap::new(side);
        let mut biome_map = ColumnMap::new(side);

        for z in 0..side {
            for x in 0..side {
                let (wx, wz) = self.world_column(coordinate, x, z);

                let base = self.height_noise.fbm_2d(wx, wz, &self.base_params);
                let detail = self.height_noise.fbm_2d(wx, wz, &DETAIL_PARAMS);
                let biome = self.biome_noise.fbm_2d(wx, wz, &BIOME_PARAMS);

                let multiplier = Biome::classify(biome as f32).height_multiplier();
                let relief = (base * BASE_WEIGHT + detail * DETAIL_WEIGHT) * HEIGHT_AMPLITUDE * multiplier;
                let height = (self.water_level as f64 + relief).floor().clamp(1.0, max_height);

                height_map.set(x, z, height as f32);
                biome_map.set(x, z, biome as f32);
            }
        }

        (height_map, biome_map)
    }

    fn fill(
        &self,
        coordinate: ChunkCoordinate,
        voxels: &mut VoxelBuffer,
        height_map: &ColumnMap,
        biome_map: &ColumnMap,
    ) {
        let side = self.dimensions.side;
        for z in 0..side {
            for x in 0..side {
                let height = height_map.get(x, z).floor() as i64;
                let biome = biome_map.get(x, z);
                let (wx, wz) = self.world_column(coordinate, x, z);

                for y in 0..self.dimensions.height {
                    let block = self.block_at(wx, y as i64, wz, height, biome);
                    voxels.set(x, y, z, block);
                }
            }
        }
    }

    /// Block for one voxel of a column with surface `height`.
    fn block_at(&self, wx: f64, y: i64, wz: f64, height: i64, biome: f32) -> BlockType {
        if y == 0 {
            return BlockType::BEDROCK;
        }

        if y < height - CAVE_SURFACE_GAP {
            let threshold = if y < DEEP_LAYER {
                CAVE_THRESHOLD_DEEP
            } else {
                CAVE_THRESHOLD
            };
            let cave = self.cave_noise.noise_3d(wx * CAVE_SCALE, y as f64 * CAVE_SCALE, wz * CAVE_SCALE);
            if cave.abs() > threshold {
                return BlockType::AIR;
            }
        }

        if y > height {
            return if y <= self.water_level {
                BlockType::WATER
            } else {
                BlockType::AIR
            };
        }

        let beach = y <= self.water_level - BEACH_DEPTH;

        if y == height {
            return if beach {
                BlockType::SAND
            } else if biome > MOUNTAIN_BIOME && y > MOUNTAIN_STONE_HEIGHT {
                BlockType::STONE
            } else {
                BlockType::GRASS
            };
        }

        if y >= height - SURFACE_BAND {
            return if beach { BlockType::SAND } else { BlockType::DIRT };
        }

        let ore = self.ore_noise.noise_3d(wx * ORE_SCALE, y as f64 * ORE_SCALE, wz * ORE_SCALE);
        if ore > ORE_THRESHOLD {
            if y < DEEP_LAYER {
                return BlockType::RARE_ORE;
            }
            if y < COMMON_ORE_LAYER {
                return BlockType::COMMON_ORE;
            }
        }

        BlockType::STONE
    }

    fn decorate(
        &self,
        coordinate: ChunkCoordinate,
        voxels: &mut VoxelBuffer,
        height_map: &ColumnMap,
        biome_map: &ColumnMap,
    ) {
        let side = self.dimensions.side;
        let mut rng = trees::chunk_rng(self.seed(), coordinate);

        for z in 0..side {
            for x in 0..side {
                if !trees::column_eligible(side, x, z) {
                    continue;
                }
                let height = height_map.get(x, z);
                if height as i64 <= self.water_level + 1 || !Biome::grows_trees(biome_map.get(x, z)) {
                    continue;
                }
                if let Some(trunk) = trees::roll_tree(&mut rng) {
                    trees::place_tree(voxels, x, height as usize, z, trunk);
                }
            }
        }
    }
}

impl ChunkSource for TerrainGenerator {
    fn generate(&mut self, coordinate: ChunkCoordinate, buffer: VoxelBuffer) -> Result<GeneratedChunk, GenerationError> {
        Ok(self.generate_into(coordinate, buffer))
    }
}

/// Pulls border columns towards their inner neighbour.
///
/// Each pass visits the four edges; where a border column differs from the
/// column one step inward by more than the threshold, the border takes the
/// average of the two. The four corner columns are left as generated.
pub fn smooth_edges(height_map: &mut ColumnMap) {
    let side = height_map.side();
    if side < 3 {
        return;
    }
    let last = side - 1;

    let smooth = |map: &mut ColumnMap, (ex, ez): (usize, usize), (ix, iz): (usize, usize)| {
        let edge = map.get(ex, ez);
        let inner = map.get(ix, iz);
        if (edge - inner).abs() > SMOOTHING_THRESHOLD {
            map.set(ex, ez, (edge + inner) / 2.0);
        }
    };

    for _ in 0..SMOOTHING_PASSES {
        for i in 1..last {
            smooth(height_map, (0, i), (1, i));
            smooth(height_map, (last, i), (last - 1, i));
            smooth(height_map, (i, 0), (i, 1));
            smooth(height_map, (i, last), (i, last - 1));
        }
    }
}
