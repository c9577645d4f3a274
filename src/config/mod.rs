//! # Engine Configuration
//!
//! Fixed constants consumed at construction time by the generator, the mesher,
//! the scheduler and the chunk manager. The configuration is read once (from
//! JSON, or from [`EngineConfig::default`]) and treated as immutable for the
//! lifetime of the process.
//!
//! ## Sections
//! - [`WorldConfig`]: chunk dimensions, render distance and unload hysteresis
//! - [`TerrainConfig`]: noise seed, water level and fractal defaults
//! - [`WorkerConfig`]: worker pool size, soft timeout and retry policy
//! - [`CacheConfig`]: hot/cold tier capacities and the voxel buffer pool size
//! - [`PriorityConfig`]: distance thresholds for the priority bands
//!
//! Every section is `#[serde(default)]`, so a partial JSON file only overrides
//! the keys it names:
//!
//! ```
//! use voxel_world::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "terrain": { "seed": 7 } }"#).unwrap();
//! assert_eq!(config.terrain.seed, 7);
//! assert_eq!(config.world.chunk_side, 16);
//! ```

use std::{fs, path::Path, time::Duration};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON for [`EngineConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The values parsed but violate a structural constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for the voxel world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk dimensions and streaming radius.
    pub world: WorldConfig,
    /// Terrain generation parameters.
    pub terrain: TerrainConfig,
    /// Worker pool parameters.
    pub workers: WorkerConfig,
    /// Cache capacities.
    pub cache: CacheConfig,
    /// Priority band thresholds.
    pub priority: PriorityConfig,
}

/// Chunk dimensions and streaming radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Horizontal side length of a chunk, in voxels.
    pub chunk_side: usize,
    /// Vertical height of a chunk, in voxels.
    pub chunk_height: usize,
    /// Load radius in chunk-grid units.
    pub render_distance: i32,
    /// Load radius used when `constrained_device` is set.
    pub render_distance_constrained: i32,
    /// Selects the reduced render distance.
    pub constrained_device: bool,
    /// Extra distance beyond the load radius before a hot chunk is unloaded.
    pub unload_margin: f32,
    /// Caps the number of `request_chunk` calls issued per tick. `None` requests
    /// every qualifying candidate.
    pub max_requests_per_tick: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            chunk_side: 16,
            chunk_height: 64,
            render_distance: 8,
            render_distance_constrained: 5,
            constrained_device: false,
            unload_margin: 2.0,
            max_requests_per_tick: None,
        }
    }
}

/// Fractal noise parameters shared by the generator's height samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalParams {
    /// Number of octaves summed.
    pub octaves: u32,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Frequency of the first octave.
    pub scale: f64,
}

impl FractalParams {
    /// Creates a parameter set.
    pub const fn new(octaves: u32, persistence: f64, lacunarity: f64, scale: f64) -> Self {
        FractalParams {
            octaves,
            persistence,
            lacunarity,
            scale,
        }
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        FractalParams::new(4, 0.5, 2.0, 0.02)
    }
}

/// Terrain generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Seed for every noise field and the decoration RNG.
    pub seed: u64,
    /// Highest y filled with water above the terrain surface.
    pub water_level: usize,
    /// Base-height fractal defaults.
    pub base: FractalParams,
    /// When set, edge smoothing runs before the voxel fill so it shapes the
    /// shipped voxels. When clear, smoothing only adjusts the height map.
    pub smooth_before_fill: bool,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            seed: 42,
            water_level: 20,
            base: FractalParams::default(),
            smooth_before_fill: false,
        }
    }
}

/// Worker pool parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of generation workers.
    pub pool_size: usize,
    /// Soft timeout per task, in milliseconds. A task that finishes later than
    /// this counts as failed.
    pub task_timeout_ms: u64,
    /// Number of automatic retries after a failed attempt.
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let pool_size = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2)
            .clamp(2, 8);
        WorkerConfig {
            pool_size,
            task_timeout_ms: 5000,
            max_retries: 1,
        }
    }
}

/// Cache capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Soft bound on the hot tier.
    pub hot_capacity: usize,
    /// Hard bound on the cold tier.
    pub cold_capacity: usize,
    /// Number of released voxel buffers kept for reuse.
    pub buffer_pool_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            hot_capacity: 512,
            cold_capacity: 100,
            buffer_pool_capacity: 10,
        }
    }
}

/// Distance thresholds for the priority bands, in chunk-grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
    /// Distances strictly below this are `Critical`.
    pub critical_distance: f32,
    /// Distances strictly below this are `High`.
    pub high_distance: f32,
    /// Distances greater than `radius - low_margin` are `Low`.
    pub low_margin: f32,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        PriorityConfig {
            critical_distance: 2.0,
            high_distance: 4.0,
            low_margin: 2.0,
        }
    }
}

impl EngineConfig {
    /// Reads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        let config = Self::from_json_str(&data)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parses and validates a JSON configuration string.
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the structural constraints the rest of the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.chunk_side < 1 {
            return Err(ConfigError::Invalid("world.chunk_side must be at least 1".into()));
        }
        if world.chunk_height < 2 {
            return Err(ConfigError::Invalid("world.chunk_height must be at least 2".into()));
        }
        if world.chunk_side > u16::MAX as usize || world.chunk_height > u16::MAX as usize {
            return Err(ConfigError::Invalid("chunk dimensions must fit in u16".into()));
        }
        if world.render_distance < 0 || world.render_distance_constrained < 0 {
            return Err(ConfigError::Invalid("render distances must not be negative".into()));
        }
        if world.unload_margin <= 0.0 {
            return Err(ConfigError::Invalid(
                "world.unload_margin must be positive to avoid load/unload oscillation".into(),
            ));
        }
        if self.terrain.water_level >= world.chunk_height {
            return Err(ConfigError::Invalid(
                "terrain.water_level must be below world.chunk_height".into(),
            ));
        }
        if self.terrain.base.octaves == 0 {
            return Err(ConfigError::Invalid("terrain.base.octaves must be at least 1".into()));
        }
        if self.workers.pool_size == 0 {
            return Err(ConfigError::Invalid("workers.pool_size must be at least 1".into()));
        }
        if self.cache.cold_capacity == 0 || self.cache.hot_capacity == 0 {
            return Err(ConfigError::Invalid("cache capacities must be at least 1".into()));
        }
        Ok(())
    }

    /// The load radius in effect for this device class.
    pub fn effective_render_distance(&self) -> i32 {
        if self.world.constrained_device {
            self.world.render_distance_constrained
        } else {
            self.world.render_distance
        }
    }

    /// The soft per-task timeout.
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.workers.task_timeout_ms)
    }
}
