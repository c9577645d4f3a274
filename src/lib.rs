#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! Procedural, infinite voxel terrain streamed around a moving viewer.
//!
//! The crate generates chunks from seeded fractal noise on a pool of worker
//! threads, turns them into greedy-meshed vertex buffers, and keeps a hot set of
//! chunks near the viewer plus a bounded cold set of recently unloaded ones.
//! Drawing is left to a [`ChunkRenderer`] supplied by the caller.
//!
//! ## Key Modules
//!
//! * `config` - Engine configuration, loaded from JSON
//! * `engine_state` - Chunk lifecycle, scheduling, generation, meshing and caching
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_world::{ChunkManager, EngineConfig, NullRenderer};
//!
//! let mut manager = ChunkManager::new(EngineConfig::default(), NullRenderer).unwrap();
//! manager.tick(Point3::new(0.0, 40.0, 0.0));
//! manager.wait_idle(std::time::Duration::from_secs(5));
//! println!("{:?}", manager.stats());
//! ```
//!
//! ## Performance Considerations
//!
//! * Nearby chunks are dispatched first through priority bands
//! * Generation never blocks the control thread
//! * Released voxel buffers are reused for later generation tasks

pub mod config;
pub mod engine_state;

pub use config::{ConfigError, EngineConfig};
pub use engine_state::{
    chunk_manager::{ChunkManager, ChunkStats, RequestOutcome, TickReport},
    rendering::{ChunkMesh, ChunkRenderer, MeshingStrategy, NullRenderer, SurfaceMesher, Vertex},
    task_management::{
        task::{ChunkSource, FailureRecord, GenerationError, TaskPriority, TaskState},
        SchedulerError, TaskManager,
    },
    voxels::{
        cache::{ChunkCache, ChunkRecord},
        chunk::{ChunkCoordinate, ChunkDimensions, VoxelBuffer},
        generation::{GeneratedChunk, TerrainGenerator},
        noise_field::NoiseField,
    },
};

/// Installs the stdout logger, filtered by `RUST_LOG`.
///
/// Call once from a binary; library code only emits through `log`.
pub fn init_logging() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
}
