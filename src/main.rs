//! # Voxel World Headless Driver
//!
//! Streams terrain around a viewer walking a straight line and logs the chunk
//! statistics after every step. Useful for profiling generation and meshing
//! without a window.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release -- [config.json] [steps]
//! ```

use std::{env, path::Path, process::ExitCode, time::Duration};

use cgmath::Point3;
use log::{error, info};
use voxel_world::{ChunkManager, EngineConfig, NullRenderer};

const DEFAULT_STEPS: usize = 16;
const STEP_SIZE: f32 = 8.0;
const STEP_WAIT: Duration = Duration::from_secs(30);

fn main() -> ExitCode {
    voxel_world::init_logging();
    info!("Logger initialized");

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => match EngineConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(err) => {
                error!("{}", err);
                return ExitCode::FAILURE;
            }
        },
        None => EngineConfig::default(),
    };
    let steps = args
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_STEPS);

    let mut manager = match ChunkManager::new(config, NullRenderer) {
        Ok(manager) => manager,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let height = manager.config().world.chunk_height as f32;
    for step in 0..steps {
        let viewer = Point3::new(step as f32 * STEP_SIZE, height, 0.0);
        let report = manager.tick(viewer);
        if !manager.wait_idle(STEP_WAIT) {
            error!("Generation did not settle within {:?}", STEP_WAIT);
        }
        info!("Step {} at chunk {}: {:?}", step, report.viewer_chunk, manager.stats());
    }

    info!("Final: {:?}", manager.stats());
    ExitCode::SUCCESS
}
