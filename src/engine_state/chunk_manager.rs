//! # Chunk Manager
//!
//! Drives the chunk lifecycle around a moving viewer:
//!
//! ```text
//! request → queue → generate (worker) → mesh → hot tier → cold tier → evicted
//! ```
//!
//! The manager owns the scheduler, both cache tiers, the voxel buffer pool and
//! the renderer collaborator, and mutates all of them from the calling thread
//! only. Workers never see cache state; they receive a task and a buffer and
//! send back a generated chunk.
//!
//! ## Per-tick work
//!
//! 1. Collect finished generation results, mesh them and upload them
//! 2. Request chunks within the render radius, nearest band first, while the
//!    hot tier plus outstanding work stays under the hot capacity
//! 3. Cancel queued tasks that fell outside the unload radius
//! 4. Unload hot chunks beyond the radius plus the hysteresis margin
//! 5. Demote the farthest hot chunks outside the radius while the hot tier is
//!    over capacity

use std::time::Duration;

use cgmath::Point3;
use log::{debug, info};
use web_time::Instant;

use crate::config::EngineConfig;

use super::{
    rendering::{ChunkRenderer, SurfaceMesher},
    task_management::{
        task::{ChunkSource, FailureRecord, TaskOutcome, TaskPriority, TaskState},
        PublishOutcome, SchedulerError, TaskManager,
    },
    voxels::{
        cache::{ChunkCache, ChunkRecord},
        chunk::{ChunkCoordinate, ChunkDimensions, VoxelBufferPool},
        generation::TerrainGenerator,
    },
};

/// Running counters and current sizes, for display or logging.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkStats {
    /// Chunks in the hot tier.
    pub chunks_loaded: usize,
    /// Chunks in the cold tier.
    pub chunks_cold: usize,
    /// Requests answered from the hot or cold tier.
    pub cache_hits: u64,
    /// Requests that had to queue generation.
    pub cache_misses: u64,
    /// Workers currently generating.
    pub workers_active: usize,
    /// Tasks waiting for a worker.
    pub tasks_queued: usize,
    /// Vertices currently uploaded to the renderer.
    pub vertices_rendered: usize,
    /// Chunks generated and meshed.
    pub generated: u64,
    /// Coordinates that permanently failed.
    pub failed: u64,
    /// Records discarded from the cold tier.
    pub evicted: u64,
    /// Queued tasks cancelled before dispatch.
    pub cancelled: u64,
}

/// How [`ChunkManager::request_chunk`] satisfied a request.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Already in the hot tier.
    HotHit,
    /// Moved from the cold tier to the hot tier.
    Promoted,
    /// Generation was queued.
    Queued,
    /// Generation was already queued or running.
    AlreadyRequested,
}

/// What one [`ChunkManager::tick`] did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The viewer's chunk.
    pub viewer_chunk: ChunkCoordinate,
    /// Chunks that were requested (queued or promoted).
    pub requested: usize,
    /// Hot chunks unloaded to the cold tier.
    pub unloaded: usize,
    /// Queued tasks cancelled.
    pub cancelled: usize,
    /// In-range chunks left unrequested because the hot tier is full.
    pub deferred: usize,
}

/// Owns the scheduler, caches and renderer, and keeps the loaded set centred on
/// the viewer.
pub struct ChunkManager<R: ChunkRenderer> {
    config: EngineConfig,
    dimensions: ChunkDimensions,
    task_manager: TaskManager,
    cache: ChunkCache,
    pool: VoxelBufferPool,
    mesher: SurfaceMesher,
    renderer: R,
    viewer_chunk: ChunkCoordinate,
    stats: ChunkStats,
}

impl<R: ChunkRenderer> ChunkManager<R> {
    /// Creates a manager whose workers run the terrain generator.
    ///
    /// # Arguments
    /// * `config` - Validated engine configuration
    /// * `renderer` - Receives meshes and unload notifications
    pub fn new(config: EngineConfig, renderer: R) -> Result<Self, SchedulerError> {
        let dimensions = ChunkDimensions::new(config.world.chunk_side, config.world.chunk_height);
        let terrain = config.terrain.clone();
        Self::with_source(config, renderer, move |_| TerrainGenerator::new(dimensions, &terrain))
    }

    /// Creates a manager whose worker `id` runs `source_factory(id)`.
    pub fn with_source<F, S>(config: EngineConfig, renderer: R, source_factory: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(usize) -> S,
        S: ChunkSource + 'static,
    {
        let dimensions = ChunkDimensions::new(config.world.chunk_side, config.world.chunk_height);
        let task_manager = TaskManager::new(&config.workers, source_factory)?;
        let cache = ChunkCache::new(config.cache.cold_capacity);
        let pool = VoxelBufferPool::new(dimensions, config.cache.buffer_pool_capacity);

        info!(
            "Chunk manager ready: {}x{}x{} chunks, render distance {}, {} workers",
            dimensions.side,
            dimensions.height,
            dimensions.side,
            config.effective_render_distance(),
            task_manager.worker_count()
        );

        Ok(ChunkManager {
            config,
            dimensions,
            task_manager,
            cache,
            pool,
            mesher: SurfaceMesher::default(),
            renderer,
            viewer_chunk: ChunkCoordinate::default(),
            stats: ChunkStats::default(),
        })
    }

    /// Asks for `coordinate` to be loaded.
    ///
    /// Never blocks. A hot chunk is a no-op, a cold chunk is promoted and
    /// re-uploaded, an outstanding task is left alone (or moved to a more urgent
    /// band), and anything else is queued and dispatched if a worker is idle.
    pub fn request_chunk(&mut self, coordinate: ChunkCoordinate, priority: TaskPriority) -> RequestOutcome {
        if self.cache.is_hot(coordinate) {
            self.stats.cache_hits += 1;
            return RequestOutcome::HotHit;
        }

        if self.task_manager.is_outstanding(coordinate) {
            self.task_manager.publish_task(coordinate, priority);
            return RequestOutcome::AlreadyRequested;
        }

        let origin = coordinate.origin(self.dimensions.side);
        if let Some(record) = self.cache.promote(coordinate) {
            self.stats.cache_hits += 1;
            self.stats.vertices_rendered += record.mesh.vertex_count();
            self.renderer.upload(coordinate, origin, &record.mesh);
            debug!("Promoted chunk {} from the cold tier", coordinate);
            return RequestOutcome::Promoted;
        }

        self.stats.cache_misses += 1;
        let outcome = self.task_manager.publish_task(coordinate, priority);
        debug_assert_eq!(outcome, PublishOutcome::Queued);
        self.task_manager.process_queued_tasks(&mut self.pool);
        RequestOutcome::Queued
    }

    /// Meshes and stores every finished chunk, then refills idle workers.
    ///
    /// # Returns
    /// The number of chunks that entered the hot tier.
    pub fn process_completed_tasks(&mut self) -> usize {
        let outcomes = self.task_manager.process_completed_tasks();
        let loaded = self.handle_outcomes(outcomes);
        self.task_manager.process_queued_tasks(&mut self.pool);
        loaded
    }

    /// Blocks until the scheduler is idle or `timeout` passes, processing
    /// completions as they arrive.
    ///
    /// # Returns
    /// `true` if nothing is queued or running.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.process_completed_tasks();

        while !self.task_manager.is_idle() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let outcomes = self.task_manager.wait_for_completed(deadline - now);
            self.handle_outcomes(outcomes);
            self.task_manager.process_queued_tasks(&mut self.pool);
        }

        self.task_manager.is_idle()
    }

    fn handle_outcomes(&mut self, outcomes: Vec<TaskOutcome>) -> usize {
        let mut loaded = 0;
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Completed(chunk) => {
                    let coordinate = chunk.coordinate;
                    let mesh = self.mesher.mesh(&chunk.voxels);
                    let origin = coordinate.origin(self.dimensions.side);

                    self.renderer.upload(coordinate, origin, &mesh);
                    self.stats.vertices_rendered += mesh.vertex_count();
                    self.stats.generated += 1;
                    debug!(
                        "Loaded chunk {}: {} vertices, generated in {:?}",
                        coordinate,
                        mesh.vertex_count(),
                        chunk.elapsed
                    );

                    self.cache.insert_hot(ChunkRecord::new(chunk, mesh));
                    loaded += 1;
                }
                TaskOutcome::Retrying { .. } => {}
                TaskOutcome::PermanentlyFailed { .. } => {
                    self.stats.failed += 1;
                }
            }
        }
        if loaded > 0 {
            self.enforce_hot_capacity();
        }
        loaded
    }

    /// Updates the loaded set for a viewer at world-space `viewer`.
    pub fn tick(&mut self, viewer: Point3<f32>) -> TickReport {
        self.process_completed_tasks();

        let center = ChunkCoordinate::from_world(viewer, self.dimensions.side);
        self.viewer_chunk = center;
        let radius = self.config.effective_render_distance();
        let unload_distance = radius as f32 + self.config.world.unload_margin;
        let mut report = TickReport {
            viewer_chunk: center,
            ..TickReport::default()
        };

        // Request the desired set, nearest band first. Outstanding work counts
        // against the hot capacity since it lands in the hot tier.
        let limit = self.config.world.max_requests_per_tick;
        let capacity = self.config.cache.hot_capacity;
        for (coordinate, priority) in self.desired_chunks(center, radius) {
            if self.cache.is_hot(coordinate) {
                continue;
            }
            if self.task_manager.is_outstanding(coordinate) {
                self.task_manager.publish_task(coordinate, priority);
                continue;
            }
            if self.cache.hot_len() + self.task_manager.outstanding_len() >= capacity {
                report.deferred += 1;
                continue;
            }
            if limit.is_some_and(|limit| report.requested >= limit) {
                continue;
            }
            self.request_chunk(coordinate, priority);
            report.requested += 1;
        }

        // Queued work that scrolled out of range is dropped; running work finishes
        let stale: Vec<ChunkCoordinate> = self
            .task_manager
            .queued_tasks()
            .map(|task| task.coordinate)
            .filter(|c| c.distance_to(center) > unload_distance)
            .collect();
        for coordinate in stale {
            if self.task_manager.cancel_task(coordinate) {
                report.cancelled += 1;
                self.stats.cancelled += 1;
            }
        }

        for coordinate in self.cache.hot_coordinates() {
            if coordinate.distance_to(center) > unload_distance && self.unload_chunk(coordinate) {
                report.unloaded += 1;
            }
        }

        self.enforce_hot_capacity();

        if report.requested > 0 || report.unloaded > 0 || report.cancelled > 0 {
            debug!(
                "Tick at {}: requested {}, unloaded {}, cancelled {}, deferred {} ({} hot, {} cold, {} queued)",
                center,
                report.requested,
                report.unloaded,
                report.cancelled,
                report.deferred,
                self.cache.hot_len(),
                self.cache.cold_len(),
                self.task_manager.queued_len()
            );
        }
        report
    }

    /// Every coordinate within `radius` of `center`, with its priority band,
    /// sorted by band and then distance.
    fn desired_chunks(&self, center: ChunkCoordinate, radius: i32) -> Vec<(ChunkCoordinate, TaskPriority)> {
        let mut candidates = Vec::new();
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coordinate =
                    ChunkCoordinate::new(center.x.saturating_add(dx), center.z.saturating_add(dz));
                let distance = coordinate.distance_to(center);
                if distance <= radius as f32 {
                    candidates.push((coordinate, self.priority_for(distance, radius), distance));
                }
            }
        }

        candidates.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.total_cmp(&b.2)));
        candidates.into_iter().map(|(c, p, _)| (c, p)).collect()
    }

    /// Priority band for a chunk `distance` chunks from the viewer.
    pub fn priority_for(&self, distance: f32, radius: i32) -> TaskPriority {
        let bands = &self.config.priority;
        if distance < bands.critical_distance {
            TaskPriority::Critical
        } else if distance < bands.high_distance {
            TaskPriority::High
        } else if distance > radius as f32 - bands.low_margin {
            TaskPriority::Low
        } else {
            TaskPriority::Normal
        }
    }

    /// Removes a hot chunk from the renderer and demotes it to the cold tier.
    ///
    /// # Returns
    /// `true` if the chunk was hot.
    pub fn unload_chunk(&mut self, coordinate: ChunkCoordinate) -> bool {
        let Some(record) = self.cache.hot(coordinate) else {
            return false;
        };
        self.stats.vertices_rendered = self
            .stats
            .vertices_rendered
            .saturating_sub(record.mesh.vertex_count());
        self.renderer.unload(coordinate);

        if let Some(evicted) = self.cache.demote(coordinate) {
            debug!("Evicted chunk {} from the cold tier", evicted.coordinate);
            self.stats.evicted += 1;
            self.pool.release(evicted.voxels);
        }
        true
    }

    /// Demotes the hot chunks farthest from the viewer until the hot tier fits.
    ///
    /// Chunks inside the load radius are never demoted, so explicit requests
    /// beyond the capacity can leave the tier over its bound until the viewer
    /// moves away.
    fn enforce_hot_capacity(&mut self) {
        let capacity = self.config.cache.hot_capacity;
        if self.cache.hot_len() <= capacity {
            return;
        }

        let center = self.viewer_chunk;
        let radius = self.config.effective_render_distance() as f32;
        let mut hot = self.cache.hot_coordinates();
        hot.sort_by(|a, b| b.distance_to(center).total_cmp(&a.distance_to(center)));
        let excess = hot.len() - capacity;
        for coordinate in hot.into_iter().take(excess) {
            if coordinate.distance_to(center) <= radius {
                break;
            }
            self.unload_chunk(coordinate);
        }
    }

    /// Forgets the whole world: cancels queued work, drops results still being
    /// generated, unloads every hot chunk and empties both tiers.
    pub fn reset(&mut self) {
        let cancelled = self.task_manager.clear();
        self.stats.cancelled += cancelled as u64;

        for coordinate in self.cache.hot_coordinates() {
            self.renderer.unload(coordinate);
        }
        for record in self.cache.clear() {
            self.pool.release(record.voxels);
        }
        self.stats.vertices_rendered = 0;
        info!("World reset ({} queued tasks cancelled)", cancelled);
    }

    /// Snapshot of the counters and current sizes.
    pub fn stats(&self) -> ChunkStats {
        ChunkStats {
            chunks_loaded: self.cache.hot_len(),
            chunks_cold: self.cache.cold_len(),
            workers_active: self.task_manager.busy_workers(),
            tasks_queued: self.task_manager.queued_len(),
            ..self.stats.clone()
        }
    }

    /// Last error and retry count for `coordinate`, if its generation failed.
    pub fn failure(&self, coordinate: ChunkCoordinate) -> Option<&FailureRecord> {
        self.task_manager.failure(coordinate)
    }

    /// Scheduler state of `coordinate`, if it is queued or running.
    pub fn task_state(&self, coordinate: ChunkCoordinate) -> Option<TaskState> {
        self.task_manager.state(coordinate)
    }

    /// The hot record for `coordinate`.
    pub fn chunk(&self, coordinate: ChunkCoordinate) -> Option<&ChunkRecord> {
        self.cache.hot(coordinate)
    }

    /// Both cache tiers.
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// The voxel buffer freelist.
    pub fn buffer_pool(&self) -> &VoxelBufferPool {
        &self.pool
    }

    /// The renderer collaborator.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the renderer collaborator.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The configuration the manager was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The viewer chunk seen by the last tick.
    pub fn viewer_chunk(&self) -> ChunkCoordinate {
        self.viewer_chunk
    }
}
