//! # Task Management System
//!
//! This module runs chunk generation on a fixed pool of worker threads and feeds
//! the results back to the control thread.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `TaskQueue`: Priority-ordered tasks waiting for a free worker
//! - `TaskChannel`: Communication channel between the control thread and one worker
//! - `ChunkSource`: The generation body each worker owns
//!
//! ## Threading Model
//! - Creates a pool of OS threads, each with its own task channel and its own
//!   `ChunkSource`, so no generation state is shared between workers
//! - All workers report on one shared result channel, which lets the control
//!   thread block until *any* worker finishes
//! - Queue, task states and failure records are owned by the control thread;
//!   workers only receive a task plus a voxel buffer and send back a report
//!
//! ## Task Lifecycle
//! 1. Tasks are queued via `TaskManager::publish_task()` (deduplicated by coordinate)
//! 2. `process_queued_tasks()` hands tasks to idle workers using round-robin
//! 3. Workers generate under `catch_unwind` and time the attempt
//! 4. `process_completed_tasks()` turns reports into outcomes: completed chunks,
//!    retries re-queued at the front, or permanent failures
//!
//! ## Example Usage
//! ```no_run
//! use voxel_world::config::EngineConfig;
//! use voxel_world::engine_state::task_management::{task::TaskPriority, TaskManager};
//! use voxel_world::engine_state::voxels::{
//!     chunk::{ChunkCoordinate, ChunkDimensions, VoxelBufferPool},
//!     generation::TerrainGenerator,
//! };
//!
//! let config = EngineConfig::default();
//! let dimensions = ChunkDimensions::new(config.world.chunk_side, config.world.chunk_height);
//! let mut pool = VoxelBufferPool::new(dimensions, config.cache.buffer_pool_capacity);
//! let mut task_manager = TaskManager::new(&config.workers, |_| {
//!     TerrainGenerator::new(dimensions, &config.terrain)
//! })?;
//!
//! task_manager.publish_task(ChunkCoordinate::new(0, 0), TaskPriority::Critical);
//!
//! // In the control loop:
//! task_manager.process_queued_tasks(&mut pool);
//! for outcome in task_manager.process_completed_tasks() {
//!     // mesh and cache completed chunks
//! }
//! # Ok::<(), voxel_world::engine_state::task_management::SchedulerError>(())
//! ```

pub mod queue;
pub mod task;

use std::collections::{HashMap, HashSet};
use std::io;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};
use lru::LruCache;
use thiserror::Error;
use web_time::Instant;

use crate::config::WorkerConfig;

use super::voxels::{
    chunk::{ChunkCoordinate, VoxelBuffer, VoxelBufferPool},
    generation::GeneratedChunk,
};
use queue::TaskQueue;
use task::{
    ChunkSource, FailureRecord, GenerationError, GenerationTask, TaskOutcome, TaskPriority,
    TaskState,
};

/// Number of finished coordinates whose terminal state stays queryable.
const STATE_HISTORY_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// Errors raised while building the worker pool.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Work handed to a worker: the task and the buffer to fill.
struct WorkOrder {
    task: GenerationTask,
    buffer: VoxelBuffer,
}

/// A worker's answer for one work order.
struct WorkerReport {
    worker: usize,
    task: GenerationTask,
    result: Result<GeneratedChunk, GenerationError>,
    elapsed: Duration,
}

/// Public view of one worker.
#[derive(Clone, Debug)]
pub struct WorkerSlot {
    /// Worker index, also used in its thread name.
    pub id: usize,
    /// The task the worker is running, if any.
    pub current_task: Option<GenerationTask>,
}

impl WorkerSlot {
    /// `true` while the worker is running a task.
    pub fn is_busy(&self) -> bool {
        self.current_task.is_some()
    }
}

/// A communication channel between the control thread and a worker thread.
///
/// # Fields
/// - `slot`: Identity and current assignment of the worker
/// - `task_sender`: Sends work orders to the worker
/// - `connected`: Cleared once a send fails; the channel is skipped afterwards
/// - `worker`: Handle to the worker thread, joined on shutdown
struct TaskChannel {
    slot: WorkerSlot,
    task_sender: Sender<WorkOrder>,
    connected: bool,
    worker: JoinHandle<()>,
}

impl TaskChannel {
    fn accepts_work(&self) -> bool {
        self.connected && !self.slot.is_busy()
    }
}

/// Whether a publish created, changed or ignored a task.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new task was queued.
    Queued,
    /// The coordinate was already queued and moved to a more urgent band.
    Upgraded,
    /// The coordinate was already queued at the same or a more urgent band.
    AlreadyQueued,
    /// A worker is already generating the coordinate.
    InFlight,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Keeping at most one outstanding task per coordinate
/// - Distributing tasks across idle workers in priority order
/// - Turning worker reports into completions, retries and permanent failures
///
/// # Implementation Notes
/// - Not thread-safe: owned and driven by a single control thread
/// - Drop joins the workers after closing their channels
/// - Panic-safe: a panicking task body becomes a failed attempt
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    result_receiver: Receiver<WorkerReport>,
    queued_tasks: TaskQueue,
    states: HashMap<ChunkCoordinate, TaskState>,
    history: LruCache<ChunkCoordinate, TaskState>,
    failures: HashMap<ChunkCoordinate, FailureRecord>,
    abandoned: HashSet<u64>,
    pending_outcomes: Vec<TaskOutcome>,
    current_channel: usize,
    next_sequence: u64,
    timeout: Duration,
    max_retries: u32,
}

impl TaskManager {
    /// Creates a new `TaskManager` with `config.pool_size` worker threads.
    ///
    /// # Arguments
    /// * `config` - Pool size, soft timeout and retry budget
    /// * `source_factory` - Builds the `ChunkSource` owned by worker `id`
    ///
    /// # Returns
    /// The running manager, or `SchedulerError::Spawn` if a thread could not be
    /// started. Workers spawned before the failure are shut down again.
    pub fn new<F, S>(config: &WorkerConfig, mut source_factory: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(usize) -> S,
        S: ChunkSource + 'static,
    {
        let num_workers = config.pool_size.max(1);
        let (result_tx, result_rx) = channel::<WorkerReport>();
        let mut channels = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let (task_tx, task_rx) = channel::<WorkOrder>();
            let results = result_tx.clone();
            let source = source_factory(id);

            let worker = thread::Builder::new()
                .name(format!("chunk-worker-{id}"))
                .spawn(move || worker_loop(id, source, task_rx, results));

            let worker = match worker {
                Ok(worker) => worker,
                Err(err) => {
                    error!("Failed to spawn chunk worker {id}: {err}");
                    shutdown(channels);
                    return Err(SchedulerError::Spawn(err));
                }
            };

            channels.push(TaskChannel {
                slot: WorkerSlot {
                    id,
                    current_task: None,
                },
                task_sender: task_tx,
                connected: true,
                worker,
            });
        }

        info!(
            "Started {} chunk workers (available parallelism: {:?})",
            num_workers,
            thread::available_parallelism()
        );

        Ok(TaskManager {
            channels,
            result_receiver: result_rx,
            queued_tasks: TaskQueue::new(),
            states: HashMap::new(),
            history: LruCache::new(STATE_HISTORY_CAPACITY),
            failures: HashMap::new(),
            abandoned: HashSet::new(),
            pending_outcomes: Vec::new(),
            current_channel: 0,
            next_sequence: 0,
            timeout: Duration::from_millis(config.task_timeout_ms),
            max_retries: config.max_retries,
        })
    }

    /// Queues generation of `coordinate`.
    ///
    /// Never blocks and never dispatches; call
    /// [`process_queued_tasks`](Self::process_queued_tasks) to hand work out.
    /// A coordinate with an outstanding task is never queued twice.
    pub fn publish_task(&mut self, coordinate: ChunkCoordinate, priority: TaskPriority) -> PublishOutcome {
        match self.states.get(&coordinate) {
            Some(TaskState::Assigned(_)) => return PublishOutcome::InFlight,
            Some(TaskState::Queued) => {
                return if self.queued_tasks.upgrade(coordinate, priority) {
                    debug!("Upgraded queued chunk {} to {:?}", coordinate, priority);
                    PublishOutcome::Upgraded
                } else {
                    PublishOutcome::AlreadyQueued
                };
            }
            _ => {}
        }

        let task = GenerationTask {
            coordinate,
            priority,
            enqueued_at: Instant::now(),
            sequence: self.next_sequence,
            attempts: 0,
        };
        self.next_sequence += 1;
        self.queued_tasks.push(task);
        self.history.pop(&coordinate);
        self.states.insert(coordinate, TaskState::Queued);
        PublishOutcome::Queued
    }

    /// Removes a still-queued task. Assigned tasks are never interrupted.
    ///
    /// # Returns
    /// `true` if a queued task was removed.
    pub fn cancel_task(&mut self, coordinate: ChunkCoordinate) -> bool {
        if self.states.get(&coordinate) != Some(&TaskState::Queued) {
            return false;
        }
        self.queued_tasks.remove(coordinate);
        self.finish(coordinate, TaskState::Cancelled);
        debug!("Cancelled queued chunk {}", coordinate);
        true
    }

    /// Empties the queue and abandons every running task.
    ///
    /// Abandoned tasks keep their worker busy until it reports, but their
    /// coordinates are no longer outstanding: publishing one again queues a
    /// fresh task, and the stale report is recognised by its sequence number
    /// and dropped.
    ///
    /// # Returns
    /// The number of queued tasks removed.
    pub fn clear(&mut self) -> usize {
        let drained = self.queued_tasks.drain();
        for task in &drained {
            self.finish(task.coordinate, TaskState::Cancelled);
        }

        let running: Vec<GenerationTask> = self
            .channels
            .iter()
            .filter_map(|channel| channel.slot.current_task)
            .collect();
        for task in running {
            if self.abandoned.insert(task.sequence) {
                self.finish(task.coordinate, TaskState::Cancelled);
            }
        }

        self.failures.clear();
        drained.len()
    }

    /// Moves `coordinate` from the outstanding set into the terminal history.
    fn finish(&mut self, coordinate: ChunkCoordinate, state: TaskState) {
        self.states.remove(&coordinate);
        self.history.put(coordinate, state);
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// Round-robin from the channel after the last one used, skipping busy and
    /// disconnected channels.
    ///
    /// # Returns
    /// - `Some(usize)` index of an idle channel
    /// - `None` if every channel is busy or disconnected
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|step| (self.current_channel + step) % count)
            .find(|&index| self.channels[index].accepts_work())
    }

    /// Dispatches queued tasks while idle workers exist.
    ///
    /// Each dispatched task takes a buffer from `pool`. A task whose worker
    /// turns out to be disconnected counts as a failed attempt.
    ///
    /// # Returns
    /// The number of tasks handed to workers.
    pub fn process_queued_tasks(&mut self, pool: &mut VoxelBufferPool) -> usize {
        let mut dispatched = 0;

        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                // Pool exhausted; tasks stay queued
                break;
            };
            let Some(task) = self.queued_tasks.pop() else {
                break;
            };

            let order = WorkOrder {
                task,
                buffer: pool.acquire(),
            };
            let channel = &mut self.channels[channel_idx];
            match channel.task_sender.send(order) {
                Ok(()) => {
                    channel.slot.current_task = Some(task);
                    self.states.insert(task.coordinate, TaskState::Assigned(channel_idx));
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    dispatched += 1;
                    debug!(
                        "Dispatched chunk {} ({:?}) to worker {}",
                        task.coordinate, task.priority, channel_idx
                    );
                }
                Err(returned) => {
                    error!("Chunk worker {} disconnected", channel_idx);
                    channel.connected = false;
                    pool.release(returned.0.buffer);
                    let outcome = self.fail_attempt(task, GenerationError::WorkerDisconnected);
                    self.pending_outcomes.push(outcome);
                }
            }
        }

        dispatched
    }

    /// Collects every report that has already arrived, without blocking.
    pub fn process_completed_tasks(&mut self) -> Vec<TaskOutcome> {
        let mut outcomes = std::mem::take(&mut self.pending_outcomes);
        loop {
            match self.result_receiver.try_recv() {
                Ok(report) => outcomes.extend(self.handle_report(report)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    error!("All chunk workers have exited");
                    break;
                }
            }
        }
        outcomes
    }

    /// Blocks until a report arrives or `timeout` passes, then collects
    /// everything else already waiting.
    pub fn wait_for_completed(&mut self, timeout: Duration) -> Vec<TaskOutcome> {
        let mut outcomes = std::mem::take(&mut self.pending_outcomes);
        match self.result_receiver.recv_timeout(timeout) {
            Ok(report) => outcomes.extend(self.handle_report(report)),
            Err(RecvTimeoutError::Timeout) => return outcomes,
            Err(RecvTimeoutError::Disconnected) => {
                error!("All chunk workers have exited");
                return outcomes;
            }
        }
        outcomes.extend(self.process_completed_tasks());
        outcomes
    }

    fn handle_report(&mut self, report: WorkerReport) -> Option<TaskOutcome> {
        let WorkerReport {
            worker,
            task,
            result,
            elapsed,
        } = report;

        if let Some(channel) = self.channels.get_mut(worker) {
            channel.slot.current_task = None;
        }

        if self.abandoned.remove(&task.sequence) {
            debug!("Dropped result for abandoned chunk {}", task.coordinate);
            return None;
        }

        let result = result.and_then(|chunk| {
            if elapsed > self.timeout {
                Err(GenerationError::TimedOut {
                    elapsed,
                    limit: self.timeout,
                })
            } else {
                Ok(chunk)
            }
        });

        match result {
            Ok(chunk) => {
                self.finish(task.coordinate, TaskState::Completed);
                self.failures.remove(&task.coordinate);
                debug!(
                    "Worker {} completed chunk {} in {:?}",
                    worker, task.coordinate, elapsed
                );
                Some(TaskOutcome::Completed(chunk))
            }
            Err(err) => Some(self.fail_attempt(task, err)),
        }
    }

    /// Records a failed attempt and either re-queues the task at the front or
    /// gives up on it.
    fn fail_attempt(&mut self, mut task: GenerationTask, error: GenerationError) -> TaskOutcome {
        task.attempts += 1;
        let coordinate = task.coordinate;
        let record = self.failures.entry(coordinate).or_insert_with(|| FailureRecord {
            last_error: error.clone(),
            retry_count: 0,
            permanent: false,
        });
        record.last_error = error.clone();

        if task.attempts <= self.max_retries {
            record.retry_count = task.attempts;
            warn!(
                "Chunk {} failed ({}), retry {}/{}",
                coordinate, error, task.attempts, self.max_retries
            );
            self.queued_tasks.push_front(task);
            self.states.insert(coordinate, TaskState::Queued);
            TaskOutcome::Retrying { coordinate, error }
        } else {
            record.permanent = true;
            error!("Chunk {} permanently failed: {}", coordinate, error);
            self.finish(coordinate, TaskState::PermanentlyFailed);
            TaskOutcome::PermanentlyFailed { coordinate, error }
        }
    }

    /// Scheduler state of `coordinate`.
    ///
    /// Outstanding tasks report `Queued` or `Assigned`. Once a task ends, its
    /// terminal state stays visible until the coordinate is published again or
    /// ages out of a bounded history. `None` means the scheduler has no record.
    pub fn state(&self, coordinate: ChunkCoordinate) -> Option<TaskState> {
        self.states
            .get(&coordinate)
            .or_else(|| self.history.peek(&coordinate))
            .copied()
    }

    /// `true` if `coordinate` is queued or running.
    pub fn is_outstanding(&self, coordinate: ChunkCoordinate) -> bool {
        self.states.contains_key(&coordinate)
    }

    /// Failure bookkeeping for `coordinate`, kept until it next succeeds.
    pub fn failure(&self, coordinate: ChunkCoordinate) -> Option<&FailureRecord> {
        self.failures.get(&coordinate)
    }

    /// Number of coordinates queued or running. Abandoned attempts are not
    /// counted.
    pub fn outstanding_len(&self) -> usize {
        self.states.len()
    }

    /// Tasks waiting for a worker, in dispatch order.
    pub fn queued_tasks(&self) -> impl Iterator<Item = &GenerationTask> {
        self.queued_tasks.iter()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_len(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Number of workers currently running a task.
    pub fn busy_workers(&self) -> usize {
        self.channels.iter().filter(|c| c.slot.is_busy()).count()
    }

    /// Size of the pool.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Snapshot of every worker slot.
    pub fn worker_slots(&self) -> Vec<WorkerSlot> {
        self.channels.iter().map(|c| c.slot.clone()).collect()
    }

    /// `true` when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.busy_workers() == 0
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        shutdown(self.channels.drain(..).collect());
    }
}

/// Closes every task channel, then joins the workers.
fn shutdown(channels: Vec<TaskChannel>) {
    let workers: Vec<JoinHandle<()>> = channels
        .into_iter()
        .map(|channel| {
            drop(channel.task_sender);
            channel.worker
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            warn!("Chunk worker exited with a panic");
        }
    }
}

/// Body of a worker thread: generate every order until the channel closes.
fn worker_loop<S: ChunkSource>(
    id: usize,
    mut source: S,
    orders: Receiver<WorkOrder>,
    results: Sender<WorkerReport>,
) {
    debug!("Chunk worker {id} started");

    while let Ok(WorkOrder { task, buffer }) = orders.recv() {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            source.generate(task.coordinate, buffer)
        }))
        .unwrap_or_else(|payload| Err(GenerationError::Panicked(panic_message(payload))));

        let report = WorkerReport {
            worker: id,
            task,
            result,
            elapsed: start.elapsed(),
        };
        if results.send(report).is_err() {
            break;
        }
    }

    debug!("Chunk worker {id} stopped");
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    };

    use super::*;
    use crate::engine_state::voxels::{
        block::block_type::BlockType,
        chunk::{ChunkDimensions, ColumnMap},
    };

    const DIMS: ChunkDimensions = ChunkDimensions::new(4, 4);
    const WAIT: Duration = Duration::from_secs(5);

    fn chunk(coordinate: ChunkCoordinate, mut voxels: VoxelBuffer) -> GeneratedChunk {
        voxels.set(0, 0, 0, BlockType::STONE);
        GeneratedChunk {
            coordinate,
            voxels,
            height_map: ColumnMap::new(DIMS.side),
            biome_map: ColumnMap::new(DIMS.side),
            elapsed: Duration::ZERO,
        }
    }

    /// Reports every coordinate it generates.
    struct RecordingSource {
        seen: Sender<ChunkCoordinate>,
    }

    impl ChunkSource for RecordingSource {
        fn generate(
            &mut self,
            coordinate: ChunkCoordinate,
            buffer: VoxelBuffer,
        ) -> Result<GeneratedChunk, GenerationError> {
            let _ = self.seen.send(coordinate);
            Ok(chunk(coordinate, buffer))
        }
    }

    /// Misbehaves for the first `failures` calls, counted across workers.
    struct FlakySource {
        calls: Arc<AtomicUsize>,
        failures: usize,
        mode: Flake,
    }

    #[derive(Clone, Copy)]
    enum Flake {
        Error,
        Panic,
        Slow(Duration),
    }

    impl ChunkSource for FlakySource {
        fn generate(
            &mut self,
            coordinate: ChunkCoordinate,
            buffer: VoxelBuffer,
        ) -> Result<GeneratedChunk, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                match self.mode {
                    Flake::Error => return Err(GenerationError::Source("scripted failure".into())),
                    Flake::Panic => panic!("scripted panic"),
                    Flake::Slow(delay) => thread::sleep(delay),
                }
            }
            Ok(chunk(coordinate, buffer))
        }
    }

    fn config(pool_size: usize, task_timeout_ms: u64, max_retries: u32) -> WorkerConfig {
        WorkerConfig {
            pool_size,
            task_timeout_ms,
            max_retries,
        }
    }

    fn flaky(failures: usize, mode: Flake, max_retries: u32, timeout_ms: u64) -> (TaskManager, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let shared = calls.clone();
        let manager = TaskManager::new(&config(1, timeout_ms, max_retries), move |_| FlakySource {
            calls: shared.clone(),
            failures,
            mode,
        })
        .expect("spawn workers");
        (manager, calls)
    }

    /// Drives the manager until every task has finished.
    fn drain(manager: &mut TaskManager, pool: &mut VoxelBufferPool) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();
        manager.process_queued_tasks(pool);
        while !manager.is_idle() {
            outcomes.extend(manager.wait_for_completed(WAIT));
            manager.process_queued_tasks(pool);
        }
        outcomes
    }

    #[test]
    fn dispatch_follows_priority_then_fifo() {
        let (tx, rx) = mpsc::channel();
        let mut manager = TaskManager::new(&config(1, 5000, 1), move |_| RecordingSource { seen: tx.clone() })
            .expect("spawn workers");
        let mut pool = VoxelBufferPool::new(DIMS, 4);

        let c1 = ChunkCoordinate::new(1, 0);
        let c2 = ChunkCoordinate::new(2, 0);
        let c3 = ChunkCoordinate::new(3, 0);
        manager.publish_task(c1, TaskPriority::Normal);
        manager.publish_task(c2, TaskPriority::Critical);
        manager.publish_task(c3, TaskPriority::Normal);

        let outcomes = drain(&mut manager, &mut pool);
        assert_eq!(outcomes.len(), 3);
        let order: Vec<_> = rx.try_iter().collect();
        assert_eq!(order, vec![c2, c1, c3]);
    }

    #[test]
    fn publishing_twice_keeps_one_task() {
        let (tx, rx) = mpsc::channel();
        let mut manager = TaskManager::new(&config(1, 5000, 1), move |_| RecordingSource { seen: tx.clone() })
            .expect("spawn workers");
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(4, 4);

        assert_eq!(manager.publish_task(c, TaskPriority::Low), PublishOutcome::Queued);
        assert_eq!(manager.publish_task(c, TaskPriority::Low), PublishOutcome::AlreadyQueued);
        assert_eq!(manager.publish_task(c, TaskPriority::High), PublishOutcome::Upgraded);
        assert_eq!(manager.queued_len(), 1);

        assert_eq!(manager.process_queued_tasks(&mut pool), 1);
        assert_eq!(manager.publish_task(c, TaskPriority::Critical), PublishOutcome::InFlight);

        drain(&mut manager, &mut pool);
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(manager.state(c), Some(TaskState::Completed));
        assert!(!manager.is_outstanding(c));
    }

    /// Blocks on a shared gate before generating.
    struct GatedSource {
        gate: Arc<Mutex<()>>,
        seen: Sender<ChunkCoordinate>,
    }

    impl ChunkSource for GatedSource {
        fn generate(
            &mut self,
            coordinate: ChunkCoordinate,
            buffer: VoxelBuffer,
        ) -> Result<GeneratedChunk, GenerationError> {
            let _guard = self.gate.lock().map_err(|e| GenerationError::Source(e.to_string()))?;
            let _ = self.seen.send(coordinate);
            Ok(chunk(coordinate, buffer))
        }
    }

    fn gated(pool_size: usize, gate: &Arc<Mutex<()>>) -> (TaskManager, mpsc::Receiver<ChunkCoordinate>) {
        let (tx, rx) = mpsc::channel();
        let shared = gate.clone();
        let manager = TaskManager::new(&config(pool_size, 5000, 1), move |_| GatedSource {
            gate: shared.clone(),
            seen: tx.clone(),
        })
        .expect("spawn workers");
        (manager, rx)
    }

    #[test]
    fn occupancy_never_exceeds_pool_size() {
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().expect("lock gate");
        let (mut manager, _rx) = gated(2, &gate);
        let mut pool = VoxelBufferPool::new(DIMS, 4);

        for x in 0..5 {
            manager.publish_task(ChunkCoordinate::new(x, 0), TaskPriority::Normal);
        }
        assert_eq!(manager.process_queued_tasks(&mut pool), 2);
        assert_eq!(manager.busy_workers(), 2);
        assert_eq!(manager.queued_len(), 3);
        assert_eq!(manager.process_queued_tasks(&mut pool), 0);
        assert!(manager.worker_slots().iter().all(WorkerSlot::is_busy));

        drop(held);
        let outcomes = drain(&mut manager, &mut pool);
        assert_eq!(outcomes.len(), 5);
        assert!(manager.busy_workers() <= manager.worker_count());
    }

    #[test]
    fn failed_task_is_retried_once_then_succeeds() {
        let (mut manager, calls) = flaky(1, Flake::Error, 1, 5000);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(0, 0);
        manager.publish_task(c, TaskPriority::Normal);

        let outcomes = drain(&mut manager, &mut pool);
        assert!(matches!(outcomes[0], TaskOutcome::Retrying { coordinate, .. } if coordinate == c));
        assert!(matches!(outcomes[1], TaskOutcome::Completed(ref chunk) if chunk.coordinate == c));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(manager.failure(c).is_none());
    }

    #[test]
    fn second_failure_is_permanent() {
        let (mut manager, calls) = flaky(usize::MAX, Flake::Error, 1, 5000);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(2, 2);
        manager.publish_task(c, TaskPriority::Normal);

        let outcomes = drain(&mut manager, &mut pool);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[1], TaskOutcome::PermanentlyFailed { coordinate, .. } if coordinate == c));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let record = manager.failure(c).expect("failure recorded");
        assert!(record.permanent);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.last_error, GenerationError::Source("scripted failure".into()));
        assert_eq!(manager.state(c), Some(TaskState::PermanentlyFailed));
        assert!(!manager.is_outstanding(c));
    }

    #[test]
    fn panics_become_failed_attempts() {
        let (mut manager, _calls) = flaky(1, Flake::Panic, 1, 5000);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(-1, 3);
        manager.publish_task(c, TaskPriority::High);

        let outcomes = drain(&mut manager, &mut pool);
        match &outcomes[0] {
            TaskOutcome::Retrying { error, .. } => {
                assert_eq!(error, &GenerationError::Panicked("scripted panic".into()))
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(matches!(outcomes[1], TaskOutcome::Completed(_)));
    }

    #[test]
    fn slow_attempts_time_out_into_retry() {
        let (mut manager, _calls) = flaky(1, Flake::Slow(Duration::from_millis(200)), 1, 50);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(8, 8);
        manager.publish_task(c, TaskPriority::Normal);

        let outcomes = drain(&mut manager, &mut pool);
        assert!(matches!(
            outcomes[0],
            TaskOutcome::Retrying {
                error: GenerationError::TimedOut { .. },
                ..
            }
        ));
        assert!(matches!(outcomes[1], TaskOutcome::Completed(_)));
    }

    #[test]
    fn cancel_only_touches_queued_tasks() {
        let (tx, rx) = mpsc::channel();
        let mut manager = TaskManager::new(&config(1, 5000, 1), move |_| RecordingSource { seen: tx.clone() })
            .expect("spawn workers");
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let running = ChunkCoordinate::new(0, 0);
        let waiting = ChunkCoordinate::new(1, 1);

        manager.publish_task(running, TaskPriority::Critical);
        manager.publish_task(waiting, TaskPriority::Low);
        manager.process_queued_tasks(&mut pool);

        assert!(!manager.cancel_task(running));
        assert!(manager.cancel_task(waiting));
        assert!(!manager.is_outstanding(waiting));
        assert_eq!(manager.state(waiting), Some(TaskState::Cancelled));

        drain(&mut manager, &mut pool);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![running]);
    }

    #[test]
    fn cleared_tasks_produce_no_outcome() {
        let (tx, _rx) = mpsc::channel();
        let mut manager = TaskManager::new(&config(1, 5000, 1), move |_| RecordingSource { seen: tx.clone() })
            .expect("spawn workers");
        let mut pool = VoxelBufferPool::new(DIMS, 4);

        manager.publish_task(ChunkCoordinate::new(0, 0), TaskPriority::Critical);
        manager.publish_task(ChunkCoordinate::new(1, 0), TaskPriority::Normal);
        manager.process_queued_tasks(&mut pool);

        assert_eq!(manager.clear(), 1);
        let outcomes = drain(&mut manager, &mut pool);
        assert!(outcomes.is_empty());
        assert!(!manager.is_outstanding(ChunkCoordinate::new(0, 0)));
        assert_eq!(manager.state(ChunkCoordinate::new(0, 0)), Some(TaskState::Cancelled));
        assert_eq!(manager.state(ChunkCoordinate::new(1, 0)), Some(TaskState::Cancelled));
    }

    #[test]
    fn republish_after_clear_generates_again() {
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().expect("lock gate");
        let (mut manager, rx) = gated(1, &gate);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(0, 0);

        manager.publish_task(c, TaskPriority::Critical);
        assert_eq!(manager.process_queued_tasks(&mut pool), 1);
        assert_eq!(manager.clear(), 0);
        assert!(!manager.is_outstanding(c));

        // The abandoned attempt still occupies the worker, but the coordinate is free
        assert_eq!(manager.publish_task(c, TaskPriority::Critical), PublishOutcome::Queued);
        assert_eq!(manager.state(c), Some(TaskState::Queued));

        drop(held);
        let outcomes = drain(&mut manager, &mut pool);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], TaskOutcome::Completed(ref chunk) if chunk.coordinate == c));
        assert_eq!(rx.try_iter().count(), 2);
        assert_eq!(manager.state(c), Some(TaskState::Completed));
    }

    #[test]
    fn repeated_clear_does_not_swallow_later_results() {
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock().expect("lock gate");
        let (mut manager, _rx) = gated(1, &gate);
        let mut pool = VoxelBufferPool::new(DIMS, 4);
        let c = ChunkCoordinate::new(3, -2);

        manager.publish_task(c, TaskPriority::Normal);
        manager.process_queued_tasks(&mut pool);
        manager.clear();
        manager.clear();

        drop(held);
        assert!(drain(&mut manager, &mut pool).is_empty());

        manager.publish_task(c, TaskPriority::Normal);
        let outcomes = drain(&mut manager, &mut pool);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], TaskOutcome::Completed(ref chunk) if chunk.coordinate == c));
    }
}
