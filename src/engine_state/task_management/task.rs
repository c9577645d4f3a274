//! # Task System Core Types
//!
//! This module defines the building blocks the scheduler moves between the
//! control thread and its workers:
//!
//! - [`ChunkSource`]: the task body a worker runs (terrain generation in
//!   production, scripted sources in tests)
//! - [`GenerationTask`]: a queued request for one chunk coordinate
//! - [`TaskPriority`] / [`TaskState`]: ordering and lifecycle of a task
//! - [`GenerationError`]: everything that can make an attempt fail
//!
//! ## Task Lifecycle
//! ```text
//! Queued → Assigned → Completed
//! Queued → Assigned → Queued             (failed attempt, retried at the front)
//! Queued → Assigned → PermanentlyFailed  (retry budget spent)
//! Queued → Cancelled                     (superseded while still queued)
//! Assigned → Cancelled                   (abandoned by a clear; result dropped)
//! ```
//!
//! ## Thread Safety
//! - A `ChunkSource` is moved into its worker thread and never shared
//! - Tasks and results are plain owned values sent over channels

use std::time::Duration;

use thiserror::Error;
use web_time::Instant;

use crate::engine_state::voxels::{
    chunk::{ChunkCoordinate, VoxelBuffer},
    generation::GeneratedChunk,
};

/// Why a generation attempt failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// The task body panicked; the payload message is kept when it is a string.
    #[error("generation panicked: {0}")]
    Panicked(String),
    /// The attempt finished, but later than the soft timeout allows.
    #[error("generation took {elapsed:?}, over the {limit:?} limit")]
    TimedOut {
        /// How long the attempt ran.
        elapsed: Duration,
        /// The configured soft timeout.
        limit: Duration,
    },
    /// The worker's channel closed before a result arrived.
    #[error("worker disconnected")]
    WorkerDisconnected,
    /// The source reported a failure of its own.
    #[error("generation failed: {0}")]
    Source(String),
}

/// The body of a generation task.
///
/// Each worker owns one source, built by the factory handed to
/// [`TaskManager::new`](super::TaskManager::new), so implementations may keep
/// mutable per-worker state without synchronization.
pub trait ChunkSource: Send {
    /// Produces the chunk at `coordinate`, filling `buffer` (recycled from the
    /// control thread's pool and possibly holding an older chunk's voxels).
    fn generate(
        &mut self,
        coordinate: ChunkCoordinate,
        buffer: VoxelBuffer,
    ) -> Result<GeneratedChunk, GenerationError>;
}

/// Dispatch priority. Lower values dispatch first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskPriority {
    /// Chunks directly around the viewer.
    Critical = 0,
    /// The next distance band.
    High = 1,
    /// Default band.
    Normal = 2,
    /// Chunks near the edge of the render radius.
    Low = 3,
}

/// Lifecycle state of a coordinate known to the scheduler.
///
/// A failed attempt with retries left goes straight back to `Queued` at the
/// head of the queue; its [`FailureRecord`] carries the retry count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting in the priority queue.
    Queued,
    /// Running on the given worker.
    Assigned(usize),
    /// Finished and handed back to the caller.
    Completed,
    /// Failed with no retries left.
    PermanentlyFailed,
    /// Removed from the queue, or abandoned by a clear, before it finished.
    Cancelled,
}

/// A request to generate one chunk.
///
/// Identity is the coordinate: the scheduler never holds two outstanding tasks
/// for the same coordinate.
#[derive(Copy, Clone, Debug)]
pub struct GenerationTask {
    /// Which chunk to generate.
    pub coordinate: ChunkCoordinate,
    /// Dispatch band.
    pub priority: TaskPriority,
    /// When the task entered the queue.
    pub enqueued_at: Instant,
    /// Monotonic enqueue counter, breaking ties between equal timestamps.
    pub sequence: u64,
    /// Number of failed attempts so far.
    pub attempts: u32,
}

impl GenerationTask {
    /// Sort key: priority first, then enqueue order.
    #[inline]
    pub fn order_key(&self) -> (TaskPriority, Instant, u64) {
        (self.priority, self.enqueued_at, self.sequence)
    }
}

impl PartialEq for GenerationTask {
    fn eq(&self, other: &Self) -> bool {
        self.coordinate == other.coordinate
    }
}

impl Eq for GenerationTask {}

/// Failure bookkeeping for one coordinate, kept so a caller can decide whether
/// to show a "chunk failed to load" indicator.
#[derive(Clone, Debug, PartialEq)]
pub struct FailureRecord {
    /// The most recent error.
    pub last_error: GenerationError,
    /// Retries issued after the first failure.
    pub retry_count: u32,
    /// Set once the retry budget is spent.
    pub permanent: bool,
}

/// What the scheduler hands back to its owner after a worker report.
#[derive(Debug)]
pub enum TaskOutcome {
    /// The chunk was generated within the timeout.
    Completed(GeneratedChunk),
    /// The attempt failed and was re-queued at the front.
    Retrying {
        /// The coordinate being retried.
        coordinate: ChunkCoordinate,
        /// Why the attempt failed.
        error: GenerationError,
    },
    /// The attempt failed and no retries remain.
    PermanentlyFailed {
        /// The coordinate that gave up.
        coordinate: ChunkCoordinate,
        /// The final error.
        error: GenerationError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_sort_critical_first() {
        let mut priorities = vec![
            TaskPriority::Low,
            TaskPriority::Critical,
            TaskPriority::Normal,
            TaskPriority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                TaskPriority::Critical,
                TaskPriority::High,
                TaskPriority::Normal,
                TaskPriority::Low
            ]
        );
    }

    #[test]
    fn tasks_are_identified_by_coordinate() {
        let now = Instant::now();
        let a = GenerationTask {
            coordinate: ChunkCoordinate::new(1, 2),
            priority: TaskPriority::Low,
            enqueued_at: now,
            sequence: 0,
            attempts: 0,
        };
        let b = GenerationTask {
            priority: TaskPriority::Critical,
            sequence: 9,
            ..a
        };
        assert_eq!(a, b);
    }
}
