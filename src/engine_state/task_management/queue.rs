//! # Task Queue
//!
//! Priority queue of [`GenerationTask`]s waiting for a worker.
//!
//! Fresh tasks are insertion-sorted by priority, then enqueue time, so pops come
//! out strictly by priority and FIFO within a band. Retried tasks are pushed to
//! the very front and stay there; fresh inserts never overtake them.

use std::collections::VecDeque;

use crate::engine_state::voxels::chunk::ChunkCoordinate;

use super::task::{GenerationTask, TaskPriority};

/// Insertion-sorted queue of pending generation tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<GenerationTask>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        TaskQueue {
            tasks: VecDeque::new(),
        }
    }

    /// Inserts a fresh task at its sorted position.
    pub fn push(&mut self, task: GenerationTask) {
        let key = task.order_key();
        let index = self
            .tasks
            .iter()
            .position(|queued| queued.attempts == 0 && queued.order_key() > key)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(index, task);
    }

    /// Re-inserts a failed task ahead of everything else.
    pub fn push_front(&mut self, task: GenerationTask) {
        self.tasks.push_front(task);
    }

    /// Removes the next task to dispatch.
    pub fn pop(&mut self) -> Option<GenerationTask> {
        self.tasks.pop_front()
    }

    /// Removes the queued task for `coordinate`, if any.
    pub fn remove(&mut self, coordinate: ChunkCoordinate) -> Option<GenerationTask> {
        let index = self.tasks.iter().position(|t| t.coordinate == coordinate)?;
        self.tasks.remove(index)
    }

    /// Raises the priority of a queued task when `priority` is more urgent.
    ///
    /// The task keeps its original enqueue time. Returns `true` if the task moved.
    pub fn upgrade(&mut self, coordinate: ChunkCoordinate, priority: TaskPriority) -> bool {
        let Some(index) = self.tasks.iter().position(|t| t.coordinate == coordinate) else {
            return false;
        };
        if self.tasks[index].priority <= priority {
            return false;
        }

        // Retries already sit at the front
        if self.tasks[index].attempts > 0 {
            self.tasks[index].priority = priority;
            return true;
        }

        match self.tasks.remove(index) {
            Some(mut task) => {
                task.priority = priority;
                self.push(task);
                true
            }
            None => false,
        }
    }

    /// Whether a task for `coordinate` is queued.
    pub fn contains(&self, coordinate: ChunkCoordinate) -> bool {
        self.tasks.iter().any(|t| t.coordinate == coordinate)
    }

    /// Queued tasks in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &GenerationTask> {
        self.tasks.iter()
    }

    /// Empties the queue, returning the removed tasks in dispatch order.
    pub fn drain(&mut self) -> Vec<GenerationTask> {
        self.tasks.drain(..).collect()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
