//! Pending-job FIFO.

use crate::types::{Job, JobId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Unbounded FIFO of pending jobs
///
/// Any number of producers may enqueue concurrently; only the worker dequeues.
/// Every operation holds the lock for a constant-time step, so none of them block
/// in any meaningful sense. Insertion order is preserved, there is no priority.
#[derive(Clone, Debug, Default)]
pub struct JobQueue {
    inner: Arc<Mutex<VecDeque<Job>>>,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the tail. Never rejects.
    pub fn enqueue(&self, job: Job) {
        self.lock().push_back(job);
    }

    /// Remove and return the head, or `None` when empty
    pub fn dequeue(&self) -> Option<Job> {
        self.lock().pop_front()
    }

    /// Number of pending jobs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no job is pending
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove the pending job with the given ID, returning whether it was still queued
    pub fn remove(&self, id: JobId) -> bool {
        let mut queue = self.lock();
        match queue.iter().position(|job| job.id == id) {
            Some(index) => queue.remove(index).is_some(),
            None => false,
        }
    }

    /// Drop every pending job, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut queue = self.lock();
        let discarded = queue.len();
        queue.clear();
        discarded
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Job>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
