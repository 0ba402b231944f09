//! Shared bounded task queue for the fixed and cached engines.
//!
//! One mutex guards the FIFO; two condition variables carry the classic
//! producer/consumer handshake: submitters block on `not_full` for a
//! bounded wait, workers block on `not_empty` until work arrives or the
//! engine enters `Exiting`. An atomic length mirror lets the cached
//! engine's spawn predicate read the backlog without taking the lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::engine::StateCell;
use crate::error::SubmitError;
use crate::task::Job;

/// Outcome of a worker-side dequeue.
pub(crate) enum Popped {
    /// A job to execute.
    Job(Job),
    /// The engine is exiting; the worker should retire.
    Shutdown,
    /// One poll interval elapsed with nothing to do (timed pops only).
    Idle,
}

pub(crate) struct BoundedTaskQueue {
    jobs: Mutex<VecDeque<Job>>,
    not_full: Condvar,
    not_empty: Condvar,
    /// Lock-free mirror of the queue length.
    len: AtomicUsize,
    capacity: AtomicUsize,
}

impl BoundedTaskQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            len: AtomicUsize::new(0),
            capacity: AtomicUsize::new(capacity),
        }
    }

    /// Adjust the capacity. Only meaningful before the engine starts; the
    /// engines enforce that window.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Append one job, blocking up to `wait` for a free slot.
    pub fn push(&self, job: Job, wait: Duration) -> Result<(), SubmitError> {
        let jobs = self.jobs.lock().unwrap();
        let (mut jobs, result) = self
            .not_full
            .wait_timeout_while(jobs, wait, |q| {
                q.len() >= self.capacity.load(Ordering::Relaxed)
            })
            .unwrap();
        if result.timed_out() {
            return Err(SubmitError::QueueFull);
        }

        jobs.push_back(job);
        self.len.store(jobs.len(), Ordering::Release);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Remove one job, blocking until work arrives or `state` observes
    /// `Exiting`. Shutdown wins over queued work.
    pub fn pop(&self, state: &StateCell) -> Popped {
        let mut jobs = self.jobs.lock().unwrap();
        loop {
            if state.is_exiting() {
                return Popped::Shutdown;
            }
            if let Some(job) = jobs.pop_front() {
                return self.finish_pop(jobs, job);
            }
            jobs = self.not_empty.wait(jobs).unwrap();
        }
    }

    /// Like [`pop`](Self::pop), but reports [`Popped::Idle`] after `wait`
    /// elapses with the queue still empty. Used by the cached engine to
    /// drive its idle-expiry check.
    pub fn pop_timeout(&self, state: &StateCell, wait: Duration) -> Popped {
        let mut jobs = self.jobs.lock().unwrap();
        loop {
            if state.is_exiting() {
                return Popped::Shutdown;
            }
            if let Some(job) = jobs.pop_front() {
                return self.finish_pop(jobs, job);
            }

            let (guard, result) = self.not_empty.wait_timeout(jobs, wait).unwrap();
            jobs = guard;
            if result.timed_out() {
                if state.is_exiting() {
                    return Popped::Shutdown;
                }
                if let Some(job) = jobs.pop_front() {
                    return self.finish_pop(jobs, job);
                }
                return Popped::Idle;
            }
        }
    }

    fn finish_pop(&self, jobs: MutexGuard<'_, VecDeque<Job>>, job: Job) -> Popped {
        self.len.store(jobs.len(), Ordering::Release);
        // Other workers may still have work to take; submitters definitely
        // have a free slot now.
        if !jobs.is_empty() {
            self.not_empty.notify_all();
        }
        self.not_full.notify_all();
        Popped::Job(job)
    }

    /// Wake every parked worker for shutdown.
    ///
    /// The queue mutex is held across the broadcast so each worker is
    /// either executing a job or actually parked on `not_empty`; a worker
    /// between its state check and its wait cannot miss the signal.
    pub fn close(&self) {
        let _jobs = self.jobs.lock().unwrap();
        self.not_empty.notify_all();
    }
}
