//! # Fixed Engine
//!
//! A constant worker population shares one bounded task queue. Workers
//! block indefinitely on `not_empty`; submitters block on `not_full` for
//! at most [`SUBMIT_WAIT`](super::SUBMIT_WAIT) before the submission is
//! refused as `QueueFull`.
//!
//! ## Shutdown
//! The engine flips its state to `Exiting`, broadcasts on `not_empty`
//! while holding the queue mutex, and waits on `all_exited` until every
//! worker has removed itself from the worker table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{PoolConfig, PoolMode};
use crate::error::{PoolError, SubmitError};
use crate::queue::bounded::{BoundedTaskQueue, Popped};
use crate::task::Job;
use crate::worker::Worker;

use super::{settable, PoolEngine, PoolMetrics, PoolState, StateCell, SUBMIT_WAIT};

pub(crate) struct FixedEngine {
    core: Arc<FixedCore>,
}

struct FixedCore {
    state: StateCell,
    queue: BoundedTaskQueue,

    /// Live workers keyed by id; a worker removes itself on exit.
    workers: Mutex<HashMap<usize, Worker>>,
    /// Signalled by each exiting worker; shutdown waits here.
    all_exited: Condvar,

    current_workers: AtomicUsize,
    idle_workers: AtomicUsize,
    init_workers: AtomicUsize,
}

impl FixedEngine {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            core: Arc::new(FixedCore {
                state: StateCell::new(),
                queue: BoundedTaskQueue::new(config.task_capacity),
                workers: Mutex::new(HashMap::new()),
                all_exited: Condvar::new(),
                current_workers: AtomicUsize::new(0),
                idle_workers: AtomicUsize::new(0),
                init_workers: AtomicUsize::new(config.init_workers),
            }),
        }
    }
}

impl FixedCore {
    fn worker_loop(self: Arc<Self>, id: usize) {
        loop {
            match self.queue.pop(&self.state) {
                Popped::Shutdown => break,
                Popped::Idle => continue,
                Popped::Job(job) => {
                    self.idle_workers.fetch_sub(1, Ordering::AcqRel);
                    // The queue lock is already released; execution never
                    // holds an engine lock.
                    job();
                    self.idle_workers.fetch_add(1, Ordering::AcqRel);
                }
            }
        }
        self.retire(id);
    }

    fn retire(&self, id: usize) {
        self.idle_workers.fetch_sub(1, Ordering::AcqRel);
        self.current_workers.fetch_sub(1, Ordering::AcqRel);

        let mut workers = self.workers.lock().unwrap();
        workers.remove(&id);
        self.all_exited.notify_all();
        debug!(worker = id, "worker exited");
    }
}

impl PoolEngine for FixedEngine {
    fn mode(&self) -> PoolMode {
        PoolMode::Fixed
    }

    fn state(&self) -> PoolState {
        self.core.state.load()
    }

    fn start(&self, init_workers: usize) -> Result<(), PoolError> {
        if init_workers == 0 {
            return Err(PoolError::InvalidWorkerCount);
        }
        if !self.core.state.transition(PoolState::Init, PoolState::Running) {
            return Err(PoolError::AlreadyStarted);
        }

        self.core.init_workers.store(init_workers, Ordering::Relaxed);
        // Counters are published before any worker runs, so a worker's
        // first decrement cannot underflow.
        self.core.current_workers.store(init_workers, Ordering::Release);
        self.core.idle_workers.store(init_workers, Ordering::Release);

        let mut workers = self.core.workers.lock().unwrap();
        for spawned in 0..init_workers {
            let worker = Worker::new();
            let core = Arc::clone(&self.core);
            if let Err(e) = worker.start(move |id| core.worker_loop(id)) {
                let missing = init_workers - spawned;
                self.core.current_workers.fetch_sub(missing, Ordering::AcqRel);
                self.core.idle_workers.fetch_sub(missing, Ordering::AcqRel);
                return Err(e);
            }
            workers.insert(worker.id(), worker);
        }
        drop(workers);

        info!(workers = init_workers, "fixed pool started");
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<(), SubmitError> {
        if self.core.state.load() != PoolState::Running {
            return Err(SubmitError::NotRunning);
        }
        self.core.queue.push(job, SUBMIT_WAIT)
    }

    fn set_task_capacity(&self, capacity: usize) {
        if settable(&self.core.state, "task_capacity") {
            self.core.queue.set_capacity(capacity);
        }
    }

    fn set_max_workers(&self, _max: usize) {
        warn!("max_workers is not supported by the fixed engine; value unchanged");
    }

    fn set_idle_timeout(&self, _timeout: Duration) {
        warn!("idle_timeout is not supported by the fixed engine; value unchanged");
    }

    fn shutdown(&self) {
        // Never started: nothing to wait for.
        if self.core.state.transition(PoolState::Init, PoolState::Exiting) {
            return;
        }
        if !self.core.state.transition(PoolState::Running, PoolState::Exiting) {
            return;
        }

        self.core.queue.close();

        let mut workers = self.core.workers.lock().unwrap();
        while !workers.is_empty() {
            workers = self.core.all_exited.wait(workers).unwrap();
        }
        debug!("fixed pool shut down");
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            mode: PoolMode::Fixed,
            state: self.core.state.load(),
            current_workers: self.core.current_workers.load(Ordering::Acquire),
            idle_workers: self.core.idle_workers.load(Ordering::Acquire),
            pending_tasks: self.core.queue.len(),
            max_workers: self.core.init_workers.load(Ordering::Relaxed),
            task_capacity: self.core.queue.capacity(),
        }
    }
}
