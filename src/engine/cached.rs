//! # Cached Engine
//!
//! Extends the fixed discipline with elastic sizing. The submit path
//! spawns one extra worker when the backlog exceeds the idle population
//! and the ceiling allows it; workers poll the queue with a one-second
//! timeout and retire themselves once they have been idle longer than the
//! configured timeout, never shrinking below the initial population.
//!
//! Spawn and expiry decisions are both taken under the worker-table mutex,
//! which serializes them: the population can neither overshoot
//! `max_workers` under a submission storm nor undershoot `init_workers`
//! when several workers expire at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{PoolConfig, PoolMode};
use crate::error::{PoolError, SubmitError};
use crate::queue::bounded::{BoundedTaskQueue, Popped};
use crate::task::Job;
use crate::worker::Worker;

use super::{settable, PoolEngine, PoolMetrics, PoolState, StateCell, IDLE_POLL, SUBMIT_WAIT};

pub(crate) struct CachedEngine {
    core: Arc<CachedCore>,
}

struct CachedCore {
    state: StateCell,
    queue: BoundedTaskQueue,

    workers: Mutex<HashMap<usize, Worker>>,
    all_exited: Condvar,

    current_workers: AtomicUsize,
    idle_workers: AtomicUsize,
    init_workers: AtomicUsize,
    max_workers: AtomicUsize,
    /// Idle expiry in milliseconds; read by every poll timeout.
    idle_timeout_ms: AtomicU64,
}

impl CachedEngine {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            core: Arc::new(CachedCore {
                state: StateCell::new(),
                queue: BoundedTaskQueue::new(config.task_capacity),
                workers: Mutex::new(HashMap::new()),
                all_exited: Condvar::new(),
                current_workers: AtomicUsize::new(0),
                idle_workers: AtomicUsize::new(0),
                init_workers: AtomicUsize::new(config.init_workers),
                max_workers: AtomicUsize::new(config.max_workers),
                idle_timeout_ms: AtomicU64::new(config.idle_timeout.as_millis() as u64),
            }),
        }
    }
}

impl CachedCore {
    fn worker_loop(self: Arc<Self>, id: usize) {
        // Idle time is measured from the last task completion on a
        // monotonic clock.
        let mut last_active = Instant::now();
        loop {
            match self.queue.pop_timeout(&self.state, IDLE_POLL) {
                Popped::Shutdown => break,
                Popped::Idle => {
                    let timeout =
                        Duration::from_millis(self.idle_timeout_ms.load(Ordering::Relaxed));
                    if last_active.elapsed() >= timeout && self.try_expire(id) {
                        return;
                    }
                }
                Popped::Job(job) => {
                    self.idle_workers.fetch_sub(1, Ordering::AcqRel);
                    job();
                    self.idle_workers.fetch_add(1, Ordering::AcqRel);
                    last_active = Instant::now();
                }
            }
        }
        self.retire(id);
    }

    /// Retire this worker if the population is still above the initial
    /// size. The check and the decrement happen under the worker-table
    /// mutex, so concurrent expiries cannot shrink below `init_workers`.
    fn try_expire(&self, id: usize) -> bool {
        let mut workers = self.workers.lock().unwrap();
        if self.current_workers.load(Ordering::Acquire) <= self.init_workers.load(Ordering::Relaxed)
        {
            return false;
        }

        self.idle_workers.fetch_sub(1, Ordering::AcqRel);
        self.current_workers.fetch_sub(1, Ordering::AcqRel);
        workers.remove(&id);
        self.all_exited.notify_all();
        debug!(worker = id, "idle worker expired");
        true
    }

    fn retire(&self, id: usize) {
        self.idle_workers.fetch_sub(1, Ordering::AcqRel);
        self.current_workers.fetch_sub(1, Ordering::AcqRel);

        let mut workers = self.workers.lock().unwrap();
        workers.remove(&id);
        self.all_exited.notify_all();
        debug!(worker = id, "worker exited");
    }

    /// Spawn one extra worker when the backlog exceeds the idle
    /// population. The surplus predicate is a lock-free heuristic; the
    /// ceiling check is re-taken under the worker-table mutex, which
    /// serializes all spawns.
    fn maybe_spawn(core: &Arc<Self>) {
        if core.queue.len() <= core.idle_workers.load(Ordering::Acquire) {
            return;
        }

        let mut workers = core.workers.lock().unwrap();
        if core.state.load() != PoolState::Running {
            return;
        }
        if core.current_workers.load(Ordering::Acquire) >= core.max_workers.load(Ordering::Relaxed)
        {
            return;
        }
        if core.queue.len() <= core.idle_workers.load(Ordering::Acquire) {
            return;
        }

        let worker = Worker::new();
        let loop_core = Arc::clone(core);
        core.current_workers.fetch_add(1, Ordering::AcqRel);
        core.idle_workers.fetch_add(1, Ordering::AcqRel);
        match worker.start(move |id| loop_core.worker_loop(id)) {
            Ok(()) => {
                debug!(worker = worker.id(), "spawned extra worker");
                workers.insert(worker.id(), worker);
            }
            Err(e) => {
                core.current_workers.fetch_sub(1, Ordering::AcqRel);
                core.idle_workers.fetch_sub(1, Ordering::AcqRel);
                error!(error = %e, "failed to spawn extra worker");
            }
        }
    }
}

impl PoolEngine for CachedEngine {
    fn mode(&self) -> PoolMode {
        PoolMode::Cached
    }

    fn state(&self) -> PoolState {
        self.core.state.load()
    }

    fn start(&self, init_workers: usize) -> Result<(), PoolError> {
        if init_workers == 0 {
            return Err(PoolError::InvalidWorkerCount);
        }
        let init = init_workers.min(self.core.max_workers.load(Ordering::Relaxed).max(1));
        if !self.core.state.transition(PoolState::Init, PoolState::Running) {
            return Err(PoolError::AlreadyStarted);
        }

        self.core.init_workers.store(init, Ordering::Relaxed);
        self.core.current_workers.store(init, Ordering::Release);
        self.core.idle_workers.store(init, Ordering::Release);

        let mut workers = self.core.workers.lock().unwrap();
        for spawned in 0..init {
            let worker = Worker::new();
            let core = Arc::clone(&self.core);
            if let Err(e) = worker.start(move |id| core.worker_loop(id)) {
                let missing = init - spawned;
                self.core.current_workers.fetch_sub(missing, Ordering::AcqRel);
                self.core.idle_workers.fetch_sub(missing, Ordering::AcqRel);
                return Err(e);
            }
            workers.insert(worker.id(), worker);
        }
        drop(workers);

        info!(workers = init, "cached pool started");
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<(), SubmitError> {
        if self.core.state.load() != PoolState::Running {
            return Err(SubmitError::NotRunning);
        }
        self.core.queue.push(job, SUBMIT_WAIT)?;
        CachedCore::maybe_spawn(&self.core);
        Ok(())
    }

    fn set_task_capacity(&self, capacity: usize) {
        if settable(&self.core.state, "task_capacity") {
            self.core.queue.set_capacity(capacity);
        }
    }

    fn set_max_workers(&self, max: usize) {
        if settable(&self.core.state, "max_workers") {
            self.core.max_workers.store(max, Ordering::Relaxed);
        }
    }

    fn set_idle_timeout(&self, timeout: Duration) {
        if timeout < Duration::from_secs(1) {
            warn!("idle_timeout below one second; value unchanged");
            return;
        }
        if settable(&self.core.state, "idle_timeout") {
            self.core
                .idle_timeout_ms
                .store(timeout.as_millis() as u64, Ordering::Relaxed);
        }
    }

    fn shutdown(&self) {
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
        debug!("cached pool shut down");
    }

    fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            mode: PoolMode::Cached,
            state: self.core.state.load(),
            current_workers: self.core.current_workers.load(Ordering::Acquire),
            idle_workers: self.core.idle_workers.load(Ordering::Acquire),
            pending_tasks: self.core.queue.len(),
            max_workers: self.core.max_workers.load(Ordering::Relaxed),
            task_capacity: self.core.queue.capacity(),
        }
    }
}
