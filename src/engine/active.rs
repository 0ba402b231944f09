//! # Active Engine
//!
//! A constant worker population with no shared task queue: each worker
//! owns a double-buffered queue, and the submit path dispatches to the
//! worker whose public side reports the lowest load. The engine-level
//! mutex and condition variable exist solely to park workers whose queues
//! ran dry.
//!
//! The per-worker slot vector is built once at `start` and never mutated
//! afterwards, so the dispatch scan reads the load counters without taking
//! any lock. Worker liveness is tracked by the `current_workers` counter
//! alone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{PoolConfig, PoolMode};
use crate::error::{PoolError, SubmitError};
use crate::queue::double_buffer::{DoubleBufferedQueue, SwapOutcome};
use crate::task::Job;
use crate::worker::Worker;

use super::{settable, PoolEngine, PoolMetrics, PoolState, StateCell, BUSY_RETRY_WAIT};

pub(crate) struct ActiveEngine {
    core: Arc<ActiveCore>,
}

/// One worker's share of the engine: its id and its queue pair.
struct ActiveSlot {
    worker_id: usize,
    queue: DoubleBufferedQueue,
}

struct ActiveCore {
    state: StateCell,
    /// Built once at start; index order doubles as the dispatch tie-break.
    slots: OnceLock<Vec<Arc<ActiveSlot>>>,

    /// Parking lot for workers that found both their queues empty. The
    /// same mutex backs `all_exited` during shutdown.
    park: Mutex<()>,
    not_empty: Condvar,
    all_exited: Condvar,

    current_workers: AtomicUsize,
    parked_workers: AtomicUsize,
    /// Per-worker queue cap enforced by the dispatch scan.
    task_capacity: AtomicUsize,
    max_workers: AtomicUsize,
}

impl ActiveEngine {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            core: Arc::new(ActiveCore {
                state: StateCell::new(),
                slots: OnceLock::new(),
                park: Mutex::new(()),
                not_empty: Condvar::new(),
                all_exited: Condvar::new(),
                current_workers: AtomicUsize::new(0),
                parked_workers: AtomicUsize::new(0),
                task_capacity: AtomicUsize::new(config.task_capacity),
                max_workers: AtomicUsize::new(config.max_workers),
            }),
        }
    }
}

impl ActiveCore {
    fn worker_loop(self: Arc<Self>, slot: Arc<ActiveSlot>) {
        loop {
            if self.state.is_exiting() {
                break;
            }
            match slot.queue.try_swap() {
                SwapOutcome::Empty => {
                    self.parked_workers.fetch_add(1, Ordering::AcqRel);
                    let guard = self.park.lock().unwrap();
                    let _guard = self
                        .not_empty
                        .wait_while(guard, |_| {
                            slot.queue.public_len() == 0 && !self.state.is_exiting()
                        })
                        .unwrap();
                    self.parked_workers.fetch_sub(1, Ordering::AcqRel);
                }
                SwapOutcome::HasWork | SwapOutcome::Swapped => {
                    slot.queue.drain_private();
                }
            }
        }

        self.current_workers.fetch_sub(1, Ordering::AcqRel);
        let _guard = self.park.lock().unwrap();
        self.all_exited.notify_all();
        debug!(worker = slot.worker_id, "worker exited");
    }

    /// Dispatch one job to the least-loaded worker, ties broken by the
    /// lowest id. Fails with the job back when every public queue is at
    /// the per-worker cap.
    fn try_give(&self, job: Job) -> Result<(), Job> {
        let Some(slots) = self.slots.get() else {
            return Err(job);
        };

        let mut best = &slots[0];
        let mut min = usize::MAX;
        for slot in slots {
            let load = slot.queue.public_len();
            if load < min {
                min = load;
                best = slot;
            }
        }

        if min >= self.task_capacity.load(Ordering::Relaxed) {
            return Err(job);
        }
        best.queue.give(job);
        Ok(())
    }

    /// Wake every parked worker. The park mutex is taken across the
    /// broadcast so a worker between its load check and its wait cannot
    /// miss the signal.
    fn wake_all(&self) {
        let _guard = self.park.lock().unwrap();
        self.not_empty.notify_all();
    }
}

impl PoolEngine for ActiveEngine {
    fn mode(&self) -> PoolMode {
        PoolMode::Active
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

        let mut pending = Vec::with_capacity(init_workers);
        let mut slots = Vec::with_capacity(init_workers);
        for _ in 0..init_workers {
            let worker = Worker::new();
            let slot = Arc::new(ActiveSlot {
                worker_id: worker.id(),
                queue: DoubleBufferedQueue::new(),
            });
            slots.push(Arc::clone(&slot));
            pending.push((worker, slot));
        }
        // The slot vector must be visible to the dispatch scan before any
        // worker runs.
        let _ = self.core.slots.set(slots);

        self.core.current_workers.store(init_workers, Ordering::Release);
        for (spawned, (worker, slot)) in pending.into_iter().enumerate() {
            let core = Arc::clone(&self.core);
            if let Err(e) = worker.start(move |_| core.worker_loop(slot)) {
                let missing = init_workers - spawned;
                self.core.current_workers.fetch_sub(missing, Ordering::AcqRel);
                return Err(e);
            }
        }

        info!(workers = init_workers, "active pool started");
        Ok(())
    }

    fn submit(&self, job: Job) -> Result<(), SubmitError> {
        if self.core.state.load() != PoolState::Running {
            return Err(SubmitError::NotRunning);
        }

        let job = match self.core.try_give(job) {
            Ok(()) => {
                self.core.wake_all();
                return Ok(());
            }
            Err(job) => job,
        };

        // Every public queue is at capacity: back off once, then refuse.
        warn!("all worker queues at capacity; backing off");
        thread::sleep(BUSY_RETRY_WAIT);

        match self.core.try_give(job) {
            Ok(()) => {
                self.core.wake_all();
                Ok(())
            }
            Err(_) => Err(SubmitError::QueueFull),
        }
    }

    fn set_task_capacity(&self, capacity: usize) {
        if settable(&self.core.state, "task_capacity") {
            self.core.task_capacity.store(capacity, Ordering::Relaxed);
        }
    }

    fn set_max_workers(&self, max: usize) {
        if settable(&self.core.state, "max_workers") {
            self.core.max_workers.store(max, Ordering::Relaxed);
        }
    }

    fn set_idle_timeout(&self, _timeout: Duration) {
        warn!("idle_timeout is not supported by the active engine; value unchanged");
    }

    fn shutdown(&self) {
        if self.core.state.transition(PoolState::Init, PoolState::Exiting) {
            return;
        }
        if !self.core.state.transition(PoolState::Running, PoolState::Exiting) {
            return;
        }

        let mut guard = self.core.park.lock().unwrap();
        self.core.not_empty.notify_all();
        while self.core.current_workers.load(Ordering::Acquire) > 0 {
            guard = self.core.all_exited.wait(guard).unwrap();
        }
        drop(guard);
        debug!("active pool shut down");
    }

    fn metrics(&self) -> PoolMetrics {
        let pending = self
            .core
            .slots
            .get()
            .map(|slots| slots.iter().map(|s| s.queue.len()).sum())
            .unwrap_or(0);
        PoolMetrics {
            mode: PoolMode::Active,
            state: self.core.state.load(),
            current_workers: self.core.current_workers.load(Ordering::Acquire),
            idle_workers: self.core.parked_workers.load(Ordering::Acquire),
            pending_tasks: pending,
            max_workers: self.core.max_workers.load(Ordering::Relaxed),
            task_capacity: self.core.task_capacity.load(Ordering::Relaxed),
        }
    }
}
