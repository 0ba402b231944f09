//! User-facing pool façade.
//!
//! [`ThreadPool`] owns exactly one scheduling engine selected at
//! construction and forwards configuration, startup, submission and
//! shutdown to it. The generic [`submit`](ThreadPool::submit) wraps the
//! caller's closure into an opaque job, attaches a result handle, and maps
//! engine refusals onto an immediately-fulfilled default outcome plus a
//! diagnostic.

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::config::{PoolConfig, PoolMode};
use crate::engine::active::ActiveEngine;
use crate::engine::cached::CachedEngine;
use crate::engine::fixed::FixedEngine;
use crate::engine::{PoolEngine, PoolMetrics, PoolState};
use crate::error::{PoolError, Refusal, SubmitError};
use crate::task::{self, TaskHandle};

pub struct ThreadPool {
    engine: Box<dyn PoolEngine>,
    default_init_workers: usize,
}

impl ThreadPool {
    /// A pool with the given scheduling mode and default configuration.
    pub fn new(mode: PoolMode) -> Self {
        Self::with_config(mode, PoolConfig::default())
    }

    /// A pool with the given scheduling mode and configuration. Further
    /// adjustment via the setters is possible until [`start`](Self::start).
    pub fn with_config(mode: PoolMode, config: PoolConfig) -> Self {
        let engine: Box<dyn PoolEngine> = match mode {
            PoolMode::Fixed => Box::new(FixedEngine::new(&config)),
            PoolMode::Cached => Box::new(CachedEngine::new(&config)),
            PoolMode::Active => Box::new(ActiveEngine::new(&config)),
        };
        Self {
            engine,
            default_init_workers: config.init_workers,
        }
    }

    pub fn mode(&self) -> PoolMode {
        self.engine.mode()
    }

    pub fn state(&self) -> PoolState {
        self.engine.state()
    }

    /// Snapshot of the engine's population and load counters.
    pub fn metrics(&self) -> PoolMetrics {
        self.engine.metrics()
    }

    /// Capacity of the shared task queue (fixed/cached) or of each
    /// per-worker queue (active). Accepted only before `start`.
    pub fn set_task_capacity(&self, capacity: usize) {
        if capacity == 0 {
            warn!("task_capacity must be at least 1; value unchanged");
            return;
        }
        self.engine.set_task_capacity(capacity);
    }

    /// Ceiling on the worker population. Cached and active modes only;
    /// accepted only before `start`.
    pub fn set_max_workers(&self, max: usize) {
        if max == 0 {
            warn!("max_workers must be at least 1; value unchanged");
            return;
        }
        self.engine.set_max_workers(max);
    }

    /// Idle time after which a surplus worker exits. Cached mode only;
    /// accepted only before `start`.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.engine.set_idle_timeout(timeout);
    }

    /// Spawn `init_workers` workers and begin accepting submissions.
    pub fn start(&self, init_workers: usize) -> Result<(), PoolError> {
        self.engine.start(init_workers)
    }

    /// [`start`](Self::start) with the configured `init_workers`.
    pub fn start_default(&self) -> Result<(), PoolError> {
        self.engine.start(self.default_init_workers)
    }

    /// Submit a closure for execution, returning a handle that eventually
    /// yields its result.
    ///
    /// A refused submission (pool not running, or backpressure exceeded
    /// its bounded wait) returns a handle already fulfilled with
    /// `R::default()`; the refusal reason is recorded on the handle and a
    /// diagnostic is emitted. A panicking task fulfils its handle with the
    /// panic message and leaves the worker healthy.
    pub fn submit<F, R>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + Default + 'static,
    {
        let (job, handle) = task::wrap(f);
        if let Err(e) = self.engine.submit(job) {
            warn!(error = %e, "task submission refused");
            handle.refuse(match e {
                SubmitError::NotRunning => Refusal::NotRunning,
                SubmitError::QueueFull => Refusal::QueueFull,
            });
        }
        handle
    }

    /// Stop accepting work and block until every worker has exited.
    ///
    /// Workers finish the task they are currently executing; tasks still
    /// queued resolve their handles with the default outcome once the pool
    /// is dropped. Idempotent.
    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(PoolMode::Fixed)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metrics = self.metrics();
        f.debug_struct("ThreadPool")
            .field("mode", &metrics.mode)
            .field("state", &metrics.state)
            .field("current_workers", &metrics.current_workers)
            .field("pending_tasks", &metrics.pending_tasks)
            .finish()
    }
}
