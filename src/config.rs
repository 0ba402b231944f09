use std::time::Duration;

/// Default number of workers spawned by `start_default`.
pub const DEFAULT_INIT_WORKERS: usize = 4;

/// Default ceiling on the worker population (cached mode).
pub const DEFAULT_MAX_WORKERS: usize = 20;

/// Default capacity of the shared task queue, or of each per-worker
/// queue in active mode.
pub const DEFAULT_TASK_CAPACITY: usize = 1024;

/// Default idle time after which a surplus cached worker exits.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Determines how submitted tasks are dispatched onto worker threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    /// A constant worker population shares one bounded task queue.
    Fixed,

    /// Like `Fixed`, but the population grows up to `max_workers` under
    /// load and surplus workers exit after `idle_timeout` of inactivity.
    Cached,

    /// A constant population where each worker owns a double-buffered
    /// queue; submitters dispatch to the least-loaded worker.
    Active,
}

/// Configuration for a [`ThreadPool`](crate::ThreadPool).
///
/// Engines that do not use a field ignore it (and the corresponding
/// setter warns).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of workers spawned by `start_default`.
    pub init_workers: usize,

    /// Ceiling on the worker population (cached mode only).
    pub max_workers: usize,

    /// Capacity of the shared task queue (fixed/cached) or of each
    /// per-worker queue (active).
    pub task_capacity: usize,

    /// Idle time after which a surplus cached worker exits.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            init_workers: DEFAULT_INIT_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            task_capacity: DEFAULT_TASK_CAPACITY,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Configuration sized to the machine: one initial worker per logical
    /// CPU, other fields at their defaults.
    pub fn for_hardware() -> Self {
        Self {
            init_workers: num_cpus::get().max(1),
            ..Self::default()
        }
    }
}
