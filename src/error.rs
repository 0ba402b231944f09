use thiserror::Error;

/// Errors surfaced to submitters.
///
/// Neither error aborts the pool: the submitter receives a result handle
/// that is already fulfilled with the default outcome, and a diagnostic is
/// emitted on the tracing channel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("pool is not running")]
    NotRunning,
    #[error("task queue is full")]
    QueueFull,
}

/// Errors related to pool lifecycle operations.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("pool has already been started")]
    AlreadyStarted,
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Error returned by [`TaskHandle::join`](crate::TaskHandle::join) when the
/// task terminated abnormally.
#[derive(Error, Debug)]
pub enum JoinError {
    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Why a result handle was fulfilled with the default outcome instead of a
/// computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The submission was attempted outside the `Running` state.
    NotRunning,
    /// Backpressure exceeded its bounded wait.
    QueueFull,
    /// The task was still queued when the pool shut down.
    Shutdown,
}
