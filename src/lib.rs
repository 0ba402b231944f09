// Hive - an in-process worker pool
//
// This crate provides a thread pool with three interchangeable scheduling
// engines selected at construction time: a fixed-size pool over one shared
// bounded queue, an elastic pool that grows under load and shrinks when
// idle, and an actively-dispatching pool with one double-buffered queue per
// worker.

pub mod config;
pub mod error;
pub mod logging;
pub mod pool;

mod engine;
mod queue;
mod sync;
mod task;
mod worker;

// Re-export the user-facing surface at the crate root.
pub use config::{PoolConfig, PoolMode};
pub use engine::{PoolMetrics, PoolState};
pub use error::{JoinError, PoolError, Refusal, SubmitError};
pub use pool::ThreadPool;
pub use task::TaskHandle;
