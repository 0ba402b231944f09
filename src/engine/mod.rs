//! # Pool Engines
//!
//! One engine per scheduling strategy, all behind the [`PoolEngine`]
//! contract the façade dispatches through. The engines share the lifecycle
//! state machine and counter discipline defined here:
//!
//! - state transitions are one-way, `Init -> Running -> Exiting`;
//! - configuration setters are accepted only in `Init`;
//! - cross-thread counters are lock-free atomics, read without the queue
//!   lock on the hot path and used as heuristics rather than gates.

pub(crate) mod active;
pub(crate) mod cached;
pub(crate) mod fixed;

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::config::PoolMode;
use crate::error::{PoolError, SubmitError};
use crate::task::Job;

/// Bounded wait of a submission blocked on a full queue.
pub(crate) const SUBMIT_WAIT: Duration = Duration::from_secs(1);

/// Poll interval of cached workers waiting for work, which amortizes the
/// idle-expiry check without a dedicated timer thread.
pub(crate) const IDLE_POLL: Duration = Duration::from_secs(1);

/// Back-off before the active engine's single dispatch retry.
pub(crate) const BUSY_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Lifecycle state of a pool engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    /// Constructed, accepting configuration, no workers yet.
    Init = 0,

    /// Workers spawned, submissions accepted.
    Running = 1,

    /// Shutting down; no new work, workers drain out.
    Exiting = 2,
}

impl From<u8> for PoolState {
    fn from(v: u8) -> Self {
        match v {
            0 => PoolState::Init,
            1 => PoolState::Running,
            _ => PoolState::Exiting,
        }
    }
}

/// Shared atomic cell holding a [`PoolState`].
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(PoolState::Init as u8))
    }

    pub fn load(&self) -> PoolState {
        self.0.load(Ordering::Acquire).into()
    }

    pub fn is_exiting(&self) -> bool {
        self.load() == PoolState::Exiting
    }

    /// One-way transition; fails if another transition got there first.
    pub fn transition(&self, from: PoolState, to: PoolState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Point-in-time snapshot of an engine's population and load.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Scheduling strategy of the engine.
    pub mode: PoolMode,

    /// Lifecycle state at the time of the snapshot.
    pub state: PoolState,

    /// Live worker threads.
    pub current_workers: usize,

    /// Workers currently waiting for work.
    pub idle_workers: usize,

    /// Submitted tasks not yet executed.
    pub pending_tasks: usize,

    /// Ceiling on the worker population.
    pub max_workers: usize,

    /// Capacity of the shared queue, or of each per-worker queue.
    pub task_capacity: usize,
}

/// Common contract of the three scheduling engines.
///
/// The façade owns exactly one trait object selected at construction and
/// forwards configuration, startup, submission and shutdown to it.
pub(crate) trait PoolEngine: Send + Sync {
    fn mode(&self) -> PoolMode;

    fn state(&self) -> PoolState;

    /// Transition `Init -> Running` and spawn the initial workers.
    fn start(&self, init_workers: usize) -> Result<(), PoolError>;

    /// Hand one job to the engine for eventual execution.
    fn submit(&self, job: Job) -> Result<(), SubmitError>;

    fn set_task_capacity(&self, capacity: usize);

    fn set_max_workers(&self, max: usize);

    fn set_idle_timeout(&self, timeout: Duration);

    /// Transition to `Exiting`, wake every waiter and block until all
    /// workers have exited. Idempotent; called at most usefully once.
    fn shutdown(&self);

    fn metrics(&self) -> PoolMetrics;
}

/// Permission check shared by every configuration setter.
pub(crate) fn settable(state: &StateCell, setting: &str) -> bool {
    if state.load() == PoolState::Init {
        true
    } else {
        warn!(setting, "cannot change configuration after start; value unchanged");
        false
    }
}
