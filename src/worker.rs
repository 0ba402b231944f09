//! Worker thread primitive.
//!
//! A [`Worker`] is a single OS thread bound to an engine-supplied loop
//! function and identified by a process-wide monotonic id. The thread is
//! detached at spawn: the pool never joins worker handles, it observes
//! termination through engine counters instead, which keeps the shutdown
//! protocol free of join-while-locked hazards.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::error::PoolError;

static NEXT_WORKER_ID: AtomicUsize = AtomicUsize::new(0);

pub(crate) struct Worker {
    id: usize,
}

impl Worker {
    pub fn new() -> Self {
        Self {
            id: NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Spawn the OS thread running `loop_fn(id)`.
    ///
    /// The join handle is discarded; liveness is tracked by the owning
    /// engine's counters.
    pub fn start<F>(&self, loop_fn: F) -> Result<(), PoolError>
    where
        F: FnOnce(usize) + Send + 'static,
    {
        let id = self.id;
        thread::Builder::new()
            .name(format!("hive-worker-{id}"))
            .spawn(move || loop_fn(id))?;
        Ok(())
    }
}
