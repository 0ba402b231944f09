//! Task wrapping and result handles.
//!
//! The engines only ever see an opaque zero-argument [`Job`]; this module
//! builds that job from a user closure and couples it to a one-shot
//! promise. The promise is fulfilled exactly once, from whichever of these
//! happens first:
//!
//! - the job runs to completion (value outcome),
//! - the job panics (the worker stays healthy; the panic payload is
//!   captured into the handle),
//! - the job is dropped without running, e.g. left in a queue at shutdown
//!   (default outcome),
//! - the pool refuses the submission outright (default outcome, with the
//!   refusal reason recorded on the handle).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{JoinError, Refusal};

/// Type-erased unit of work. The pool never inspects its payload.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

enum Outcome<R> {
    Value(R),
    Panicked(String),
    Refused(Refusal),
}

struct Shared<R> {
    slot: Mutex<Option<Outcome<R>>>,
    done: Condvar,
}

/// A future-like handle that eventually yields a submitted task's outcome.
///
/// Obtained from [`ThreadPool::submit`](crate::ThreadPool::submit).
pub struct TaskHandle<R> {
    shared: Arc<Shared<R>>,
}

impl<R> TaskHandle<R> {
    /// Whether the outcome is already available.
    pub fn is_finished(&self) -> bool {
        self.shared.slot.lock().unwrap().is_some()
    }

    /// The refusal reason, if the handle was fulfilled with the default
    /// outcome instead of running the task. `None` while pending or when
    /// the task actually ran.
    pub fn refusal(&self) -> Option<Refusal> {
        match &*self.shared.slot.lock().unwrap() {
            Some(Outcome::Refused(reason)) => Some(*reason),
            _ => None,
        }
    }

    /// Block until the task's outcome is available.
    ///
    /// A refused task (pool not running, queue full, or shutdown before
    /// execution) yields `Ok(R::default())`; a panicking task yields
    /// [`JoinError::Panicked`].
    pub fn join(self) -> Result<R, JoinError>
    where
        R: Default,
    {
        let mut slot = self.shared.slot.lock().unwrap();
        loop {
            if let Some(outcome) = slot.take() {
                return match outcome {
                    Outcome::Value(value) => Ok(value),
                    Outcome::Panicked(message) => Err(JoinError::Panicked(message)),
                    Outcome::Refused(_) => Ok(R::default()),
                };
            }
            slot = self.shared.done.wait(slot).unwrap();
        }
    }

    /// Fulfil the handle with a refusal. Overwrites the generic shutdown
    /// refusal a dropped job records, so the caller-visible reason matches
    /// the diagnostic that was emitted.
    pub(crate) fn refuse(&self, reason: Refusal) {
        let mut slot = self.shared.slot.lock().unwrap();
        match &*slot {
            None | Some(Outcome::Refused(_)) => {
                *slot = Some(Outcome::Refused(reason));
                self.shared.done.notify_all();
            }
            _ => {}
        }
    }
}

/// Write-once side of the handle. Fulfils with the shutdown refusal on
/// drop if nothing else fulfilled it first.
struct Promise<R> {
    shared: Arc<Shared<R>>,
    fulfilled: bool,
}

impl<R> Promise<R> {
    fn fulfil(&mut self, outcome: Outcome<R>) {
        let mut slot = self.shared.slot.lock().unwrap();
        if slot.is_none() {
            *slot = Some(outcome);
            self.shared.done.notify_all();
        }
        self.fulfilled = true;
    }
}

impl<R> Drop for Promise<R> {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.fulfil(Outcome::Refused(Refusal::Shutdown));
        }
    }
}

/// Wrap a user closure into an opaque job plus the handle observing it.
pub(crate) fn wrap<F, R>(f: F) -> (Job, TaskHandle<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        done: Condvar::new(),
    });
    let handle = TaskHandle {
        shared: Arc::clone(&shared),
    };
    let mut promise = Promise {
        shared,
        fulfilled: false,
    };

    let job = Box::new(move || {
        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => promise.fulfil(Outcome::Value(value)),
            Err(payload) => promise.fulfil(Outcome::Panicked(panic_message(payload))),
        }
    });

    (job, handle)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_outcome() {
        let (job, handle) = wrap(|| 1 + 2);
        assert!(!handle.is_finished());

        job();
        assert!(handle.is_finished());
        assert_eq!(handle.join().unwrap(), 3);
    }

    #[test]
    fn panic_outcome() {
        let (job, handle) = wrap(|| -> u32 { panic!("exploded") });

        job();
        match handle.join() {
            Err(JoinError::Panicked(msg)) => assert!(msg.contains("exploded")),
            other => panic!("expected panic outcome, got {other:?}"),
        }
    }

    #[test]
    fn dropped_job_yields_default() {
        let (job, handle) = wrap(|| 99u32);

        drop(job);
        assert_eq!(handle.refusal(), Some(Refusal::Shutdown));
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn refusal_reason_overwrites_shutdown() {
        let (job, handle) = wrap(|| 99u32);

        drop(job);
        handle.refuse(Refusal::QueueFull);
        assert_eq!(handle.refusal(), Some(Refusal::QueueFull));
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn join_blocks_until_fulfilled() {
        let (job, handle) = wrap(|| "done".to_string());

        let runner = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            job();
        });
        assert_eq!(handle.join().unwrap(), "done");
        runner.join().unwrap();
    }
}
