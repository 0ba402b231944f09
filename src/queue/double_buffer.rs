//! Per-worker double-buffered queue for the active engine.
//!
//! Each worker owns a pair of FIFOs: submitters append to the `public`
//! side, the worker drains the `private` side, and a swap exchanges the
//! roles once the private side runs dry. The two sides are guarded by
//! separate spinlocks, so a submitter contends only with an in-progress
//! swap on its target worker, never with the execution of previously
//! swapped items.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::sync::SpinMutex;
use crate::task::Job;

/// Outcome of [`DoubleBufferedQueue::try_swap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SwapOutcome {
    /// The private side still holds work; no swap.
    HasWork,
    /// Both sides are empty; no swap.
    Empty,
    /// Roles exchanged; the private side now holds the former public work.
    Swapped,
}

pub(crate) struct DoubleBufferedQueue {
    public: SpinMutex<VecDeque<Job>>,
    private: SpinMutex<VecDeque<Job>>,
    /// Conservative load signal read by the dispatcher without locking.
    public_len: AtomicUsize,
    private_len: AtomicUsize,
}

impl DoubleBufferedQueue {
    pub fn new() -> Self {
        Self {
            public: SpinMutex::new(VecDeque::new()),
            private: SpinMutex::new(VecDeque::new()),
            public_len: AtomicUsize::new(0),
            private_len: AtomicUsize::new(0),
        }
    }

    /// Producer side: append one job to the public queue.
    pub fn give(&self, job: Job) {
        let mut public = self.public.lock();
        public.push_back(job);
        self.public_len.fetch_add(1, Ordering::Release);
    }

    /// Lock-free load estimate of the public side.
    pub fn public_len(&self) -> usize {
        self.public_len.load(Ordering::Acquire)
    }

    /// Total unexecuted jobs handed to this worker.
    pub fn len(&self) -> usize {
        self.public_len.load(Ordering::Acquire) + self.private_len.load(Ordering::Acquire)
    }

    /// Owner side: exchange the queue roles if the private side is drained
    /// and the public side has work.
    ///
    /// Both locks are taken in public-then-private order; every code path
    /// that takes both must use the same order.
    pub fn try_swap(&self) -> SwapOutcome {
        if self.private_len.load(Ordering::Acquire) > 0 {
            return SwapOutcome::HasWork;
        }
        if self.public_len.load(Ordering::Acquire) == 0 {
            return SwapOutcome::Empty;
        }

        let mut public = self.public.lock();
        let mut private = self.private.lock();

        mem::swap(&mut *public, &mut *private);
        let moved = self
            .public_len
            .swap(self.private_len.load(Ordering::Acquire), Ordering::AcqRel);
        self.private_len.store(moved, Ordering::Release);

        SwapOutcome::Swapped
    }

    /// Owner side: execute every private job in FIFO order.
    ///
    /// Runs under the private spinlock, which is uncontended in steady
    /// state: producers never touch the private side, only a swap does.
    pub fn drain_private(&self) -> usize {
        let mut private = self.private.lock();
        let mut executed = 0;
        while let Some(job) = private.pop_front() {
            job();
            executed += 1;
        }
        self.private_len.store(0, Ordering::Release);
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn empty_queue_does_not_swap() {
        let queue = DoubleBufferedQueue::new();
        assert_eq!(queue.try_swap(), SwapOutcome::Empty);
        assert_eq!(queue.drain_private(), 0);
    }

    #[test]
    fn give_swap_drain() {
        let queue = DoubleBufferedQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            queue.give(counting_job(&counter));
        }
        assert_eq!(queue.public_len(), 3);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.try_swap(), SwapOutcome::Swapped);
        assert_eq!(queue.public_len(), 0);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.drain_private(), 3);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn undrained_private_side_blocks_swap() {
        let queue = DoubleBufferedQueue::new();
        let counter = Arc::new(AtomicUsize::new(0));

        queue.give(counting_job(&counter));
        assert_eq!(queue.try_swap(), SwapOutcome::Swapped);

        // New public work must not be swapped in over unexecuted items.
        queue.give(counting_job(&counter));
        assert_eq!(queue.try_swap(), SwapOutcome::HasWork);

        assert_eq!(queue.drain_private(), 1);
        assert_eq!(queue.try_swap(), SwapOutcome::Swapped);
        assert_eq!(queue.drain_private(), 1);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn drains_in_fifo_order() {
        let queue = DoubleBufferedQueue::new();
        let seen = Arc::new(SpinMutex::new(Vec::new()));

        for i in 0..5 {
            let seen = Arc::clone(&seen);
            queue.give(Box::new(move || seen.lock().push(i)));
        }
        queue.try_swap();
        queue.drain_private();

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(DoubleBufferedQueue::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut producers = vec![];

        for _ in 0..4 {
            let queue = Arc::clone(&queue);
            let counter = Arc::clone(&counter);
            producers.push(thread::spawn(move || {
                for _ in 0..250 {
                    let counter = Arc::clone(&counter);
                    queue.give(Box::new(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }));
                }
            }));
        }

        let mut executed = 0;
        while executed < 1000 {
            match queue.try_swap() {
                SwapOutcome::Empty => thread::yield_now(),
                _ => executed += queue.drain_private(),
            }
        }

        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 1000);
    }
}
