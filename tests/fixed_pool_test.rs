#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use hive::{PoolConfig, PoolMode, PoolState, Refusal, ThreadPool};

    #[test]
    fn population_is_constant_until_shutdown() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.start(3).unwrap();

        let metrics = pool.metrics();
        assert_eq!(metrics.state, PoolState::Running);
        assert_eq!(metrics.current_workers, 3);
        assert!(metrics.idle_workers <= metrics.current_workers);

        // A burst of work must not change the population.
        for _ in 0..50 {
            pool.submit(|| thread::sleep(Duration::from_millis(10)));
        }
        assert_eq!(pool.metrics().current_workers, 3);

        pool.shutdown();
        assert_eq!(pool.metrics().current_workers, 0);
        assert_eq!(pool.state(), PoolState::Exiting);
    }

    #[test]
    fn every_submitted_task_executes() {
        let pool = ThreadPool::with_config(PoolMode::Fixed, PoolConfig::for_hardware());
        pool.start_default().unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(100_000);
        for _ in 0..100_000 {
            let counter = Arc::clone(&counter);
            handles.push(pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 100_000);

        pool.shutdown();
        assert_eq!(pool.metrics().current_workers, 0);
    }

    #[test]
    fn backpressure_refuses_when_queue_stays_full() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.set_task_capacity(2);
        pool.start(1).unwrap();

        let executed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..5 {
            let executed = Arc::clone(&executed);
            handles.push(pool.submit(move || {
                thread::sleep(Duration::from_millis(1500));
                executed.fetch_add(1, Ordering::Relaxed);
            }));
        }

        let refused = handles
            .iter()
            .filter(|h| h.refusal() == Some(Refusal::QueueFull))
            .count();
        // With one slow worker and two queue slots, the bounded wait must
        // have refused at least one of the five submissions.
        assert!(refused >= 1);

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(executed.load(Ordering::Relaxed), 5 - refused);
    }

    #[test]
    fn submitting_at_capacity_blocks_until_slot_opens() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.set_task_capacity(1);
        pool.start(1).unwrap();

        // Occupy the worker briefly and fill the single slot.
        pool.submit(|| thread::sleep(Duration::from_millis(300)));
        pool.submit(|| {});

        // The worker frees the slot well inside the one-second bounded
        // wait, so this submission must succeed rather than be refused.
        let handle = pool.submit(|| 7u32);
        assert_eq!(handle.refusal(), None);
        assert_eq!(handle.join().unwrap(), 7);
    }
}
