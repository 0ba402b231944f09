#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use hive::{JoinError, PoolMode, PoolState, Refusal, ThreadPool};

    fn sum3(a: i32, b: i32, c: i32) -> i32 {
        a + b + c
    }

    fn describe(a: i64, s: &str) -> String {
        format!("a={a}{s}")
    }

    #[test]
    fn arbitrary_signatures_resolve_to_computed_values() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.start(2).unwrap();

        let res = pool.submit(|| sum3(1, 2, 3));
        let text = pool.submit(|| describe(2, " hello"));
        let closed_over = pool.submit(move || 123 + 456 - 666);

        assert_eq!(res.join().unwrap(), 6);
        assert_eq!(text.join().unwrap(), "a=2 hello");
        assert_eq!(closed_over.join().unwrap(), -87);
    }

    #[test]
    fn panicking_task_resolves_handle_and_spares_siblings() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.start(1).unwrap();

        let bad = pool.submit(|| -> u32 { panic!("task exploded") });
        let good = pool.submit(|| 5u32);

        match bad.join() {
            Err(JoinError::Panicked(msg)) => assert!(msg.contains("task exploded")),
            other => panic!("expected panic outcome, got {other:?}"),
        }
        // The worker that caught the panic must still serve the queue.
        assert_eq!(good.join().unwrap(), 5);
        assert_eq!(pool.metrics().current_workers, 1);
    }

    #[test]
    fn submit_before_start_is_refused() {
        let pool = ThreadPool::new(PoolMode::Fixed);

        let handle = pool.submit(|| 9u32);
        assert!(handle.is_finished());
        assert_eq!(handle.refusal(), Some(Refusal::NotRunning));
        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn submit_after_shutdown_is_refused() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.start(2).unwrap();
        pool.shutdown();
        assert_eq!(pool.state(), PoolState::Exiting);

        let handle = pool.submit(|| "never".to_string());
        assert_eq!(handle.refusal(), Some(Refusal::NotRunning));
        assert_eq!(handle.join().unwrap(), String::new());
    }

    #[test]
    fn shutdown_is_idempotent_and_drop_is_safe() {
        let pool = ThreadPool::new(PoolMode::Active);
        pool.start(2).unwrap();

        pool.shutdown();
        pool.shutdown();
        drop(pool);
    }

    #[test]
    fn tasks_still_queued_at_shutdown_resolve_to_default() {
        let pool = ThreadPool::new(PoolMode::Fixed);
        pool.start(1).unwrap();

        // Occupy the single worker, then queue more work behind it.
        let running = pool.submit(|| {
            thread::sleep(Duration::from_millis(400));
            1u32
        });
        thread::sleep(Duration::from_millis(100));
        let queued: Vec<_> = (0..3).map(|_| pool.submit(|| 1u32)).collect();

        drop(pool);

        // The in-flight task finished; the queued ones were never run.
        assert_eq!(running.join().unwrap(), 1);
        for handle in queued {
            assert_eq!(handle.refusal(), Some(Refusal::Shutdown));
            assert_eq!(handle.join().unwrap(), 0);
        }
    }
}
