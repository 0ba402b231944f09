#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use hive::{PoolMode, ThreadPool};

    #[test]
    fn grows_under_load_and_shrinks_when_idle() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.set_max_workers(6);
        pool.set_idle_timeout(Duration::from_secs(1));
        pool.start(2).unwrap();

        let mut handles = Vec::new();
        for _ in 0..12 {
            handles.push(pool.submit(|| thread::sleep(Duration::from_millis(400))));
        }

        // The backlog exceeds the idle population, so extra workers must
        // appear, bounded by the ceiling.
        thread::sleep(Duration::from_millis(200));
        let grown = pool.metrics().current_workers;
        assert!(grown > 2, "expected growth beyond init, got {grown}");
        assert!(grown <= 6, "expected at most max_workers, got {grown}");

        for handle in handles {
            handle.join().unwrap();
        }

        // After the idle timeout plus a couple of poll intervals, the
        // surplus workers must have expired, but never below init.
        thread::sleep(Duration::from_secs(4));
        assert_eq!(pool.metrics().current_workers, 2);
    }

    #[test]
    fn never_exceeds_max_workers_under_storm() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.set_max_workers(3);
        pool.start(1).unwrap();

        let deadline = Instant::now() + Duration::from_millis(800);
        let mut submitted = 0;
        while Instant::now() < deadline {
            pool.submit(|| thread::sleep(Duration::from_millis(20)));
            submitted += 1;

            let current = pool.metrics().current_workers;
            assert!(current <= 3, "population {current} exceeded max_workers");
        }
        assert!(submitted > 0);
    }

    #[test]
    fn no_spawn_while_idle_workers_cover_the_backlog() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.start(2).unwrap();

        pool.submit(|| {}).join().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(pool.metrics().current_workers, 2);
    }

    #[test]
    fn init_workers_clamped_to_max() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.set_max_workers(2);
        pool.start(5).unwrap();
        assert_eq!(pool.metrics().current_workers, 2);
    }

    #[test]
    fn shutdown_retires_every_worker() {
        let pool = ThreadPool::new(PoolMode::Cached);
        pool.set_max_workers(8);
        pool.start(2).unwrap();

        for _ in 0..20 {
            pool.submit(|| thread::sleep(Duration::from_millis(50)));
        }

        pool.shutdown();
        assert_eq!(pool.metrics().current_workers, 0);
    }
}
