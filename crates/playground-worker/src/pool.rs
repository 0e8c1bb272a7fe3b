// Bounded CPU pool
//
// CPU-heavy jobs run on Tokio's blocking threads, at most `size` at a time.
// Closing the pool rejects queued and future jobs; running jobs finish.

use std::sync::Arc;
use tokio::sync::Semaphore;

use playground_core::TaskError;

/// Upper bound on CPU pool workers
pub const MAX_CPU_WORKERS: usize = 4;

/// Pool size for this machine: max(1, min(4, available parallelism))
pub fn default_pool_size() -> usize {
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    available.clamp(1, MAX_CPU_WORKERS)
}

#[derive(Debug, Clone)]
pub struct CpuPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl CpuPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        tracing::info!(size, "Created CPU pool");
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Run `job` on a blocking thread once a pool slot is free
    pub async fn run<F, R>(&self, job: F) -> Result<R, TaskError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TaskError::failed("CPU pool is closed"))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| TaskError::failed(format!("CPU pool job panicked: {}", e)))
    }

    pub fn close(&self) {
        if !self.permits.is_closed() {
            tracing::info!(size = self.size, "Closing CPU pool");
            self.permits.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_default_pool_size_bounds() {
        let size = default_pool_size();
        assert!((1..=MAX_CPU_WORKERS).contains(&size));
    }

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let pool = CpuPool::new(2);
        assert_eq!(pool.run(|| 6 * 7).await.unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_bounds_parallel_jobs() {
        let pool = CpuPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs: Vec<_> = (0..6)
            .map(|_| {
                let pool = pool.clone();
                let running = running.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    pool.run(move || {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::sleep(Duration::from_millis(20));
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();

        for job in jobs {
            job.await.unwrap().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_jobs() {
        let pool = CpuPool::new(1);
        pool.close();
        assert!(pool.is_closed());
        assert!(pool.run(|| ()).await.is_err());
    }
}
