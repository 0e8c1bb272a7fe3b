// Blocking and CPU-bound tasks
//
// Both exercise a worker whose runs occupy real threads: the sleep task holds
// a blocking thread for its whole run, the hash task saturates a CPU pool
// slot. They run on the low-slot sync worker.

use async_trait::async_trait;
use playground_core::{EmptyModel, Task, TaskContext, TaskError, TaskOptions};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::pool::CpuPool;

/// Output of the blocking tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub task: String,
    pub iterations: u64,
    /// Wall time in seconds
    pub execution_time: f64,
}

pub struct SyncSleepTask {
    pub iterations: u32,
    pub interval: Duration,
}

impl Default for SyncSleepTask {
    fn default() -> Self {
        Self {
            iterations: 10,
            interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl Task for SyncSleepTask {
    type Input = EmptyModel;
    type Output = BenchmarkReport;

    fn name(&self) -> &str {
        "sync-sleep-task"
    }

    fn options(&self) -> TaskOptions {
        TaskOptions::default()
            .with_execution_timeout(Duration::from_secs(20))
            .with_retries(1)
    }

    async fn run(&self, _input: EmptyModel, ctx: &TaskContext) -> Result<BenchmarkReport, TaskError> {
        let iterations = self.iterations;
        let interval = self.interval;
        let started = Instant::now();

        let job_ctx = ctx.clone();
        let completed = ctx
            .spawn_blocking(move || {
                let mut completed = 0;
                for i in 1..=iterations {
                    if job_ctx.is_cancelled() {
                        break;
                    }
                    std::thread::sleep(interval);
                    job_ctx.log(format!("sleeping {}/{}", i, iterations));
                    completed = i;
                }
                completed
            })
            .await
            .map_err(|e| TaskError::failed(format!("sleep thread failed: {}", e)))?;

        Ok(BenchmarkReport {
            task: self.name().to_string(),
            iterations: u64::from(completed),
            execution_time: started.elapsed().as_secs_f64(),
        })
    }
}

pub struct CpuHeavyWithProcessPool {
    pool: CpuPool,
    pub iterations: u64,
}

impl CpuHeavyWithProcessPool {
    pub const DEFAULT_ITERATIONS: u64 = 8_000_000;

    pub fn new(pool: CpuPool) -> Self {
        Self {
            pool,
            iterations: Self::DEFAULT_ITERATIONS,
        }
    }

    pub fn with_iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }
}

/// SHA-256 of `data0`, `data1`, ... `data{n-1}`; returns the last digest
pub fn hash_rounds(iterations: u64) -> Option<String> {
    let mut last = None;
    for i in 0..iterations {
        let digest = Sha256::digest(format!("data{}", i).as_bytes());
        last = Some(digest);
    }
    last.map(hex::encode)
}

#[async_trait]
impl Task for CpuHeavyWithProcessPool {
    type Input = EmptyModel;
    type Output = BenchmarkReport;

    fn name(&self) -> &str {
        "cpu-heavy-with-process-pool"
    }

    fn options(&self) -> TaskOptions {
        TaskOptions::default()
            .with_execution_timeout(Duration::from_secs(120))
            .with_retries(1)
    }

    async fn run(&self, _input: EmptyModel, ctx: &TaskContext) -> Result<BenchmarkReport, TaskError> {
        let iterations = self.iterations;
        let started = Instant::now();

        ctx.log(format!(
            "hashing {} rounds on a pool of {}",
            iterations,
            self.pool.size()
        ));
        let last_digest = self.pool.run(move || hash_rounds(iterations)).await?;
        ctx.log(format!("last digest {}", last_digest.unwrap_or_default()));

        Ok(BenchmarkReport {
            task: self.name().to_string(),
            iterations,
            execution_time: started.elapsed().as_secs_f64(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_ctx(task: &str) -> (TaskContext, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let ctx = TaskContext::new("run-1", task, 1)
            .with_log_sink(Arc::new(move |line| sink.lock().unwrap().push(line)));
        (ctx, lines)
    }

    #[test]
    fn test_hash_rounds() {
        assert_eq!(hash_rounds(0), None);
        // sha256("data0")
        assert_eq!(
            hash_rounds(1).unwrap(),
            hex::encode(Sha256::digest(b"data0"))
        );
    }

    #[tokio::test]
    async fn test_sync_sleep_logs_each_iteration() {
        let task = SyncSleepTask {
            iterations: 3,
            interval: Duration::from_millis(1),
        };
        let (ctx, lines) = recording_ctx("sync-sleep-task");

        let report = task.run(EmptyModel {}, &ctx).await.unwrap();

        assert_eq!(report.task, "sync-sleep-task");
        assert_eq!(report.iterations, 3);
        assert_eq!(
            lines.lock().unwrap().as_slice(),
            ["sleeping 1/3", "sleeping 2/3", "sleeping 3/3"]
        );
    }

    #[tokio::test]
    async fn test_sync_sleep_stops_when_cancelled() {
        let task = SyncSleepTask {
            iterations: 100,
            interval: Duration::from_millis(1),
        };
        let (ctx, lines) = recording_ctx("sync-sleep-task");
        ctx.cancel();

        let report = task.run(EmptyModel {}, &ctx).await.unwrap();

        assert_eq!(report.iterations, 0);
        assert!(lines.lock().unwrap().is_empty());
    }

    #[test]
    fn test_declared_options() {
        let sleep = SyncSleepTask::default().options();
        assert_eq!(sleep.execution_timeout, Some(Duration::from_secs(20)));
        assert_eq!(sleep.retries, 1);

        let cpu = CpuHeavyWithProcessPool::new(CpuPool::new(1)).options();
        assert_eq!(cpu.execution_timeout, Some(Duration::from_secs(120)));
        assert_eq!(cpu.retries, 1);
    }

    #[tokio::test]
    async fn test_cpu_heavy_runs_on_pool() {
        let task = CpuHeavyWithProcessPool::new(CpuPool::new(1)).with_iterations(1_000);
        let (ctx, lines) = recording_ctx("cpu-heavy-with-process-pool");

        let report = task.run(EmptyModel {}, &ctx).await.unwrap();

        assert_eq!(report.iterations, 1_000);
        let lines = lines.lock().unwrap();
        assert_eq!(
            lines.last().unwrap(),
            &format!("last digest {}", hash_rounds(1_000).unwrap())
        );
    }

    #[tokio::test]
    async fn test_cpu_heavy_fails_on_closed_pool() {
        let pool = CpuPool::new(1);
        pool.close();
        let task = CpuHeavyWithProcessPool::new(pool).with_iterations(10);

        let err = task
            .run(EmptyModel {}, &TaskContext::new("run-1", "cpu", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Failed(_)));
    }
}
