// Worker bootstraps
//
// Each function returns a worker description; hosting it is the caller's job
// (LocalOrchestrator::start_worker in the binary and in tests).

use clap::ValueEnum;
use playground_core::{LocalOrchestrator, Worker};
use tracing::info;

use crate::context::AppContext;
use crate::error::WorkerError;
use crate::tasks::{
    ChatOtel, CpuHeavyWithProcessPool, ExternallyTriggeredTask, FirstWorkflow, SayHello,
    SyncSleepTask,
};

pub const DEFAULT_WORKER_NAME: &str = "test-worker";
pub const DEFAULT_WORKER_SLOTS: usize = 100;

pub const SYNC_WORKER_NAME: &str = "cpu-bound-sync-sleep-worker";
pub const SYNC_WORKER_SLOTS: usize = 3;

/// General-purpose worker hosting the lightweight tasks and the chat task
///
/// Fails when no OpenAI client is configured.
pub fn default_worker(ctx: &AppContext) -> Result<Worker, WorkerError> {
    let chat = ChatOtel::new(ctx.openai()?, ctx.observability());

    let worker = Worker::builder(DEFAULT_WORKER_NAME)
        .slots(DEFAULT_WORKER_SLOTS)
        .task(FirstWorkflow)
        .task(SayHello)
        .task(ExternallyTriggeredTask)
        .task(chat)
        .build();

    info!(worker = worker.name(), tasks = ?worker.task_names(), "Built worker");
    Ok(worker)
}

/// Worker for the blocking and CPU-bound demo tasks
pub fn sync_worker(ctx: &AppContext) -> Worker {
    let worker = Worker::builder(SYNC_WORKER_NAME)
        .slots(SYNC_WORKER_SLOTS)
        .task(SyncSleepTask::default())
        .task(CpuHeavyWithProcessPool::new(ctx.cpu_pool()))
        .build();

    info!(worker = worker.name(), tasks = ?worker.task_names(), "Built worker");
    worker
}

/// Which bootstraps a process hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum WorkerSelection {
    /// test-worker
    Default,
    /// cpu-bound-sync-sleep-worker
    Sync,
    /// Both workers
    #[default]
    All,
}

impl WorkerSelection {
    pub fn build(self, ctx: &AppContext) -> Result<Vec<Worker>, WorkerError> {
        Ok(match self {
            WorkerSelection::Default => vec![default_worker(ctx)?],
            WorkerSelection::Sync => vec![sync_worker(ctx)],
            WorkerSelection::All => vec![default_worker(ctx)?, sync_worker(ctx)],
        })
    }
}

/// Build the selected workers and host them on `orchestrator`
pub async fn start_workers(
    ctx: &AppContext,
    orchestrator: &LocalOrchestrator,
    selection: WorkerSelection,
) -> Result<Vec<Worker>, WorkerError> {
    let workers = selection.build(ctx)?;
    for worker in &workers {
        orchestrator.start_worker(worker).await?;
    }
    Ok(workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playground_observability::NoopBackend;
    use playground_openai::OpenAiClient;
    use std::sync::Arc;

    #[test]
    fn test_default_worker_requires_openai() {
        assert!(matches!(
            default_worker(&AppContext::detached()),
            Err(WorkerError::MissingOpenAiKey)
        ));
    }

    #[test]
    fn test_default_worker_tasks() {
        let ctx = AppContext::new(Arc::new(NoopBackend), Some(OpenAiClient::new("sk-test")));
        let worker = default_worker(&ctx).unwrap();

        assert_eq!(worker.name(), "test-worker");
        assert_eq!(worker.slots(), 100);
        assert_eq!(
            worker.task_names(),
            vec!["first-workflow", "say_hello", "externally-triggered-task", "chat-otel"]
        );
    }

    #[tokio::test]
    async fn test_start_sync_selection() {
        let ctx = AppContext::detached();
        let orchestrator = LocalOrchestrator::new();

        let workers = start_workers(&ctx, &orchestrator, WorkerSelection::Sync)
            .await
            .unwrap();

        assert_eq!(workers.len(), 1);
        assert_eq!(
            orchestrator.task_names().await,
            vec!["cpu-heavy-with-process-pool", "sync-sleep-task"]
        );
    }

    #[tokio::test]
    async fn test_all_selection_needs_openai() {
        let result = start_workers(
            &AppContext::detached(),
            &LocalOrchestrator::new(),
            WorkerSelection::All,
        )
        .await;
        assert!(matches!(result, Err(WorkerError::MissingOpenAiKey)));
    }

    #[test]
    fn test_sync_worker_tasks() {
        let ctx = AppContext::detached().with_cpu_pool_size(2);
        let worker = sync_worker(&ctx);

        assert_eq!(worker.name(), "cpu-bound-sync-sleep-worker");
        assert_eq!(worker.slots(), 3);
        assert_eq!(
            worker.task_names(),
            vec!["sync-sleep-task", "cpu-heavy-with-process-pool"]
        );
    }
}
