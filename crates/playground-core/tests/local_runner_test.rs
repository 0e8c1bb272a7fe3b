// Integration tests for TaskRunner driving the LocalOrchestrator
//
// These tests verify the full trigger -> observe -> fetch path against
// tasks hosted in-process, in both poll and stream modes.

use async_trait::async_trait;
use playground_core::{
    LocalOrchestrator, OrchestrationClient, Payload, RunOptions, RunStatus, RunnerError,
    SchemaRegistry, Task, TaskContext, TaskError, TaskOptions, TaskRunner, TaskSchema, Validator,
    Worker,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test tasks
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct GreetInput {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GreetOutput {
    message: String,
}

struct Greet;

#[async_trait]
impl Task for Greet {
    type Input = GreetInput;
    type Output = GreetOutput;

    fn name(&self) -> &str {
        "greet"
    }

    async fn run(&self, input: GreetInput, ctx: &TaskContext) -> Result<GreetOutput, TaskError> {
        ctx.log("greeting");
        Ok(GreetOutput {
            message: format!("Hello, {}!", input.name),
        })
    }
}

struct AlwaysFails;

#[async_trait]
impl Task for AlwaysFails {
    type Input = playground_core::EmptyModel;
    type Output = playground_core::EmptyModel;

    fn name(&self) -> &str {
        "always-fails"
    }

    async fn run(
        &self,
        _input: playground_core::EmptyModel,
        _ctx: &TaskContext,
    ) -> Result<playground_core::EmptyModel, TaskError> {
        Err(TaskError::failed("nope"))
    }
}

/// Sleeps, tracking how many runs overlap
struct Gate {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Task for Gate {
    type Input = playground_core::EmptyModel;
    type Output = playground_core::EmptyModel;

    fn name(&self) -> &str {
        "gate"
    }

    fn options(&self) -> TaskOptions {
        TaskOptions::default().with_execution_timeout(Duration::from_secs(30))
    }

    async fn run(
        &self,
        input: playground_core::EmptyModel,
        _ctx: &TaskContext,
    ) -> Result<playground_core::EmptyModel, TaskError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(input)
    }
}

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::builder()
            .register(
                "greet",
                TaskSchema::new(Validator::structured::<GreetInput>())
                    .with_output(Validator::structured::<GreetOutput>()),
            )
            .register("always-fails", TaskSchema::default())
            .register("gate", TaskSchema::default())
            .build(),
    )
}

async fn runner_with(worker: Worker) -> (TaskRunner, LocalOrchestrator) {
    let orchestrator = LocalOrchestrator::new();
    orchestrator.start_worker(&worker).await.unwrap();
    let runner = TaskRunner::new(Arc::new(orchestrator.clone()), registry());
    (runner, orchestrator)
}

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_poll_mode_returns_result() {
    let (runner, _) = runner_with(Worker::builder("w").task(Greet).build()).await;

    let outcome = runner
        .run(
            "greet",
            &payload(json!({"name": "Ada"})),
            RunOptions::default().with_poll_interval(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.result, Some(json!({"message": "Hello, Ada!"})));
}

#[tokio::test]
async fn test_stream_mode_returns_result() {
    let (runner, _) = runner_with(Worker::builder("w").task(Greet).build()).await;

    let outcome = runner
        .run(
            "greet",
            &payload(json!({"name": "Grace"})),
            RunOptions::streaming(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.result, Some(json!({"message": "Hello, Grace!"})));
}

#[tokio::test]
async fn test_failed_run_has_no_result() {
    let (runner, orchestrator) = runner_with(Worker::builder("w").task(AlwaysFails).build()).await;

    let outcome = runner
        .run(
            "always-fails",
            &Payload::new(),
            RunOptions::default().with_poll_interval(Duration::from_millis(20)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.result.is_none());

    let details = orchestrator.get_run(&outcome.workflow_run_id).await.unwrap();
    assert_eq!(details.error_message.as_deref(), Some("Task failed: nope"));
}

#[tokio::test]
async fn test_validation_error_never_triggers() {
    let (runner, orchestrator) = runner_with(Worker::builder("w").task(Greet).build()).await;

    let err = runner
        .run("greet", &payload(json!({"name": 5})), RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Validation { .. }));
    assert_eq!(orchestrator.active_count().await, 0);
}

#[tokio::test]
async fn test_unhosted_task_surfaces_client_error() {
    let (runner, _) = runner_with(Worker::builder("w").task(Greet).build()).await;

    let err = runner
        .trigger("not-hosted", &Payload::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunnerError::Client(_)));
}

#[tokio::test(start_paused = true)]
async fn test_slots_bound_concurrency() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let worker = Worker::builder("bounded")
        .slots(2)
        .task(Gate {
            running: running.clone(),
            peak: peak.clone(),
        })
        .build();
    let (runner, _) = runner_with(worker).await;

    let payloads = vec![Payload::new(); 5];
    let refs = runner.trigger_bulk("gate", &payloads, None).await.unwrap();
    assert_eq!(refs.len(), 5);

    for run_ref in &refs {
        let status = runner
            .wait_for_terminal(&run_ref.workflow_run_id, Duration::from_millis(100), None)
            .await
            .unwrap();
        assert_eq!(status, RunStatus::Completed);
    }

    assert_eq!(peak.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_on_long_run() {
    let worker = Worker::builder("w")
        .task(Gate {
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
        .build();
    let (runner, _) = runner_with(worker).await;

    let err = runner
        .run(
            "gate",
            &Payload::new(),
            RunOptions::default()
                .with_poll_interval(Duration::from_millis(100))
                .with_timeout(Some(Duration::from_millis(250))),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_stream_timeout_on_long_run() {
    let worker = Worker::builder("w")
        .task(Gate {
            running: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        })
        .build();
    let (runner, orchestrator) = runner_with(worker).await;

    let err = runner
        .run(
            "gate",
            &Payload::new(),
            RunOptions::streaming().with_timeout(Some(Duration::from_millis(250))),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    // Giving up on the stream leaves the run itself alone
    assert_eq!(orchestrator.active_count().await, 1);
}
