// Task runner: trigger runs and follow them to a terminal status
//
// The runner shapes raw JSON payloads with the task's registered schema,
// submits them through an OrchestrationClient and then either polls status at a
// fixed interval or consumes the run's event stream. Local checks (payload
// validation, argument preconditions) always happen before the platform is
// contacted.

use futures::StreamExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{BulkRunItem, OrchestrationClient};
use crate::error::{Result, RunnerError};
use crate::schema::{SchemaRegistry, TaskSchema, Validator};
use crate::status::{Outcome, RunRef, RunStatus};

/// Raw, untyped task payload
pub type Payload = Map<String, Value>;

/// Default interval between status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How `TaskRunner::run` follows a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitMode {
    /// Query status at a fixed interval
    #[default]
    Poll,
    /// Consume the run's event stream, then fetch the final status
    Stream,
}

/// Options for `TaskRunner::run`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub mode: WaitMode,
    pub poll_interval: Duration,
    /// Deadline wrapping the poll loop or the stream consumption
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: WaitMode::Poll,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl RunOptions {
    pub fn streaming() -> Self {
        Self {
            mode: WaitMode::Stream,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Convert a seconds value from user input into a positive Duration
pub fn positive_duration(secs: f64, what: &str) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(RunnerError::precondition(format!(
            "{} must be positive, got {}",
            what, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| RunnerError::precondition(format!("{}: {}", what, e)))
}

/// Typed client-side handle bound to one task name and its schemas
#[derive(Clone)]
pub struct TaskStub {
    task_name: String,
    schema: TaskSchema,
    client: Arc<dyn OrchestrationClient>,
}

impl TaskStub {
    pub fn name(&self) -> &str {
        &self.task_name
    }

    pub fn schema(&self) -> &TaskSchema {
        &self.schema
    }

    pub fn build_input(&self, payload: &Payload) -> Result<Value> {
        TaskRunner::build_input(&self.task_name, payload, &self.schema.input)
    }

    /// Submit one run and return immediately
    pub async fn run_no_wait(&self, payload: &Payload) -> Result<RunRef> {
        let input = self.build_input(payload)?;
        let run_ref = self.client.trigger(&self.task_name, input, None).await?;
        Ok(run_ref)
    }

    pub fn create_bulk_run_item(&self, payload: &Payload, key: Option<String>) -> Result<BulkRunItem> {
        Ok(BulkRunItem {
            input: self.build_input(payload)?,
            key,
        })
    }

    /// Submit prepared items in one call
    pub async fn run_many_no_wait(&self, items: Vec<BulkRunItem>) -> Result<Vec<RunRef>> {
        let refs = self.client.trigger_many(&self.task_name, items).await?;
        Ok(refs)
    }

    /// Check a completed run's output against the output validator
    pub fn validate_output(&self, output: Value) -> Result<Value> {
        match self.schema.output {
            Some(Validator::Structured(schema)) => schema
                .validate(output)
                .map_err(|e| RunnerError::validation(&self.task_name, format!("output: {}", e))),
            Some(Validator::Empty) | None => Ok(output),
        }
    }
}

/// Triggers tasks and follows their runs
#[derive(Clone)]
pub struct TaskRunner {
    client: Arc<dyn OrchestrationClient>,
    registry: Arc<SchemaRegistry>,
}

impl TaskRunner {
    pub fn new(client: Arc<dyn OrchestrationClient>, registry: Arc<SchemaRegistry>) -> Self {
        Self { client, registry }
    }

    pub fn client(&self) -> &Arc<dyn OrchestrationClient> {
        &self.client
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Stub for `task_name` using its registered (or default) schema
    pub fn stub(&self, task_name: &str) -> TaskStub {
        TaskStub {
            task_name: task_name.to_string(),
            schema: *self.registry.resolve(task_name),
            client: self.client.clone(),
        }
    }

    /// Shape a raw payload with `validator`
    ///
    /// Empty ignores the payload and yields `{}`; Structured validates and
    /// normalizes it.
    pub fn build_input(task_name: &str, payload: &Payload, validator: &Validator) -> Result<Value> {
        validator
            .apply(payload)
            .map_err(|e| RunnerError::validation(task_name, e.to_string()))
    }

    /// Submit one run without waiting for it
    pub async fn trigger(&self, task_name: &str, payload: &Payload) -> Result<RunRef> {
        self.stub(task_name).run_no_wait(payload).await
    }

    /// Submit one run per payload in a single bulk call
    ///
    /// `keys`, when given, must match `payloads` one to one; they are passed
    /// to the platform as idempotency tokens.
    pub async fn trigger_bulk(
        &self,
        task_name: &str,
        payloads: &[Payload],
        keys: Option<&[String]>,
    ) -> Result<Vec<RunRef>> {
        if let Some(keys) = keys {
            if keys.len() != payloads.len() {
                return Err(RunnerError::precondition(format!(
                    "keys must have the same length as input payloads ({} != {})",
                    keys.len(),
                    payloads.len()
                )));
            }
        }

        let stub = self.stub(task_name);
        let items = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                let key = keys.map(|keys| keys[index].clone());
                stub.create_bulk_run_item(payload, key)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(task_name = %task_name, count = items.len(), "Triggering bulk runs");
        stub.run_many_no_wait(items).await
    }

    /// Poll until the run is terminal
    ///
    /// A zero interval or zero timeout is rejected before any remote call. With
    /// a timeout, expiry is a `RunnerError::Timeout`, never the last observed
    /// status.
    pub async fn wait_for_terminal(
        &self,
        workflow_run_id: &str,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<RunStatus> {
        ensure_poll_interval(poll_interval)?;
        ensure_timeout(timeout)?;
        with_deadline(
            workflow_run_id,
            timeout,
            self.poll_until_terminal(workflow_run_id, poll_interval),
        )
        .await
    }

    async fn poll_until_terminal(
        &self,
        workflow_run_id: &str,
        poll_interval: Duration,
    ) -> Result<RunStatus> {
        loop {
            let status = self.client.get_status(workflow_run_id).await?;
            info!(workflow_run_id = %workflow_run_id, status = %status, "Polled run status");

            if status.is_terminal() {
                return Ok(status);
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Consume the run's event stream until it ends, then return the final status
    pub async fn stream(&self, workflow_run_id: &str) -> Result<RunStatus> {
        info!(workflow_run_id = %workflow_run_id, "Streaming events");
        let mut events = self.client.subscribe(workflow_run_id).await?;

        while let Some(event) = events.next().await {
            let event = event?;
            info!(
                workflow_run_id = %workflow_run_id,
                "[{}] {}",
                event.kind,
                event.payload
            );
        }

        let final_status = self.client.get_status(workflow_run_id).await?;
        info!(workflow_run_id = %workflow_run_id, final_status = %final_status, "Event stream ended");
        Ok(final_status)
    }

    /// Output of a run, unwrapped from a `{ "<task>": output }` workflow shape
    pub async fn fetch_result(&self, run_ref: &RunRef) -> Result<Option<Value>> {
        let details = self.client.get_run(&run_ref.workflow_run_id).await?;
        let Some(output) = details.output else {
            return Ok(None);
        };

        let output = unwrap_task_output(&run_ref.task_name, output);
        let output = self.stub(&run_ref.task_name).validate_output(output)?;
        Ok(Some(output))
    }

    /// Trigger a task, follow it to a terminal status and fetch its result
    pub async fn run(&self, task_name: &str, payload: &Payload, options: RunOptions) -> Result<Outcome> {
        if options.mode == WaitMode::Poll {
            ensure_poll_interval(options.poll_interval)?;
        }
        ensure_timeout(options.timeout)?;

        info!(task_name = %task_name, mode = ?options.mode, "Triggering task");
        let run_ref = self.trigger(task_name, payload).await?;
        let workflow_run_id = run_ref.workflow_run_id.clone();
        info!(workflow_run_id = %workflow_run_id, "Triggered workflow run");

        let status = match options.mode {
            WaitMode::Poll => {
                with_deadline(
                    &workflow_run_id,
                    options.timeout,
                    self.poll_until_terminal(&workflow_run_id, options.poll_interval),
                )
                .await?
            }
            WaitMode::Stream => {
                with_deadline(&workflow_run_id, options.timeout, self.stream(&workflow_run_id))
                    .await?
            }
        };

        if status == RunStatus::Completed {
            let result = self.fetch_result(&run_ref).await?;
            let rendered = result
                .as_ref()
                .map(|value| value.to_string())
                .unwrap_or_default();
            info!(
                workflow_run_id = %workflow_run_id,
                result = %rendered,
                "Run completed"
            );
            return Ok(Outcome {
                workflow_run_id,
                status,
                result,
            });
        }

        let details = self.client.get_run(&workflow_run_id).await?;
        info!(
            workflow_run_id = %workflow_run_id,
            status = %details.status,
            error = ?details.error_message,
            "Run ended without completing"
        );

        Ok(Outcome {
            workflow_run_id,
            status,
            result: None,
        })
    }
}

fn ensure_poll_interval(poll_interval: Duration) -> Result<()> {
    if poll_interval.is_zero() {
        return Err(RunnerError::precondition("poll interval must be positive"));
    }
    Ok(())
}

fn ensure_timeout(timeout: Option<Duration>) -> Result<()> {
    if timeout.is_some_and(|t| t.is_zero()) {
        return Err(RunnerError::precondition("timeout must be positive"));
    }
    Ok(())
}

async fn with_deadline<F>(workflow_run_id: &str, timeout: Option<Duration>, fut: F) -> Result<RunStatus>
where
    F: std::future::Future<Output = Result<RunStatus>>,
{
    match timeout {
        None => fut.await,
        Some(timeout) => tokio::time::timeout(timeout, fut).await.map_err(|_| {
            debug!(workflow_run_id = %workflow_run_id, ?timeout, "Deadline expired");
            RunnerError::Timeout {
                workflow_run_id: workflow_run_id.to_string(),
                timeout,
            }
        })?,
    }
}

fn unwrap_task_output(task_name: &str, output: Value) -> Value {
    match output {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(task_name) => {
            map.remove(task_name).unwrap_or(Value::Null)
        }
        other => other,
    }
}
