// In-process orchestrator using Tokio tasks
//
// Hosts workers in the current process and implements OrchestrationClient on
// top of them. Not durable across restarts. Per run it enforces:
// - the hosting worker's slot budget (one permit per executing run)
// - the task's execution timeout, per attempt
// - the task's retry count
// - dedupe of (task, idempotency key) pairs
// Every state change is appended to the run's ordered event log; subscribers
// get the log replayed from the start, then live events until a terminal one.

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::{OrchestrationClient, RunEventStream};
use crate::error::{ClientError, TaskError};
use crate::status::{RunDetails, RunEvent, RunEventKind, RunRef, RunStatus};
use crate::task::{DynTask, TaskContext};
use crate::worker::Worker;

struct HostedTask {
    task: Arc<dyn DynTask>,
    worker: String,
    slots: Arc<Semaphore>,
}

struct RunRecord {
    status: RunStatus,
    output: Option<Value>,
    error_message: Option<String>,
    events: Vec<RunEvent>,
}

/// State of one run, shared by the executor and subscribers
struct RunState {
    workflow_run_id: String,
    task_name: String,
    record: Mutex<RunRecord>,
    version: watch::Sender<u64>,
}

fn lock(record: &Mutex<RunRecord>) -> MutexGuard<'_, RunRecord> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RunState {
    fn new(workflow_run_id: String, task_name: String) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            workflow_run_id,
            task_name,
            record: Mutex::new(RunRecord {
                status: RunStatus::Queued,
                output: None,
                error_message: None,
                events: Vec::new(),
            }),
            version,
        }
    }

    /// Append an event and move to `status`; ignored once the run is terminal
    fn transition(&self, status: RunStatus, kind: RunEventKind, payload: Value) -> bool {
        {
            let mut record = lock(&self.record);
            if record.status.is_terminal() {
                return false;
            }
            record.status = status;
            match kind {
                RunEventKind::Completed => record.output = Some(payload.clone()),
                RunEventKind::Failed | RunEventKind::Cancelled => {
                    record.error_message = payload
                        .get("error")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                }
                _ => {}
            }
            record
                .events
                .push(RunEvent::new(&self.workflow_run_id, kind, payload));
        }
        self.version.send_modify(|v| *v += 1);
        true
    }

    fn log(&self, message: String) {
        let current = lock(&self.record).status;
        self.transition(current, RunEventKind::Log, Value::String(message));
    }

    fn status(&self) -> RunStatus {
        lock(&self.record).status
    }

    fn details(&self) -> RunDetails {
        let record = lock(&self.record);
        RunDetails {
            workflow_run_id: self.workflow_run_id.clone(),
            status: record.status,
            output: record.output.clone(),
            error_message: record.error_message.clone(),
        }
    }

    fn event_at(&self, index: usize) -> Option<RunEvent> {
        lock(&self.record).events.get(index).cloned()
    }
}

/// Finished runs kept for status lookups before the oldest are evicted
pub const DEFAULT_RETAINED_RUNS: usize = 1_000;

/// In-process orchestrator hosting workers on the Tokio runtime
#[derive(Clone)]
pub struct LocalOrchestrator {
    tasks: Arc<RwLock<HashMap<String, Arc<HostedTask>>>>,
    runs: Arc<RwLock<HashMap<String, Arc<RunState>>>>,
    /// (task name, idempotency key) -> workflow run id
    keys: Arc<RwLock<HashMap<(String, String), String>>>,
    /// Executing runs (run id -> task handle)
    active_runs: Arc<RwLock<HashMap<String, JoinHandle<()>>>>,
    /// Finished run ids, oldest first
    finished: Arc<RwLock<VecDeque<String>>>,
    retained_runs: usize,
    shut_down: Arc<AtomicBool>,
}

impl Default for LocalOrchestrator {
    fn default() -> Self {
        Self {
            tasks: Arc::default(),
            runs: Arc::default(),
            keys: Arc::default(),
            active_runs: Arc::default(),
            finished: Arc::default(),
            retained_runs: DEFAULT_RETAINED_RUNS,
            shut_down: Arc::default(),
        }
    }
}

impl LocalOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retained_runs` finished runs (minimum 1)
    ///
    /// Evicted runs and their idempotency keys are forgotten: looking them up
    /// returns NotFound and reusing the key starts a new run.
    pub fn with_retention(mut self, retained_runs: usize) -> Self {
        self.retained_runs = retained_runs.max(1);
        self
    }

    /// Start hosting a worker's tasks
    ///
    /// Fails without registering anything when one of the worker's task names
    /// is already hosted.
    pub async fn start_worker(&self, worker: &Worker) -> Result<(), ClientError> {
        let mut tasks = self.tasks.write().await;

        let mut seen = std::collections::HashSet::new();
        for task in worker.tasks() {
            let name = task.name();
            if let Some(existing) = tasks.get(name) {
                return Err(ClientError::Conflict(format!(
                    "task '{}' is already hosted by worker '{}'",
                    name, existing.worker
                )));
            }
            if !seen.insert(name) {
                return Err(ClientError::Conflict(format!(
                    "task '{}' is declared twice by worker '{}'",
                    name,
                    worker.name()
                )));
            }
        }

        let slots = Arc::new(Semaphore::new(worker.slots()));
        for task in worker.tasks() {
            tasks.insert(
                task.name().to_string(),
                Arc::new(HostedTask {
                    task: task.clone(),
                    worker: worker.name().to_string(),
                    slots: slots.clone(),
                }),
            );
        }

        info!(
            worker = %worker.name(),
            slots = worker.slots(),
            tasks = ?worker.task_names(),
            "Started local worker"
        );
        Ok(())
    }

    /// Names of all hosted tasks, sorted
    pub async fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of runs currently executing or waiting for a slot
    pub async fn active_count(&self) -> usize {
        self.active_runs.read().await.len()
    }

    /// Cancel one run; no-op if it already finished
    pub async fn cancel(&self, workflow_run_id: &str) -> Result<(), ClientError> {
        let state = self.run_state(workflow_run_id).await?;

        let mut active = self.active_runs.write().await;
        if state.transition(
            RunStatus::Cancelled,
            RunEventKind::Cancelled,
            json!({"error": "Run was cancelled"}),
        ) {
            info!(workflow_run_id = %workflow_run_id, "Cancelled local run");
        }
        if let Some(handle) = active.remove(workflow_run_id) {
            handle.abort();
            self.retire(workflow_run_id).await;
        }
        Ok(())
    }

    /// Stop accepting runs and cancel everything in flight
    pub async fn shutdown(&self) {
        info!("Shutting down local orchestrator");

        let handles: Vec<(String, JoinHandle<()>)> = {
            let mut active = self.active_runs.write().await;
            self.shut_down.store(true, Ordering::SeqCst);
            active.drain().collect()
        };
        let runs = self.runs.read().await;

        for (run_id, handle) in handles {
            info!(workflow_run_id = %run_id, "Aborting run on shutdown");
            handle.abort();
            if let Some(state) = runs.get(&run_id) {
                state.transition(
                    RunStatus::Cancelled,
                    RunEventKind::Cancelled,
                    json!({"error": "Orchestrator shut down"}),
                );
            }
        }
    }

    async fn run_state(&self, workflow_run_id: &str) -> Result<Arc<RunState>, ClientError> {
        self.runs
            .read()
            .await
            .get(workflow_run_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("workflow run {}", workflow_run_id)))
    }

    /// Start executing a queued run
    ///
    /// The shutdown check and the handle insert happen under one lock, so a
    /// concurrent `shutdown` or `cancel` either sees the handle or stops the
    /// run before it starts.
    async fn spawn_run(
        &self,
        hosted: Arc<HostedTask>,
        state: Arc<RunState>,
        input: Value,
    ) -> Result<(), ClientError> {
        let run_id = state.workflow_run_id.clone();

        // Hold the map lock across spawn so the cleanup cannot run before insert
        let mut active = self.active_runs.write().await;
        if self.shut_down.load(Ordering::SeqCst) {
            state.transition(
                RunStatus::Cancelled,
                RunEventKind::Cancelled,
                json!({"error": "Orchestrator shut down"}),
            );
            return Err(ClientError::Shutdown);
        }
        if state.status().is_terminal() {
            self.retire(&run_id).await;
            return Ok(());
        }

        let orchestrator = self.clone();
        let cleanup_id = run_id.clone();
        let handle = tokio::spawn(async move {
            execute(hosted, state, input).await;
            let mut active = orchestrator.active_runs.write().await;
            if active.remove(&cleanup_id).is_some() {
                orchestrator.retire(&cleanup_id).await;
            }
        });
        active.insert(run_id, handle);
        Ok(())
    }

    /// Record a finished run and evict the oldest past the retention limit
    ///
    /// Called with the `active_runs` lock held, so an idle orchestrator has
    /// no retirement in progress.
    async fn retire(&self, workflow_run_id: &str) {
        let evicted: Vec<String> = {
            let mut finished = self.finished.write().await;
            finished.push_back(workflow_run_id.to_string());
            let overflow = finished.len().saturating_sub(self.retained_runs);
            finished.drain(..overflow).collect()
        };
        if evicted.is_empty() {
            return;
        }

        let mut keys = self.keys.write().await;
        let mut runs = self.runs.write().await;
        for run_id in &evicted {
            runs.remove(run_id);
        }
        keys.retain(|_, run_id| !evicted.contains(run_id));
        debug!(count = evicted.len(), retained = runs.len(), "Evicted finished runs");
    }
}

/// Flags the attempt cancelled when it ends or its executor is dropped
struct AttemptGuard(TaskContext);

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Run all attempts of one task invocation and record the result
async fn execute(hosted: Arc<HostedTask>, state: Arc<RunState>, input: Value) {
    let Ok(_permit) = hosted.slots.clone().acquire_owned().await else {
        state.transition(
            RunStatus::Cancelled,
            RunEventKind::Cancelled,
            json!({"error": "Worker is no longer accepting runs"}),
        );
        return;
    };

    let options = hosted.task.options();
    let max_attempts = options.retries + 1;

    for attempt in 1..=max_attempts {
        state.transition(
            RunStatus::Running,
            RunEventKind::Started,
            json!({"attempt": attempt, "worker": hosted.worker}),
        );

        let sink_state = state.clone();
        let ctx = TaskContext::new(&state.workflow_run_id, &state.task_name, attempt)
            .with_log_sink(Arc::new(move |line| sink_state.log(line)));
        let guard = AttemptGuard(ctx.clone());

        let call = hosted.task.call(input.clone(), &ctx);
        let result = match options.execution_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    ctx.cancel();
                    // The slot stays taken until abandoned blocking work returns
                    ctx.blocking_finished().await;
                    Err(TaskError::ExecutionTimeout(limit))
                }
            },
            None => call.await,
        };
        drop(guard);

        match result {
            Ok(output) => {
                info!(
                    workflow_run_id = %state.workflow_run_id,
                    task_name = %state.task_name,
                    attempt,
                    "Run completed"
                );
                state.transition(RunStatus::Completed, RunEventKind::Completed, output);
                return;
            }
            Err(e) if attempt < max_attempts => {
                warn!(
                    workflow_run_id = %state.workflow_run_id,
                    task_name = %state.task_name,
                    attempt,
                    error = %e,
                    "Attempt failed, retrying"
                );
                state.transition(
                    RunStatus::Running,
                    RunEventKind::Retrying,
                    json!({"attempt": attempt, "error": e.to_string()}),
                );
            }
            Err(e) => {
                warn!(
                    workflow_run_id = %state.workflow_run_id,
                    task_name = %state.task_name,
                    attempt,
                    error = %e,
                    "Run failed"
                );
                state.transition(
                    RunStatus::Failed,
                    RunEventKind::Failed,
                    json!({"attempt": attempt, "error": e.to_string()}),
                );
                return;
            }
        }
    }
}

#[async_trait]
impl OrchestrationClient for LocalOrchestrator {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn trigger(
        &self,
        task_name: &str,
        input: Value,
        key: Option<String>,
    ) -> Result<RunRef, ClientError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ClientError::Shutdown);
        }

        let hosted = self
            .tasks
            .read()
            .await
            .get(task_name)
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("no worker hosts task '{}'", task_name))
            })?;

        let mut keys = self.keys.write().await;
        if let Some(key) = &key {
            if let Some(existing) = keys.get(&(task_name.to_string(), key.clone())) {
                info!(task_name = %task_name, key = %key, workflow_run_id = %existing, "Deduplicated run");
                return Ok(RunRef::new(existing.clone(), task_name));
            }
        }

        let run_id = Uuid::now_v7().to_string();
        let state = Arc::new(RunState::new(run_id.clone(), task_name.to_string()));
        state.transition(
            RunStatus::Queued,
            RunEventKind::Queued,
            json!({"task_name": task_name, "input": input}),
        );

        self.runs.write().await.insert(run_id.clone(), state.clone());
        if let Some(key) = key {
            keys.insert((task_name.to_string(), key), run_id.clone());
        }
        drop(keys);

        info!(workflow_run_id = %run_id, task_name = %task_name, worker = %hosted.worker, "Queued local run");
        self.spawn_run(hosted, state, input).await?;

        Ok(RunRef::new(run_id, task_name))
    }

    async fn get_status(&self, workflow_run_id: &str) -> Result<RunStatus, ClientError> {
        Ok(self.run_state(workflow_run_id).await?.status())
    }

    async fn get_run(&self, workflow_run_id: &str) -> Result<RunDetails, ClientError> {
        Ok(self.run_state(workflow_run_id).await?.details())
    }

    async fn subscribe(&self, workflow_run_id: &str) -> Result<RunEventStream, ClientError> {
        let state = self.run_state(workflow_run_id).await?;
        let changes = state.version.subscribe();

        let events = stream::unfold(
            Some((state, changes, 0usize)),
            |cursor| async move {
                let (state, mut changes, index) = cursor?;
                loop {
                    changes.borrow_and_update();
                    if let Some(event) = state.event_at(index) {
                        let next = if event.kind.is_terminal() {
                            None
                        } else {
                            Some((state, changes, index + 1))
                        };
                        return Some((Ok(event), next));
                    }
                    if changes.changed().await.is_err() {
                        return None;
                    }
                }
            },
        );

        Ok(Box::pin(events))
    }
}
