// Task abstraction
//
// A Task is a typed unit of work (Input -> Output). Workers need a uniform
// JSON-in/JSON-out view, so typed tasks are erased to `Arc<dyn DynTask>`
// through the TypedTask wrapper.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::TaskError;

/// Input type for tasks that take no input
///
/// Unknown fields are ignored, so any object decodes into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyModel {}

/// Execution options declared by a task
///
/// Enforced by whatever hosts the task, never by the task itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOptions {
    /// Maximum wall time for one attempt
    pub execution_timeout: Option<Duration>,
    /// Extra attempts after the first failure
    pub retries: u32,
}

impl TaskOptions {
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Callback receiving `TaskContext::log` lines
pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

/// Per-attempt context handed to a running task
///
/// Clones share the attempt's cancellation flag. Once the attempt is
/// cancelled its log lines no longer reach the run's event stream.
#[derive(Clone)]
pub struct TaskContext {
    workflow_run_id: String,
    task_name: String,
    attempt: u32,
    log_sink: Option<LogSink>,
    cancelled: Arc<AtomicBool>,
    /// Read-held by every blocking job started through `spawn_blocking`
    blocking: Arc<RwLock<()>>,
}

impl TaskContext {
    pub fn new(workflow_run_id: impl Into<String>, task_name: impl Into<String>, attempt: u32) -> Self {
        Self {
            workflow_run_id: workflow_run_id.into(),
            task_name: task_name.into(),
            attempt,
            log_sink: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            blocking: Arc::new(RwLock::new(())),
        }
    }

    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn workflow_run_id(&self) -> &str {
        &self.workflow_run_id
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// 1-based attempt number
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Log a line and append it to the run's event stream
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(
            workflow_run_id = %self.workflow_run_id,
            task_name = %self.task_name,
            attempt = self.attempt,
            "{}",
            message
        );
        if self.is_cancelled() {
            return;
        }
        if let Some(sink) = &self.log_sink {
            sink(message);
        }
    }

    /// Whether the host gave up on this attempt
    ///
    /// Long-running work should check this between steps and stop early.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Run `job` on a blocking thread tracked by this attempt
    ///
    /// The host keeps the attempt's worker slot until every tracked job has
    /// returned, even after the attempt itself timed out.
    pub fn spawn_blocking<F, R>(&self, job: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let guard = self.blocking.clone().try_read_owned().ok();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            job()
        })
    }

    /// Resolves once no blocking job of this attempt is running
    pub async fn blocking_finished(&self) {
        drop(self.blocking.write().await);
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("workflow_run_id", &self.workflow_run_id)
            .field("task_name", &self.task_name)
            .field("attempt", &self.attempt)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A typed task definition
///
/// ```ignore
/// struct SayHello;
///
/// #[async_trait]
/// impl Task for SayHello {
///     type Input = SayHelloInput;
///     type Output = SayHelloOutput;
///
///     fn name(&self) -> &str {
///         "say_hello"
///     }
///
///     async fn run(&self, input: SayHelloInput, _ctx: &TaskContext) -> Result<SayHelloOutput, TaskError> {
///         Ok(SayHelloOutput { message: format!("Hello, {}!", input.name) })
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    type Output: Serialize + Send + 'static;

    /// Name the task is registered under
    fn name(&self) -> &str;

    fn options(&self) -> TaskOptions {
        TaskOptions::default()
    }

    async fn run(&self, input: Self::Input, ctx: &TaskContext) -> Result<Self::Output, TaskError>;
}

/// Object-safe, JSON-in/JSON-out view of a task
#[async_trait]
pub trait DynTask: Send + Sync {
    fn name(&self) -> &str;

    fn options(&self) -> TaskOptions;

    async fn call(&self, input: Value, ctx: &TaskContext) -> Result<Value, TaskError>;
}

/// Wraps a typed Task as a DynTask
pub struct TypedTask<T: Task> {
    task: T,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task> TypedTask<T> {
    pub fn new(task: T) -> Self {
        Self {
            task,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task> DynTask for TypedTask<T> {
    fn name(&self) -> &str {
        self.task.name()
    }

    fn options(&self) -> TaskOptions {
        self.task.options()
    }

    async fn call(&self, input: Value, ctx: &TaskContext) -> Result<Value, TaskError> {
        let input: T::Input =
            serde_json::from_value(input).map_err(|e| TaskError::InvalidInput(e.to_string()))?;
        let output = self.task.run(input, ctx).await?;
        serde_json::to_value(output)
            .map_err(|e| TaskError::failed(format!("Failed to serialize task output: {}", e)))
    }
}

/// Erase a typed task for registration with a worker
pub fn erase<T: Task>(task: T) -> Arc<dyn DynTask> {
    Arc::new(TypedTask::new(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Deserialize)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    #[derive(Serialize)]
    struct AddOutput {
        sum: i64,
    }

    struct AddTask;

    #[async_trait]
    impl Task for AddTask {
        type Input = AddInput;
        type Output = AddOutput;

        fn name(&self) -> &str {
            "add"
        }

        fn options(&self) -> TaskOptions {
            TaskOptions::default().with_retries(2)
        }

        async fn run(&self, input: AddInput, ctx: &TaskContext) -> Result<AddOutput, TaskError> {
            ctx.log(format!("adding {} + {}", input.a, input.b));
            Ok(AddOutput {
                sum: input.a + input.b,
            })
        }
    }

    #[tokio::test]
    async fn test_erased_task_round_trips_json() {
        let task = erase(AddTask);
        assert_eq!(task.name(), "add");
        assert_eq!(task.options().retries, 2);

        let ctx = TaskContext::new("run-1", "add", 1);
        let output = task.call(json!({"a": 2, "b": 3}), &ctx).await.unwrap();
        assert_eq!(output, json!({"sum": 5}));
    }

    #[tokio::test]
    async fn test_erased_task_rejects_bad_input() {
        let task = erase(AddTask);
        let ctx = TaskContext::new("run-1", "add", 1);
        let err = task.call(json!({"a": "two"}), &ctx).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_log_sink_receives_lines() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = lines.clone();
        let ctx = TaskContext::new("run-1", "add", 1).with_log_sink(Arc::new(move |line| {
            sink_lines.lock().unwrap().push(line);
        }));

        erase(AddTask).call(json!({"a": 1, "b": 1}), &ctx).await.unwrap();
        assert_eq!(lines.lock().unwrap().as_slice(), ["adding 1 + 1"]);
    }

    #[tokio::test]
    async fn test_cancelled_context_drops_log_lines() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink_lines = lines.clone();
        let ctx = TaskContext::new("run-1", "add", 1).with_log_sink(Arc::new(move |line| {
            sink_lines.lock().unwrap().push(line);
        }));
        let clone = ctx.clone();

        ctx.log("before");
        ctx.cancel();
        clone.log("after");

        assert!(clone.is_cancelled());
        assert_eq!(lines.lock().unwrap().as_slice(), ["before"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_finished_waits_for_tracked_jobs() {
        let ctx = TaskContext::new("run-1", "add", 1);
        let done = Arc::new(AtomicBool::new(false));
        let job_done = done.clone();
        let job_ctx = ctx.clone();

        let handle = ctx.spawn_blocking(move || {
            while !job_ctx.is_cancelled() {
                std::thread::sleep(Duration::from_millis(5));
            }
            job_done.store(true, Ordering::SeqCst);
        });
        // Abandon the handle the way a timed-out attempt does
        drop(handle);

        ctx.cancel();
        ctx.blocking_finished().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_empty_model_ignores_fields() {
        let parsed: EmptyModel = serde_json::from_value(json!({"junk": true})).unwrap();
        assert_eq!(parsed, EmptyModel {});
        assert_eq!(serde_json::to_value(EmptyModel {}).unwrap(), json!({}));
    }
}
