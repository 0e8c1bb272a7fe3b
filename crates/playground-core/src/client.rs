// Orchestration client trait
//
// Everything the runner needs from the orchestration platform:
// - submit one run or a bulk of runs (with optional idempotency keys)
// - query status and details of a run
// - subscribe to a run's ordered event stream
//
// Implementations:
// - playground-hatchet: the hosted platform over its REST API
// - LocalOrchestrator: in-process execution for examples and tests

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::error::ClientError;
use crate::status::{RunDetails, RunEvent, RunRef, RunStatus};

/// Ordered stream of run events; ends when the run is over
pub type RunEventStream = Pin<Box<dyn Stream<Item = Result<RunEvent, ClientError>> + Send>>;

/// One item of a bulk submission
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRunItem {
    /// Validated task input
    pub input: Value,
    /// Optional idempotency / dedupe key
    pub key: Option<String>,
}

impl BulkRunItem {
    pub fn new(input: Value) -> Self {
        Self { input, key: None }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Client for an orchestration platform
#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Backend name (for logging)
    fn name(&self) -> &'static str;

    /// Submit one run and return without waiting for it
    async fn trigger(
        &self,
        task_name: &str,
        input: Value,
        key: Option<String>,
    ) -> Result<RunRef, ClientError>;

    /// Submit many runs of the same task; refs are returned in submission order
    async fn trigger_many(
        &self,
        task_name: &str,
        items: Vec<BulkRunItem>,
    ) -> Result<Vec<RunRef>, ClientError> {
        let mut refs = Vec::with_capacity(items.len());
        for item in items {
            refs.push(self.trigger(task_name, item.input, item.key).await?);
        }
        Ok(refs)
    }

    /// Current status of a run
    async fn get_status(&self, workflow_run_id: &str) -> Result<RunStatus, ClientError>;

    /// Status, output and error message of a run
    async fn get_run(&self, workflow_run_id: &str) -> Result<RunDetails, ClientError>;

    /// Live event stream for a run
    async fn subscribe(&self, workflow_run_id: &str) -> Result<RunEventStream, ClientError>;
}
