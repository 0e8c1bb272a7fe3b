// Scripted in-memory orchestration client for tests
//
// Plays back a fixed status sequence and records every call, so runner
// behavior can be asserted without a platform:
// - status queries return the scripted statuses in order, repeating the last one
// - triggers are recorded with their inputs and keys
// - subscriptions yield a fixed number of LOG events followed by COMPLETED

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::{OrchestrationClient, RunEventStream};
use crate::error::ClientError;
use crate::status::{RunDetails, RunEvent, RunEventKind, RunRef, RunStatus};

// ============================================================================
// ScriptedClient
// ============================================================================

/// Orchestration client driven by a scripted status sequence
#[derive(Debug, Default)]
pub struct ScriptedClient {
    statuses: Mutex<VecDeque<RunStatus>>,
    last_status: Mutex<Option<RunStatus>>,
    output: Option<Value>,
    error_message: Option<String>,
    event_count: usize,
    submissions: Mutex<Vec<(Value, Option<String>)>>,
    trigger_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by successive `get_status` calls
    pub fn with_statuses(self, statuses: Vec<RunStatus>) -> Self {
        if let Ok(mut queue) = self.statuses.lock() {
            *queue = statuses.into();
        }
        self
    }

    /// Output reported by `get_run`
    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Number of LOG events yielded before the terminal event
    pub fn with_event_count(mut self, count: usize) -> Self {
        self.event_count = count;
        self
    }

    pub fn trigger_calls(&self) -> usize {
        self.trigger_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submitted_inputs(&self) -> Vec<Value> {
        self.submissions
            .lock()
            .map(|s| s.iter().map(|(input, _)| input.clone()).collect())
            .unwrap_or_default()
    }

    pub fn submitted_keys(&self) -> Vec<Option<String>> {
        self.submissions
            .lock()
            .map(|s| s.iter().map(|(_, key)| key.clone()).collect())
            .unwrap_or_default()
    }

    fn next_status(&self) -> RunStatus {
        let next = self.statuses.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = match self.last_status.lock() {
            Ok(last) => last,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(status) = next {
            *last = Some(status);
        }
        last.unwrap_or(RunStatus::Completed)
    }

    fn peek_status(&self) -> RunStatus {
        let last = self.last_status.lock().ok().and_then(|l| *l);
        let front = self.statuses.lock().ok().and_then(|q| q.back().copied());
        last.or(front).unwrap_or(RunStatus::Completed)
    }
}

#[async_trait]
impl OrchestrationClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn trigger(
        &self,
        task_name: &str,
        input: Value,
        key: Option<String>,
    ) -> Result<RunRef, ClientError> {
        let index = self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push((input, key));
        }
        Ok(RunRef::new(format!("run-{}", index + 1), task_name))
    }

    async fn get_status(&self, _workflow_run_id: &str) -> Result<RunStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.next_status())
    }

    async fn get_run(&self, workflow_run_id: &str) -> Result<RunDetails, ClientError> {
        Ok(RunDetails {
            workflow_run_id: workflow_run_id.to_string(),
            status: self.peek_status(),
            output: self.output.clone(),
            error_message: self.error_message.clone(),
        })
    }

    async fn subscribe(&self, workflow_run_id: &str) -> Result<RunEventStream, ClientError> {
        let mut events: Vec<Result<RunEvent, ClientError>> = (0..self.event_count)
            .map(|i| {
                Ok(RunEvent::new(
                    workflow_run_id,
                    RunEventKind::Log,
                    json!(format!("line {}", i + 1)),
                ))
            })
            .collect();
        events.push(Ok(RunEvent::new(
            workflow_run_id,
            RunEventKind::Completed,
            Value::Null,
        )));
        Ok(Box::pin(stream::iter(events)))
    }
}
