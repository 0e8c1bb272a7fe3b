// Wire types for the Hatchet v1 REST API
//
// Only the fields the client reads are modeled; everything else in the
// platform's responses is ignored.

use chrono::{DateTime, Utc};
use playground_core::{RunEvent, RunEventKind, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body for triggering a workflow run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWorkflowRunRequest {
    pub workflow_name: String,
    pub input: Value,
    pub additional_metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResourceMeta {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRun {
    pub metadata: ApiResourceMeta,
    pub status: RunStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Response of the trigger and details endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunDetails {
    pub run: WorkflowRun,
}

/// One row of a run's task event log
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEvent {
    pub event_type: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskEventList {
    #[serde(default)]
    pub rows: Vec<TaskEvent>,
}

impl TaskEvent {
    pub fn kind(&self) -> RunEventKind {
        match self.event_type.as_str() {
            "QUEUED" | "REQUEUED_NO_WORKER" | "REQUEUED_RATE_LIMIT" => RunEventKind::Queued,
            "STARTED" | "ASSIGNED" => RunEventKind::Started,
            "RETRYING" | "RETRIED_BY_USER" => RunEventKind::Retrying,
            "FINISHED" | "COMPLETED" => RunEventKind::Completed,
            "FAILED" | "TIMED_OUT" => RunEventKind::Failed,
            "CANCELLED" => RunEventKind::Cancelled,
            _ => RunEventKind::Log,
        }
    }

    pub fn into_run_event(self, workflow_run_id: &str) -> RunEvent {
        let kind = self.kind();
        let payload = match kind {
            RunEventKind::Completed => self.output.unwrap_or(Value::Null),
            RunEventKind::Failed | RunEventKind::Cancelled => {
                serde_json::json!({"error": self.error_message.or(self.message)})
            }
            _ => self.message.map(Value::String).unwrap_or(Value::Null),
        };

        RunEvent {
            workflow_run_id: workflow_run_id.to_string(),
            kind,
            payload,
            timestamp: self.timestamp,
        }
    }
}

/// Error body the API returns on failures
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrors {
    #[serde(default)]
    pub errors: Vec<ApiErrorDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDescription {
    pub description: String,
}

impl ApiErrors {
    /// Joined descriptions, or `None` when the body carried none
    pub fn message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| e.description.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
