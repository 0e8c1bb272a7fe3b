// Run status, references and outcomes
//
// Statuses follow the platform's V1 task status names so they serialize the
// same way the platform reports them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunStatus {
    /// Terminal statuses: no further transitions occur
    pub const TERMINAL: [RunStatus; 3] =
        [RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled];

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Cancelled => "CANCELLED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUEUED" => Ok(RunStatus::Queued),
            "RUNNING" => Ok(RunStatus::Running),
            "COMPLETED" => Ok(RunStatus::Completed),
            "CANCELLED" => Ok(RunStatus::Cancelled),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

/// Reference to a triggered run
///
/// The id is opaque; the task name is kept so results can be unwrapped
/// from workflow-shaped outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRef {
    pub workflow_run_id: String,
    pub task_name: String,
}

impl RunRef {
    pub fn new(workflow_run_id: impl Into<String>, task_name: impl Into<String>) -> Self {
        Self {
            workflow_run_id: workflow_run_id.into(),
            task_name: task_name.into(),
        }
    }
}

/// What the platform reports for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDetails {
    pub workflow_run_id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Kind of a run event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventKind {
    Queued,
    Started,
    Log,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl RunEventKind {
    /// Event kinds that close a run's event stream
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunEventKind::Completed | RunEventKind::Failed | RunEventKind::Cancelled
        )
    }
}

impl fmt::Display for RunEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunEventKind::Queued => "QUEUED",
            RunEventKind::Started => "STARTED",
            RunEventKind::Log => "LOG",
            RunEventKind::Retrying => "RETRYING",
            RunEventKind::Completed => "COMPLETED",
            RunEventKind::Failed => "FAILED",
            RunEventKind::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// One event in a run's ordered event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub workflow_run_id: String,
    pub kind: RunEventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(
        workflow_run_id: impl Into<String>,
        kind: RunEventKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            workflow_run_id: workflow_run_id.into(),
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}

/// Final result of `TaskRunner::run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub workflow_run_id: String,
    pub status: RunStatus,
    /// Only present when status is COMPLETED
    pub result: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_value(RunStatus::Completed).unwrap(),
            serde_json::json!("COMPLETED")
        );
        let parsed: RunStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, RunStatus::Cancelled);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("running".parse::<RunStatus>().unwrap(), RunStatus::Running);
        assert_eq!("FAILED".parse::<RunStatus>().unwrap(), RunStatus::Failed);
        assert!("BACKOFF".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_event_kind_terminal() {
        assert!(RunEventKind::Completed.is_terminal());
        assert!(!RunEventKind::Log.is_terminal());
        assert!(!RunEventKind::Retrying.is_terminal());
    }
}
