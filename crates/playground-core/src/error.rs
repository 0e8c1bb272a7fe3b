// Error types for the task runner
//
// Three layers:
// - ClientError: anything the orchestration platform (or the transport to it) reports
// - TaskError: a task body failing while it executes on a worker
// - RunnerError: what TaskRunner callers see; local errors never touch the platform

use std::time::Duration;
use thiserror::Error;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Errors reported by an orchestration client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Transport-level failure (connection refused, TLS, body decode)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Platform answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Run or task not known to the platform
    #[error("Not found: {0}")]
    NotFound(String),

    /// Registration clashes with an existing entry
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Client was asked to do something after shutdown
    #[error("Client is shut down")]
    Shutdown,
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

/// Errors raised by a task body
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Input did not decode into the task's input type
    #[error("Invalid task input: {0}")]
    InvalidInput(String),

    /// Task ran past its execution timeout
    #[error("Task exceeded execution timeout of {0:?}")]
    ExecutionTimeout(Duration),

    /// Task failed while running
    #[error("Task failed: {0}")]
    Failed(String),
}

impl TaskError {
    /// Create a failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        TaskError::Failed(msg.into())
    }
}

/// Errors that can occur while triggering or observing runs
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Payload did not match the task's input schema
    #[error("Validation error for task '{task}': {message}")]
    Validation { task: String, message: String },

    /// Caller violated an argument precondition
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Run did not reach a terminal status before the deadline
    #[error("Timed out after {timeout:?} waiting for workflow_run_id={workflow_run_id}")]
    Timeout {
        workflow_run_id: String,
        timeout: Duration,
    },

    /// A registry entry references a schema kind nobody knows how to build
    #[error("Unsupported input validator type: {0}")]
    UnsupportedSchema(String),

    /// Error reported by the orchestration client
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl RunnerError {
    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        RunnerError::Precondition(msg.into())
    }

    /// Create a validation error
    pub fn validation(task: impl Into<String>, msg: impl Into<String>) -> Self {
        RunnerError::Validation {
            task: task.into(),
            message: msg.into(),
        }
    }

    /// True when the error was raised without contacting the platform
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            RunnerError::Validation { .. }
                | RunnerError::Precondition(_)
                | RunnerError::UnsupportedSchema(_)
        )
    }

    /// True for deadline expiry while waiting on a run
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunnerError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_errors() {
        assert!(RunnerError::precondition("bad").is_local());
        assert!(RunnerError::validation("say_hello", "missing field").is_local());
        assert!(RunnerError::UnsupportedSchema("Foo".into()).is_local());
        assert!(!RunnerError::Client(ClientError::Shutdown).is_local());
        assert!(!RunnerError::Timeout {
            workflow_run_id: "r".into(),
            timeout: Duration::from_secs(1)
        }
        .is_local());
    }

    #[test]
    fn test_client_error_is_transparent() {
        let err = RunnerError::from(ClientError::Api {
            status: 400,
            message: "bad workflow".into(),
        });
        assert_eq!(err.to_string(), "API error (400): bad workflow");
    }

    #[test]
    fn test_validation_message() {
        let err = RunnerError::validation("say_hello", "missing field `name`");
        assert_eq!(
            err.to_string(),
            "Validation error for task 'say_hello': missing field `name`"
        );
    }
}
