// Task HTTP routes
//
// POST /tasks/:task_name/run submits a run and, when asked, polls it to a
// terminal status. Submission errors are 400; waiting errors map through
// ApiError::waiting.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use playground_core::{positive_duration, Payload, RunStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

pub const MIN_POLL_INTERVAL_SECONDS: f64 = 0.1;
pub const MAX_POLL_INTERVAL_SECONDS: f64 = 30.0;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks))
        .route("/tasks/:task_name/run", post(run_task))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskListResponse {
    /// Registered task names, sorted
    pub tasks: Vec<String>,
}

/// Request to run a task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunTaskRequest {
    /// Raw task input; shaped by the task's registered schema
    #[serde(default)]
    #[schema(value_type = Object)]
    pub input_payload: Payload,
    /// Poll the run until it reaches a terminal status
    #[serde(default)]
    pub wait_for_completion: bool,
    /// Seconds between status queries, within [0.1, 30.0]
    #[serde(default = "default_poll_interval_seconds")]
    #[schema(example = 1.0)]
    pub poll_interval_seconds: f64,
    /// Give up waiting after this many seconds
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
}

fn default_poll_interval_seconds() -> f64 {
    1.0
}

impl Default for RunTaskRequest {
    fn default() -> Self {
        Self {
            input_payload: Payload::new(),
            wait_for_completion: false,
            poll_interval_seconds: default_poll_interval_seconds(),
            timeout_seconds: None,
        }
    }
}

impl RunTaskRequest {
    /// Poll interval and optional deadline, or a 422 when out of range
    pub fn wait_settings(&self) -> Result<(Duration, Option<Duration>), ApiError> {
        let interval = self.poll_interval_seconds;
        if !(MIN_POLL_INTERVAL_SECONDS..=MAX_POLL_INTERVAL_SECONDS).contains(&interval) {
            return Err(ApiError::unprocessable(format!(
                "poll_interval_seconds must be between {} and {}, got {}",
                MIN_POLL_INTERVAL_SECONDS, MAX_POLL_INTERVAL_SECONDS, interval
            )));
        }
        let poll_interval = Duration::from_secs_f64(interval);

        let timeout = self
            .timeout_seconds
            .map(|secs| positive_duration(secs, "timeout_seconds"))
            .transpose()
            .map_err(|e| ApiError::unprocessable(e.to_string()))?;

        Ok((poll_interval, timeout))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunTaskResponse {
    pub workflow_run_id: String,
    /// Terminal status; null when not waiting
    #[schema(value_type = Option<String>, example = "COMPLETED")]
    pub status: Option<RunStatus>,
    /// Task output; set only for completed runs
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
}

/// GET /tasks - List registered task names
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Registered task names", body = TaskListResponse),
    ),
    tag = "tasks"
)]
pub async fn list_tasks(State(state): State<AppState>) -> Json<TaskListResponse> {
    Json(TaskListResponse {
        tasks: state.runner.registry().task_names(),
    })
}

/// POST /tasks/{task_name}/run - Submit a run, optionally waiting for it
#[utoipa::path(
    post,
    path = "/tasks/{task_name}/run",
    params(
        ("task_name" = String, Path, description = "Registered task name")
    ),
    request_body = RunTaskRequest,
    responses(
        (status = 200, description = "Run submitted (and finished, when waiting)", body = RunTaskResponse),
        (status = 400, description = "Submission failed", body = ErrorResponse),
        (status = 404, description = "Run disappeared while waiting", body = ErrorResponse),
        (status = 422, description = "Invalid request body", body = ErrorResponse),
        (status = 502, description = "Platform error while waiting", body = ErrorResponse),
        (status = 504, description = "Run did not finish before the timeout", body = ErrorResponse),
    ),
    tag = "tasks"
)]
pub async fn run_task(
    State(state): State<AppState>,
    Path(task_name): Path<String>,
    body: Result<Json<RunTaskRequest>, JsonRejection>,
) -> Result<Json<RunTaskResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::unprocessable(e.body_text()))?;
    let (poll_interval, timeout) = request.wait_settings()?;

    let run_ref = state
        .runner
        .trigger(&task_name, &request.input_payload)
        .await
        .map_err(ApiError::submission)?;
    info!(task_name = %task_name, workflow_run_id = %run_ref.workflow_run_id, "Submitted run");

    if !request.wait_for_completion {
        return Ok(Json(RunTaskResponse {
            workflow_run_id: run_ref.workflow_run_id,
            status: None,
            result: None,
        }));
    }

    let status = state
        .runner
        .wait_for_terminal(&run_ref.workflow_run_id, poll_interval, timeout)
        .await
        .map_err(ApiError::waiting)?;

    let result = if status == RunStatus::Completed {
        state
            .runner
            .fetch_result(&run_ref)
            .await
            .map_err(ApiError::waiting)?
    } else {
        None
    };

    Ok(Json(RunTaskResponse {
        workflow_run_id: run_ref.workflow_run_id,
        status: Some(status),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: RunTaskRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.input_payload.is_empty());
        assert!(!request.wait_for_completion);
        assert_eq!(request.poll_interval_seconds, 1.0);
        assert_eq!(request.timeout_seconds, None);
    }

    #[test]
    fn test_wait_settings_bounds() {
        let request = RunTaskRequest {
            poll_interval_seconds: 0.05,
            ..RunTaskRequest::default()
        };
        assert_eq!(
            request.wait_settings().unwrap_err().status,
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let request = RunTaskRequest {
            poll_interval_seconds: 30.0,
            timeout_seconds: Some(2.5),
            ..RunTaskRequest::default()
        };
        assert_eq!(
            request.wait_settings().unwrap(),
            (Duration::from_secs(30), Some(Duration::from_millis(2500)))
        );
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let request = RunTaskRequest {
            timeout_seconds: Some(0.0),
            ..RunTaskRequest::default()
        };
        let err = request.wait_settings().unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail.contains("timeout_seconds"));
    }
}
