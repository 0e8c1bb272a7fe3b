// API error responses
//
// Every error body is `{"detail": "<message>"}`. The status depends on where
// the failure happened: submission (400), request validation (422) or while
// waiting on a submitted run (504 / 404 / 502).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use playground_core::{ClientError, RunnerError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Request body failed validation
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    /// Error raised while building or submitting a run
    pub fn submission(err: RunnerError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }

    /// Error raised while waiting on, or reading, a submitted run
    pub fn waiting(err: RunnerError) -> Self {
        let status = match &err {
            RunnerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RunnerError::Client(ClientError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::waiting(RunnerError::Client(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_waiting_status_mapping() {
        let timeout = ApiError::waiting(RunnerError::Timeout {
            workflow_run_id: "run-1".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(timeout.status, StatusCode::GATEWAY_TIMEOUT);

        let missing = ApiError::from(ClientError::NotFound("run-1".to_string()));
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let upstream = ApiError::from(ClientError::Transport("connection refused".to_string()));
        assert_eq!(upstream.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_submission_is_bad_request() {
        let err = ApiError::submission(RunnerError::validation("say_hello", "missing field `name`"));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.detail.contains("missing field `name`"));
    }
}
