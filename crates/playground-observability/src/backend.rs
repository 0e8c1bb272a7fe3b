// Observability Backend Trait
//
// Backends receive high-level events from tasks and translate them to
// provider-specific formats.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// High-level observability events emitted by tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObservabilityEvent {
    /// A task run has started; one trace per run attempt
    TraceStarted {
        trace_id: String,
        name: String,
        workflow_run_id: String,
        input: Option<serde_json::Value>,
        metadata: HashMap<String, serde_json::Value>,
        timestamp: DateTime<Utc>,
    },

    /// An LLM call finished
    GenerationCompleted {
        trace_id: String,
        generation_id: String,
        name: String,
        model: String,
        input: serde_json::Value,
        output: Option<serde_json::Value>,
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
        total_tokens: Option<u32>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },

    /// A task run has finished
    TraceCompleted {
        trace_id: String,
        output: Option<serde_json::Value>,
        success: bool,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl ObservabilityEvent {
    pub fn trace_id(&self) -> &str {
        match self {
            Self::TraceStarted { trace_id, .. } => trace_id,
            Self::GenerationCompleted { trace_id, .. } => trace_id,
            Self::TraceCompleted { trace_id, .. } => trace_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TraceStarted { timestamp, .. } => *timestamp,
            Self::GenerationCompleted { end_time, .. } => *end_time,
            Self::TraceCompleted { timestamp, .. } => *timestamp,
        }
    }
}

/// Trait for observability backends
#[async_trait]
pub trait ObservabilityBackend: Send + Sync {
    /// Get the name of this backend (for logging)
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    async fn record(&self, event: ObservabilityEvent) -> Result<(), ObservabilityError>;

    /// Send anything buffered
    async fn flush(&self) -> Result<(), ObservabilityError>;

    async fn shutdown(&self) -> Result<(), ObservabilityError> {
        self.flush().await
    }
}

/// Errors that can occur during observability operations
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A no-op backend for when observability is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBackend;

#[async_trait]
impl ObservabilityBackend for NoopBackend {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn record(&self, _event: ObservabilityEvent) -> Result<(), ObservabilityError> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), ObservabilityError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_trace_id() {
        let event = ObservabilityEvent::TraceCompleted {
            trace_id: "trace-1".to_string(),
            output: None,
            success: true,
            error: None,
            timestamp: Utc::now(),
        };
        assert_eq!(event.trace_id(), "trace-1");
    }

    #[tokio::test]
    async fn test_noop_backend() {
        let backend = NoopBackend;
        assert!(!backend.is_enabled());
        backend
            .record(ObservabilityEvent::TraceStarted {
                trace_id: "t".to_string(),
                name: "chat-otel".to_string(),
                workflow_run_id: "run-1".to_string(),
                input: None,
                metadata: HashMap::new(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
        backend.shutdown().await.unwrap();
    }
}
