// Langfuse Backend Implementation
//
// Sends events to Langfuse's batched ingestion API.
//
// Mapping:
// - TraceStarted        -> trace-create (name, input, metadata)
// - GenerationCompleted -> generation-create (model, messages, answer, usage)
// - TraceCompleted      -> trace-create upsert with the run's output

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::backend::{ObservabilityBackend, ObservabilityError, ObservabilityEvent};
use crate::config::LangfuseConfig;

/// Langfuse ingestion event types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "body", rename_all = "kebab-case")]
enum LangfuseIngestionEvent {
    TraceCreate(TraceCreateBody),
    GenerationCreate(GenerationCreateBody),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceCreateBody {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationCreateBody {
    id: String,
    trace_id: String,
    name: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    model: String,
    input: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<UsageBody>,
}

#[derive(Debug, Clone, Serialize)]
struct UsageBody {
    input: Option<u32>,
    output: Option<u32>,
    total: Option<u32>,
    unit: &'static str,
}

/// Batch request to Langfuse ingestion API
#[derive(Debug, Clone, Serialize)]
struct IngestionBatch {
    batch: Vec<BatchItem>,
    metadata: BatchMetadata,
}

#[derive(Debug, Clone, Serialize)]
struct BatchItem {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: LangfuseIngestionEvent,
}

#[derive(Debug, Clone, Serialize)]
struct BatchMetadata {
    sdk_name: &'static str,
    sdk_version: &'static str,
    public_key: String,
}

/// Response from Langfuse ingestion API (207 multi-status)
#[derive(Debug, Clone, Deserialize)]
struct IngestionResponse {
    #[serde(default)]
    successes: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorItem {
    id: String,
    status: i32,
    message: Option<String>,
}

/// Langfuse observability backend
pub struct LangfuseBackend {
    config: LangfuseConfig,
    client: Client,
    batch: Arc<Mutex<Vec<BatchItem>>>,
}

impl LangfuseBackend {
    pub fn new(config: LangfuseConfig) -> Result<Self, ObservabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ObservabilityError::Config(e.to_string()))?;

        Ok(Self {
            config,
            client,
            batch: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Create from environment configuration; `None` when Langfuse is not configured
    pub fn from_env() -> Result<Option<Self>, ObservabilityError> {
        match LangfuseConfig::from_env() {
            Some(config) => Ok(Some(Self::new(config)?)),
            None => Ok(None),
        }
    }

    /// Events waiting for the next flush
    pub async fn pending(&self) -> usize {
        self.batch.lock().await.len()
    }

    async fn add_to_batch(&self, events: Vec<LangfuseIngestionEvent>) -> Result<(), ObservabilityError> {
        let should_flush = {
            let mut batch = self.batch.lock().await;
            for event in events {
                batch.push(BatchItem {
                    id: uuid::Uuid::now_v7().to_string(),
                    timestamp: Utc::now(),
                    event,
                });
            }
            batch.len() >= self.config.max_batch_size
        };

        if should_flush {
            self.flush().await?;
        }
        Ok(())
    }

    async fn send_batch(&self, items: Vec<BatchItem>) -> Result<(), ObservabilityError> {
        if items.is_empty() {
            return Ok(());
        }

        let batch = IngestionBatch {
            batch: items,
            metadata: BatchMetadata {
                sdk_name: "playground-observability",
                sdk_version: env!("CARGO_PKG_VERSION"),
                public_key: self.config.public_key.clone(),
            },
        };

        let url = self.config.ingestion_endpoint();
        debug!(url = %url, batch_size = batch.batch.len(), "Sending batch to Langfuse");

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .json(&batch)
            .send()
            .await
            .map_err(|e| ObservabilityError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, body = %body, "Langfuse ingestion failed");
            return Err(ObservabilityError::Export(format!("HTTP {}: {}", status, body)));
        }

        let result: IngestionResponse = response
            .json()
            .await
            .map_err(|e| ObservabilityError::Serialization(e.to_string()))?;

        for err in &result.errors {
            warn!(
                id = %err.id,
                status = err.status,
                message = ?err.message,
                "Langfuse ingestion error"
            );
        }

        debug!(
            successes = result.successes.len(),
            errors = result.errors.len(),
            "Langfuse batch sent"
        );
        Ok(())
    }

    fn convert_event(&self, event: ObservabilityEvent) -> Vec<LangfuseIngestionEvent> {
        match event {
            ObservabilityEvent::TraceStarted {
                trace_id,
                name,
                workflow_run_id,
                input,
                mut metadata,
                timestamp,
            } => {
                metadata.insert(
                    "workflow_run_id".to_string(),
                    serde_json::Value::String(workflow_run_id.clone()),
                );
                vec![LangfuseIngestionEvent::TraceCreate(TraceCreateBody {
                    id: trace_id,
                    timestamp: Some(timestamp),
                    name: Some(name),
                    session_id: Some(workflow_run_id),
                    release: self.config.release.clone(),
                    input,
                    metadata: serde_json::to_value(metadata).ok(),
                    tags: Some(vec!["hatchet-playground".to_string()]),
                    ..TraceCreateBody::default()
                })]
            }

            ObservabilityEvent::GenerationCompleted {
                trace_id,
                generation_id,
                name,
                model,
                input,
                output,
                input_tokens,
                output_tokens,
                total_tokens,
                start_time,
                end_time,
            } => {
                let usage = (input_tokens.is_some() || output_tokens.is_some() || total_tokens.is_some())
                    .then_some(UsageBody {
                        input: input_tokens,
                        output: output_tokens,
                        total: total_tokens,
                        unit: "TOKENS",
                    });

                vec![LangfuseIngestionEvent::GenerationCreate(GenerationCreateBody {
                    id: generation_id,
                    trace_id,
                    name,
                    start_time,
                    end_time,
                    model,
                    input,
                    output,
                    usage,
                })]
            }

            ObservabilityEvent::TraceCompleted {
                trace_id,
                output,
                success,
                error,
                ..
            } => {
                let output = match (output, error) {
                    (Some(output), _) => Some(output),
                    (None, Some(error)) => Some(serde_json::json!({"error": error})),
                    (None, None) => None,
                };
                vec![LangfuseIngestionEvent::TraceCreate(TraceCreateBody {
                    id: trace_id,
                    output,
                    metadata: Some(serde_json::json!({"success": success})),
                    ..TraceCreateBody::default()
                })]
            }
        }
    }
}

#[async_trait]
impl ObservabilityBackend for LangfuseBackend {
    fn name(&self) -> &'static str {
        "langfuse"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn record(&self, event: ObservabilityEvent) -> Result<(), ObservabilityError> {
        let events = self.convert_event(event);
        self.add_to_batch(events).await
    }

    async fn flush(&self) -> Result<(), ObservabilityError> {
        let items = {
            let mut batch = self.batch.lock().await;
            std::mem::take(&mut *batch)
        };
        self.send_batch(items).await
    }
}
