// Chat task with LLM tracing
//
// Asks the OpenAI chat completion API a question and records the exchange as
// a Langfuse trace with one generation. Telemetry failures are logged and
// never fail the run.

use async_trait::async_trait;
use chrono::Utc;
use playground_core::{Task, TaskContext, TaskError};
use playground_observability::{ObservabilityBackend, ObservabilityEvent};
use playground_openai::{ChatMessage, OpenAiClient};
use playground_schemas::{ChatOtelInput, ChatOtelOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct ChatOtel {
    openai: OpenAiClient,
    observability: Arc<dyn ObservabilityBackend>,
}

impl ChatOtel {
    pub fn new(openai: OpenAiClient, observability: Arc<dyn ObservabilityBackend>) -> Self {
        Self {
            openai,
            observability,
        }
    }

    async fn record(&self, event: ObservabilityEvent) {
        if let Err(e) = self.observability.record(event).await {
            warn!(backend = self.observability.name(), error = %e, "Failed to record telemetry");
        }
    }

    async fn flush(&self) {
        if let Err(e) = self.observability.flush().await {
            warn!(backend = self.observability.name(), error = %e, "Failed to flush telemetry");
        }
    }
}

#[async_trait]
impl Task for ChatOtel {
    type Input = ChatOtelInput;
    type Output = ChatOtelOutput;

    fn name(&self) -> &str {
        "chat-otel"
    }

    async fn run(&self, input: ChatOtelInput, ctx: &TaskContext) -> Result<ChatOtelOutput, TaskError> {
        let trace_id = uuid::Uuid::now_v7().to_string();
        let messages = vec![
            ChatMessage::system(&input.system_prompt),
            ChatMessage::user(&input.question),
        ];

        self.record(ObservabilityEvent::TraceStarted {
            trace_id: trace_id.clone(),
            name: self.name().to_string(),
            workflow_run_id: ctx.workflow_run_id().to_string(),
            input: serde_json::to_value(&input).ok(),
            metadata: HashMap::from([("attempt".to_string(), serde_json::json!(ctx.attempt()))]),
            timestamp: Utc::now(),
        })
        .await;

        ctx.log(format!("asking {}", input.model));
        let start_time = Utc::now();
        let completion = match self.openai.chat_completion(input.model.as_str(), &messages).await {
            Ok(completion) => completion,
            Err(e) => {
                self.record(ObservabilityEvent::TraceCompleted {
                    trace_id,
                    output: None,
                    success: false,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                })
                .await;
                self.flush().await;
                return Err(TaskError::failed(e.to_string()));
            }
        };

        let output = ChatOtelOutput {
            answer: completion.content.clone(),
        };

        self.record(ObservabilityEvent::GenerationCompleted {
            trace_id: trace_id.clone(),
            generation_id: uuid::Uuid::now_v7().to_string(),
            name: "openai.chat.completions".to_string(),
            model: completion.model.clone(),
            input: serde_json::to_value(&messages).unwrap_or_default(),
            output: completion.content.clone().map(serde_json::Value::String),
            input_tokens: completion.usage.map(|u| u.prompt_tokens),
            output_tokens: completion.usage.map(|u| u.completion_tokens),
            total_tokens: completion.usage.map(|u| u.total_tokens),
            start_time,
            end_time: Utc::now(),
        })
        .await;

        self.record(ObservabilityEvent::TraceCompleted {
            trace_id,
            output: serde_json::to_value(&output).ok(),
            success: true,
            error: None,
            timestamp: Utc::now(),
        })
        .await;

        self.flush().await;

        Ok(output)
    }
}
