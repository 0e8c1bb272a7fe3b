// Worker error types

use playground_core::ClientError;
use playground_observability::ObservabilityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// The chat task cannot be hosted without an OpenAI key
    #[error("OPENAI_API_KEY must be set to host the chat-otel task")]
    MissingOpenAiKey,

    #[error("Observability setup failed: {0}")]
    Observability(#[from] ObservabilityError),

    #[error("Failed to start worker: {0}")]
    Start(#[from] ClientError),
}
