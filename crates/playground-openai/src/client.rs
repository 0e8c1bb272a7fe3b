// OpenAI chat completion client

use reqwest::Client;
use thiserror::Error;

use crate::types::{ChatCompletion, ChatMessage, ChatRequest, OpenAiResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OPENAI_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Failed to send OpenAI request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No choices in OpenAI response")]
    NoChoices,
}

/// OpenAI API client
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for the public API
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from environment variables
    ///
    /// Environment variables:
    /// - `OPENAI_API_KEY`: API key (required)
    /// - `OPENAI_BASE_URL`: API base URL (default: https://api.openai.com/v1)
    pub fn from_env() -> Result<Self, OpenAiError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(OpenAiError::MissingApiKey)?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::with_base_url(api_key, base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Non-streaming chat completion
    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatCompletion, OpenAiError> {
        let request = ChatRequest { model, messages };

        tracing::debug!(model = %model, messages = messages.len(), "Sending chat completion");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api { status, body });
        }

        let response: OpenAiResponse = response.json().await?;
        let choice = response.choices.into_iter().next().ok_or(OpenAiError::NoChoices)?;

        Ok(ChatCompletion {
            content: choice.message.content,
            model: response.model,
            usage: response.usage,
        })
    }
}
