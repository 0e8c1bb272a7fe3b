// OpenAI client
//
// Just enough of the chat completions API for the chat task: send a list of
// role-tagged messages, get back the first choice's content and token usage.

pub mod client;
pub mod types;

pub use client::{OpenAiClient, OpenAiError, DEFAULT_BASE_URL};
pub use types::{ChatCompletion, ChatMessage, MessageRole, TokenUsage};
