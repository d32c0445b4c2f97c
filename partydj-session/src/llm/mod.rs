//! Language-model completion client
//!
//! `LlmClient` is the seam the orchestrator talks to; `OpenAiClient` is the
//! production chat-completions implementation.

pub mod completion;
pub mod openai;

pub use completion::{validate_completion, Completion, CompletionRequest, Usage};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

/// Language-model client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid completion response: {0}")]
    Schema(String),
}

/// Chat completion provider
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}
