//! Completion request/response shapes
//!
//! Responses are validated strictly: any missing or mistyped field fails
//! the regeneration attempt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LlmError;
use crate::models::PromptMessage;

/// Chat completion request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
    /// Cap on completion tokens
    pub max_tokens: u64,
}

/// Token usage reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Validated completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Assistant message content of the first choice
    pub content: String,
    pub finish_reason: String,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
struct RawCompletion {
    #[allow(dead_code)]
    id: String,
    #[allow(dead_code)]
    object: String,
    #[allow(dead_code)]
    created: u64,
    choices: Vec<RawChoice>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[allow(dead_code)]
    index: u32,
    message: RawMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    role: String,
    content: String,
}

/// Validate a raw chat-completion response
pub fn validate_completion(value: Value) -> Result<Completion, LlmError> {
    let raw: RawCompletion =
        serde_json::from_value(value).map_err(|e| LlmError::Schema(e.to_string()))?;

    for choice in &raw.choices {
        if choice.message.role != "assistant" {
            return Err(LlmError::Schema(format!(
                "Expected assistant role, got '{}'",
                choice.message.role
            )));
        }
    }

    let first = raw
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Schema("Completion has no choices".to_string()))?;

    Ok(Completion {
        content: first.message.content,
        finish_reason: first.finish_reason,
        usage: raw.usage,
    })
}
