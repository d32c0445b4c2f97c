//! Per-message token counting
//!
//! Follows the chat-completion accounting convention: every message costs a
//! fixed overhead plus the encoded length of each of its fields. When a
//! name is present the role is omitted by the model, saving one token.

use tiktoken_rs::CoreBPE;

use crate::error::{Error, Result};
use crate::models::PromptMessage;

/// Fixed cost of `<im_start>{role/name}\n{content}<im_end>\n`
pub const TOKENS_PER_MESSAGE: usize = 4;

/// Turns text into a token count for one model
pub trait TokenEncoder: Send + Sync {
    /// Number of tokens `text` encodes to
    fn encoded_len(&self, text: &str) -> usize;
}

/// Byte-pair encoder backed by tiktoken
pub struct BpeEncoder {
    bpe: CoreBPE,
}

impl BpeEncoder {
    /// Encoder for `model`, falling back to `cl100k_base` for unknown models
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => bpe,
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "Unknown model, using cl100k_base encoding");
                tiktoken_rs::cl100k_base()
                    .map_err(|e| Error::Config(format!("Failed to load cl100k_base encoding: {e}")))?
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenEncoder for BpeEncoder {
    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Token cost of a single prompt message
pub fn token_count(encoder: &dyn TokenEncoder, message: &PromptMessage) -> usize {
    let mut tokens = TOKENS_PER_MESSAGE;
    tokens += encoder.encoded_len(message.role.as_str());
    tokens += encoder.encoded_len(&message.content);
    if let Some(name) = &message.name {
        tokens += encoder.encoded_len(name);
        tokens -= 1;
    }
    tokens
}

/// Estimated prompt tokens of a whole request
pub fn prompt_token_count(encoder: &dyn TokenEncoder, messages: &[PromptMessage]) -> usize {
    messages.iter().map(|m| token_count(encoder, m)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    /// One token per whitespace-separated word
    struct WordEncoder;

    impl TokenEncoder for WordEncoder {
        fn encoded_len(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn test_count_without_name() {
        let message = PromptMessage::system("play some disco");
        // overhead + "system" + 3 words
        assert_eq!(token_count(&WordEncoder, &message), TOKENS_PER_MESSAGE + 1 + 3);
    }

    #[test]
    fn test_name_discount() {
        let message = PromptMessage {
            role: Role::User,
            content: "more bass".to_string(),
            name: Some("Alice".to_string()),
        };
        // overhead + "user" + 2 words + name - 1
        assert_eq!(token_count(&WordEncoder, &message), TOKENS_PER_MESSAGE + 1 + 2 + 1 - 1);
    }

    #[test]
    fn test_count_is_deterministic() {
        let message = PromptMessage {
            role: Role::User,
            content: "something from the eighties please".to_string(),
            name: Some("Bob".to_string()),
        };
        let first = token_count(&WordEncoder, &message);
        let second = token_count(&WordEncoder, &message.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_prompt_count_sums_messages() {
        let messages = vec![
            PromptMessage::system("be a dj"),
            PromptMessage::assistant("$PLAYLIST$a;b$PLAYLIST$"),
        ];
        let expected: usize = messages.iter().map(|m| token_count(&WordEncoder, m)).sum();
        assert_eq!(prompt_token_count(&WordEncoder, &messages), expected);
    }

    #[test]
    fn test_bpe_encoder_counts_tokens() {
        let encoder = BpeEncoder::for_model("gpt-3.5-turbo").unwrap();
        assert!(encoder.encoded_len("hello world") > 0);
        assert_eq!(encoder.encoded_len(""), 0);

        let fallback = BpeEncoder::for_model("not-a-model").unwrap();
        assert!(fallback.encoded_len("hello world") > 0);
    }
}
