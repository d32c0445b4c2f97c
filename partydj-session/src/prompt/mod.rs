//! Prompt construction and completion parsing
//!
//! The composer bounds the prompt window, the parser turns the completion
//! back into track requests. Both only see `PlaylistSettings`, which is
//! built once at startup.

pub mod composer;
pub mod parser;

pub use composer::{compose_prompt, limit_message_tokens, TRUNCATION_STEP_CHARS};
pub use parser::parse_completion;

use crate::config::{Config, PromptConfig};
use crate::error::Result;
use crate::models::{PromptMessage, SessionMessage};
use crate::tokens::{token_count, TokenBudget, TokenEncoder};

/// Everything the prompt pipeline needs, resolved once
#[derive(Debug, Clone)]
pub struct PlaylistSettings {
    /// Language model identifier
    pub model: String,
    pub prompt: PromptConfig,
    /// Older user messages kept as context
    pub trailing_context_messages: usize,
    /// New user messages per prompt, also the regeneration cadence
    pub prompt_message_buffer: usize,
    pub budget: TokenBudget,
}

impl PlaylistSettings {
    /// Resolve settings and compute the token budget (fails fast on bad caps)
    pub fn from_config(config: &Config, encoder: &dyn TokenEncoder) -> Result<Self> {
        let system_tokens = token_count(encoder, &PromptMessage::system(&config.prompt.system_message));
        let budget = TokenBudget::compute(&config.budget, system_tokens as u64)?;

        Ok(Self {
            model: config.openai.model.clone(),
            prompt: config.prompt.clone(),
            trailing_context_messages: config.budget.trailing_context_messages,
            prompt_message_buffer: config.budget.prompt_message_buffer,
            budget,
        })
    }

    /// Whether `user_message_count` lands on the regeneration cadence
    pub fn is_regeneration_due(&self, user_message_count: usize) -> bool {
        user_message_count > 0 && user_message_count % self.prompt_message_buffer == 0
    }
}

/// Compose the prompt window for `log` and truncate it to the token caps
pub fn build_prompt(
    log: &[SessionMessage],
    settings: &PlaylistSettings,
    encoder: &dyn TokenEncoder,
) -> Result<Vec<PromptMessage>> {
    let messages = compose_prompt(log, settings);
    limit_message_tokens(messages, encoder, &settings.budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordEncoder;

    impl TokenEncoder for WordEncoder {
        fn encoded_len(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = PlaylistSettings::from_config(&Config::default(), &WordEncoder).unwrap();
        assert_eq!(settings.prompt_message_buffer, 5);
        assert_eq!(settings.model, "gpt-3.5-turbo");
        assert_eq!(settings.budget.max_session_tokens, 75_000);
    }

    #[test]
    fn test_regeneration_cadence() {
        let settings = PlaylistSettings::from_config(&Config::default(), &WordEncoder).unwrap();
        let due: Vec<usize> = (0..=16).filter(|n| settings.is_regeneration_due(*n)).collect();
        assert_eq!(due, vec![5, 10, 15]);
    }
}
