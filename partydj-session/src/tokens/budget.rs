//! Session token budget
//!
//! Derived once at startup from `[budget]` and the system message cost.
//! A budget whose caps are not positive is a fatal configuration error.

use serde::Serialize;

use crate::config::BudgetConfig;
use crate::error::{Error, Result};

/// Token targets for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenBudget {
    /// Hard ceiling on cumulative tokens per session
    pub max_session_tokens: u64,
    /// Expected number of regenerations per session
    pub cycles: u64,
    /// Tokens left after the system message of every cycle
    pub usable_tokens: u64,
    /// Share of usable tokens for prompt messages
    pub usable_message_tokens: u64,
    /// Share of usable tokens for playlist completions
    pub usable_playlist_tokens: u64,
    /// Cap per individual user message
    pub max_message_tokens: u64,
    /// Cap per playlist (prior playlist context and completion alike)
    pub max_playlist_tokens: u64,
}

impl TokenBudget {
    /// Compute the budget for `config` given the token cost of the system message
    pub fn compute(config: &BudgetConfig, system_message_tokens: u64) -> Result<Self> {
        config.validate()?;

        let max_session_tokens =
            ((config.max_spend_per_session / config.currency_per_1k_tokens) * 1000.0).round() as u64;

        let buffer = config.prompt_message_buffer as u64;
        let trailing = config.trailing_context_messages as u64;
        let cycles = config.target_user_messages / buffer;
        if cycles == 0 {
            return Err(Error::Config(format!(
                "budget.target_user_messages ({}) must be at least budget.prompt_message_buffer ({})",
                config.target_user_messages, buffer
            )));
        }

        let system_overhead = cycles * system_message_tokens;
        let usable_tokens = max_session_tokens.checked_sub(system_overhead).filter(|t| *t > 0).ok_or_else(|| {
            Error::Config(format!(
                "System message overhead ({system_overhead} tokens) exhausts the session budget ({max_session_tokens} tokens)"
            ))
        })?;

        let usable_playlist_tokens = (usable_tokens as f64 * config.playlist_token_share).floor() as u64;
        let usable_message_tokens = usable_tokens - usable_playlist_tokens;

        let max_message_tokens = usable_message_tokens / (cycles * (buffer + trailing));
        let max_playlist_tokens = usable_playlist_tokens / (cycles * 2);

        if max_message_tokens == 0 || max_playlist_tokens == 0 {
            return Err(Error::Config(format!(
                "Token budget yields non-positive caps (message: {max_message_tokens}, playlist: {max_playlist_tokens})"
            )));
        }

        let budget = Self {
            max_session_tokens,
            cycles,
            usable_tokens,
            usable_message_tokens,
            usable_playlist_tokens,
            max_message_tokens,
            max_playlist_tokens,
        };

        tracing::info!(
            max_session_tokens,
            cycles,
            max_message_tokens,
            max_playlist_tokens,
            "Token budget computed"
        );

        Ok(budget)
    }

    /// Whether a session with `spent` tokens may still accept messages
    pub fn allows(&self, spent: u64) -> bool {
        spent < self.max_session_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_config() -> BudgetConfig {
        BudgetConfig {
            max_spend_per_session: 0.15,
            currency_per_1k_tokens: 0.002,
            target_user_messages: 150,
            trailing_context_messages: 10,
            prompt_message_buffer: 5,
            playlist_token_share: 0.75,
        }
    }

    #[test]
    fn test_reference_budget_split() {
        let config = reference_config();
        let budget = TokenBudget::compute(&config, 120).unwrap();

        assert_eq!(budget.max_session_tokens, 75_000);
        assert_eq!(budget.cycles, 30);
        assert_eq!(budget.usable_tokens, 75_000 - 30 * 120);
        assert!(budget.max_message_tokens > 0);
        assert!(budget.max_playlist_tokens > 0);
        assert!(budget.max_message_tokens * budget.cycles * 15 <= budget.usable_message_tokens);
        assert!(budget.max_playlist_tokens * budget.cycles * 2 <= budget.usable_playlist_tokens);
        assert_eq!(
            budget.usable_message_tokens + budget.usable_playlist_tokens,
            budget.usable_tokens
        );
    }

    #[test]
    fn test_oversized_system_message_is_fatal() {
        let config = reference_config();
        let result = TokenBudget::compute(&config, 2_500);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_playlist_share_is_fatal() {
        let mut config = reference_config();
        config.playlist_token_share = 0.0;
        assert!(matches!(TokenBudget::compute(&config, 100), Err(Error::Config(_))));
    }

    #[test]
    fn test_too_few_target_messages_is_fatal() {
        let mut config = reference_config();
        config.target_user_messages = 3;
        assert!(matches!(TokenBudget::compute(&config, 100), Err(Error::Config(_))));
    }

    #[test]
    fn test_allows_below_max_only() {
        let budget = TokenBudget::compute(&reference_config(), 100).unwrap();
        assert!(budget.allows(0));
        assert!(budget.allows(budget.max_session_tokens - 1));
        assert!(!budget.allows(budget.max_session_tokens));
        assert!(!budget.allows(budget.max_session_tokens + 1));
    }
}
