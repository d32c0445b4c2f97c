//! Bounded-context prompt composition
//!
//! Prompt layout: system instruction, trailing context (older user
//! messages), the most recent playlist, then the new user messages.
//! Anything older than the trailing window is dropped.

use crate::error::{Error, Result};
use crate::models::{PromptMessage, Role, SessionMessage};
use crate::tokens::{token_count, TokenBudget, TokenEncoder};

use super::PlaylistSettings;

/// Characters removed per truncation step
pub const TRUNCATION_STEP_CHARS: usize = 10;

/// Build the prompt window for a session log
pub fn compose_prompt(log: &[SessionMessage], settings: &PlaylistSettings) -> Vec<PromptMessage> {
    let users: Vec<&SessionMessage> = log.iter().filter(|m| m.is_user()).collect();
    let prior_playlist = log
        .iter()
        .rev()
        .find(|m| matches!(m, SessionMessage::Assistant { .. }));

    let new_start = users.len().saturating_sub(settings.prompt_message_buffer);
    let old_start = new_start.saturating_sub(settings.trailing_context_messages);

    let mut prompt = Vec::with_capacity(2 + users.len() - old_start);
    prompt.push(PromptMessage::system(&settings.prompt.system_message));
    prompt.extend(users[old_start..new_start].iter().map(|m| m.to_prompt()));
    if let Some(playlist) = prior_playlist {
        prompt.push(playlist.to_prompt());
    }
    prompt.extend(users[new_start..].iter().map(|m| m.to_prompt()));
    prompt
}

/// Truncate every non-system message until it fits its class cap
///
/// User messages are capped at `max_message_tokens`, playlists at
/// `max_playlist_tokens`. Content is cut from the end in fixed steps; a cap
/// that cannot be reached even with empty content is a configuration error.
pub fn limit_message_tokens(
    messages: Vec<PromptMessage>,
    encoder: &dyn TokenEncoder,
    budget: &TokenBudget,
) -> Result<Vec<PromptMessage>> {
    messages
        .into_iter()
        .map(|message| {
            let cap = match message.role {
                Role::System => return Ok(message),
                Role::User => budget.max_message_tokens,
                Role::Assistant => budget.max_playlist_tokens,
            };
            truncate_to_cap(message, encoder, cap as usize)
        })
        .collect()
}

fn truncate_to_cap(
    mut message: PromptMessage,
    encoder: &dyn TokenEncoder,
    cap: usize,
) -> Result<PromptMessage> {
    let original_tokens = token_count(encoder, &message);
    let mut tokens = original_tokens;

    while tokens > cap {
        if message.content.is_empty() {
            return Err(Error::Config(format!(
                "Token cap of {cap} for {} messages cannot be reached by truncation",
                message.role.as_str()
            )));
        }
        let keep = message.content.chars().count().saturating_sub(TRUNCATION_STEP_CHARS);
        let cut = message
            .content
            .char_indices()
            .nth(keep)
            .map(|(idx, _)| idx)
            .unwrap_or(message.content.len());
        message.content.truncate(cut);
        tokens = token_count(encoder, &message);
    }

    if tokens != original_tokens {
        tracing::debug!(
            role = message.role.as_str(),
            from = original_tokens,
            to = tokens,
            cap,
            "Truncated prompt message"
        );
    }

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptConfig;
    use partydj_common::events::Member;

    struct CharEncoder;

    impl TokenEncoder for CharEncoder {
        fn encoded_len(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    fn settings(buffer: usize, trailing: usize) -> PlaylistSettings {
        PlaylistSettings {
            model: "gpt-3.5-turbo".to_string(),
            prompt: PromptConfig {
                system_message: "sys".to_string(),
                ..PromptConfig::default()
            },
            trailing_context_messages: trailing,
            prompt_message_buffer: buffer,
            budget: budget(1_000, 1_000),
        }
    }

    fn budget(max_message_tokens: u64, max_playlist_tokens: u64) -> TokenBudget {
        TokenBudget {
            max_session_tokens: 75_000,
            cycles: 30,
            usable_tokens: 70_000,
            usable_message_tokens: 17_500,
            usable_playlist_tokens: 52_500,
            max_message_tokens,
            max_playlist_tokens,
        }
    }

    fn user(n: usize) -> SessionMessage {
        SessionMessage::user(
            format!("m{n}"),
            format!("request {n}"),
            Member {
                id: "u1".to_string(),
                name: "Guest".to_string(),
                is_host: false,
            },
        )
    }

    fn contents(prompt: &[PromptMessage]) -> Vec<&str> {
        prompt.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_empty_log_yields_system_only() {
        let prompt = compose_prompt(&[], &settings(5, 10));
        assert_eq!(prompt.len(), 1);
        assert_eq!(prompt[0].role, Role::System);
    }

    #[test]
    fn test_window_order() {
        let mut log: Vec<SessionMessage> = (1..=4).map(user).collect();
        log.push(SessionMessage::Assistant {
            content: "old playlist".to_string(),
        });
        log.extend((5..=7).map(user));
        log.push(SessionMessage::Assistant {
            content: "latest playlist".to_string(),
        });
        log.extend((8..=9).map(user));

        let prompt = compose_prompt(&log, &settings(3, 2));
        assert_eq!(
            contents(&prompt),
            vec![
                "sys",
                "request 5",
                "request 6",
                "latest playlist",
                "request 7",
                "request 8",
                "request 9",
            ]
        );
    }

    #[test]
    fn test_window_is_bounded_for_long_logs() {
        let (buffer, trailing) = (5, 10);
        let mut log = Vec::new();
        for n in 1..=200 {
            log.push(user(n));
            if n % buffer == 0 {
                log.push(SessionMessage::Assistant {
                    content: format!("playlist {n}"),
                });
            }
        }

        let prompt = compose_prompt(&log, &settings(buffer, trailing));
        assert!(prompt.len() <= 1 + trailing + 1 + buffer);
        assert_eq!(prompt.len(), 1 + trailing + 1 + buffer);
        let last = prompt.last().map(|m| m.content.as_str());
        assert_eq!(last, Some("request 200"));
    }

    #[test]
    fn test_user_messages_carry_prompt_name() {
        let prompt = compose_prompt(&[user(1)], &settings(5, 10));
        assert_eq!(prompt[1].name.as_deref(), Some("Guest"));
        assert_eq!(prompt[1].role, Role::User);
    }

    #[test]
    fn test_limit_truncates_by_class() {
        let system = "a very long system message that is never truncated";
        let messages = vec![
            PromptMessage::system(system),
            PromptMessage {
                role: Role::User,
                content: "x".repeat(100),
                name: None,
            },
            PromptMessage::assistant("y".repeat(100)),
        ];
        // CharEncoder: 4 overhead + role chars + content chars
        let limited = limit_message_tokens(messages, &CharEncoder, &budget(40, 60)).unwrap();

        assert_eq!(limited[0].content, system);
        assert!(token_count(&CharEncoder, &limited[1]) <= 40);
        assert!(token_count(&CharEncoder, &limited[2]) <= 60);
        assert_eq!(limited[1].content.len() % TRUNCATION_STEP_CHARS, 0);
        assert!(limited[2].content.len() > limited[1].content.len());
    }

    #[test]
    fn test_limit_keeps_short_messages() {
        let messages = vec![PromptMessage::assistant("short")];
        let limited = limit_message_tokens(messages.clone(), &CharEncoder, &budget(40, 60)).unwrap();
        assert_eq!(limited, messages);
    }

    #[test]
    fn test_unreachable_cap_is_config_error() {
        let messages = vec![PromptMessage {
            role: Role::User,
            content: "hello there".to_string(),
            name: None,
        }];
        // Overhead plus role alone exceed the cap
        let result = limit_message_tokens(messages, &CharEncoder, &budget(3, 60));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let messages = vec![PromptMessage {
            role: Role::User,
            content: "ééééééééééééééééééééé".to_string(),
            name: None,
        }];
        let limited = limit_message_tokens(messages, &CharEncoder, &budget(15, 60)).unwrap();
        assert_eq!(limited[0].content.chars().count(), 1);
    }
}
