//! Domain models for party sessions

use chrono::{DateTime, Utc};
use partydj_common::events::{ImageInfo, Member, SessionStatus, TrackInfo, UserMessage};
use serde::{Deserialize, Serialize};

/// Chat role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message of a language-model prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
    /// Attribution name (user messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
        }
    }
}

/// Entry of a session's message log
///
/// The log is append-only: entries are never mutated after append. Only
/// `User` entries are ever shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum SessionMessage {
    System {
        content: String,
    },
    User {
        id: String,
        content: String,
        member: Member,
    },
    /// A generated playlist, kept as context for later prompts
    Assistant {
        content: String,
    },
}

impl SessionMessage {
    pub fn user(id: String, content: String, member: Member) -> Self {
        SessionMessage::User { id, content, member }
    }

    pub fn role(&self) -> Role {
        match self {
            SessionMessage::System { .. } => Role::System,
            SessionMessage::User { .. } => Role::User,
            SessionMessage::Assistant { .. } => Role::Assistant,
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, SessionMessage::User { .. })
    }

    pub fn content(&self) -> &str {
        match self {
            SessionMessage::System { content }
            | SessionMessage::User { content, .. }
            | SessionMessage::Assistant { content } => content,
        }
    }

    /// Client-visible form of a user entry
    pub fn to_user_message(&self) -> Option<UserMessage> {
        match self {
            SessionMessage::User { id, content, member } => Some(UserMessage {
                id: id.clone(),
                content: content.clone(),
                member: member.clone(),
            }),
            _ => None,
        }
    }

    /// Prompt form of this entry
    pub fn to_prompt(&self) -> PromptMessage {
        let name = match self {
            SessionMessage::User { member, .. } => prompt_name(&member.name),
            _ => None,
        };
        PromptMessage {
            role: self.role(),
            content: self.content().to_string(),
            name,
        }
    }
}

/// Maximum length of a prompt attribution name
const MAX_PROMPT_NAME_LEN: usize = 64;

/// Derive a prompt attribution name from a display name
///
/// Chat APIs only accept `[A-Za-z0-9_-]{1,64}`; other characters become `_`.
pub fn prompt_name(display_name: &str) -> Option<String> {
    let name: String = display_name
        .trim()
        .chars()
        .take(MAX_PROMPT_NAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    (!name.is_empty()).then_some(name)
}

/// Durable party record (relational store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    /// Six-character session code
    pub code: String,
    pub owner_user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Catalog playlist, created once at party creation
    pub playlist_id: String,
    /// Cumulative language-model tokens spent
    pub token_spend: u64,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl Party {
    pub fn is_host(&self, user_id: &str) -> bool {
        self.owner_user_id == user_id
    }
}

/// Input for creating a party
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParty {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Base64-encoded JPEG for the playlist cover
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Party playlist as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyPlaylist {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub images: Vec<ImageInfo>,
    pub tracks: Vec<TrackInfo>,
}
