//! Session types carried by events
//!
//! These are the only shapes that ever leave the service towards
//! untrusted clients.

use serde::{Deserialize, Serialize};

/// Participant in a session (host or guest)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Member id (stable for one client)
    pub id: String,
    /// Display name (not guaranteed unique)
    pub name: String,
    /// Whether this member hosts the party
    pub is_host: bool,
}

/// Message as it is returned to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Message id, generated on submission
    pub id: String,
    /// Free-text content
    pub content: String,
    /// Author of the message
    pub member: Member,
}

/// Lifecycle status of a party session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, not started by the host yet
    Inactive,
    /// Running, messages drive playlist regeneration
    Active,
    /// Ended by the host (terminal)
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Inactive => "inactive",
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inactive" => Some(SessionStatus::Inactive),
            "active" => Some(SessionStatus::Active),
            "closed" => Some(SessionStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artwork reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Catalog track metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Catalog id
    pub id: String,
    /// Catalog URI (e.g. `spotify:track:...`)
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub images: Vec<ImageInfo>,
}

/// Now-playing snapshot (ephemeral, never persisted)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    /// Currently playing track
    pub track: Option<TrackInfo>,
    /// Playback context (playlist) URI
    pub context_uri: Option<String>,
    /// Progress into the current track
    pub progress_ms: Option<u64>,
    /// Whether the device is playing (not paused)
    pub is_playing: bool,
    /// Catalog-reported wall-clock timestamp (Unix ms)
    pub timestamp: i64,
}

impl PlaybackSnapshot {
    /// URI of the currently playing track, if any
    pub fn track_uri(&self) -> Option<&str> {
        self.track.as_ref().map(|t| t.uri.as_str())
    }
}
