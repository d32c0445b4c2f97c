//! Event types for the PartyDJ event system
//!
//! Provides session event definitions and the EventBus used to fan out
//! session state changes to subscribed clients.

mod session_types;

pub use session_types::{
    ImageInfo, Member, PlaybackSnapshot, SessionStatus, TrackInfo, UserMessage,
};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Prefix of the presence channel derived from a session code
pub const PRESENCE_CHANNEL_PREFIX: &str = "presence-cache-";

/// Build the presence channel name for a session code
pub fn presence_channel(session_code: &str) -> String {
    format!("{}{}", PRESENCE_CHANNEL_PREFIX, session_code)
}

/// Extract the session code from a presence channel name
pub fn session_code_from_channel(channel: &str) -> Option<&str> {
    channel
        .strip_prefix(PRESENCE_CHANNEL_PREFIX)
        .filter(|code| !code.is_empty())
}

/// Subscription topics, one per event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Messages,
    PlaylistChanged,
    Status,
    Playback,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Messages,
        Topic::PlaylistChanged,
        Topic::Status,
        Topic::Playback,
    ];

    /// Wire name of the topic (SSE event field)
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Messages => "messages",
            Topic::PlaylistChanged => "playlist-changed",
            Topic::Status => "status",
            Topic::Playback => "playback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Topic::ALL.into_iter().find(|t| t.as_str() == value.trim())
    }
}

/// Session event payloads
///
/// `PlaylistChanged` intentionally carries no playlist body: playlists
/// regularly exceed the per-event size ceiling of push transports, so
/// subscribers re-fetch the playlist themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum SessionEventKind {
    /// Full user-visible message list
    Messages(Vec<UserMessage>),
    /// Signal only
    PlaylistChanged,
    /// New lifecycle status
    Status(SessionStatus),
    /// Now-playing snapshot (None when nothing is playing)
    Playback(Option<PlaybackSnapshot>),
}

impl SessionEventKind {
    pub fn topic(&self) -> Topic {
        match self {
            SessionEventKind::Messages(_) => Topic::Messages,
            SessionEventKind::PlaylistChanged => Topic::PlaylistChanged,
            SessionEventKind::Status(_) => Topic::Status,
            SessionEventKind::Playback(_) => Topic::Playback,
        }
    }
}

/// Event published on one session's presence channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Channel name (`presence-cache-<code>`)
    pub channel: String,
    #[serde(flatten)]
    pub kind: SessionEventKind,
    /// When the event was published
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl SessionEvent {
    pub fn new(session_code: &str, kind: SessionEventKind) -> Self {
        Self {
            channel: presence_channel(session_code),
            kind,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn topic(&self) -> Topic {
        self.kind.topic()
    }

    /// Session code this event belongs to
    pub fn session_code(&self) -> Option<&str> {
        session_code_from_channel(&self.channel)
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use partydj_common::events::{EventBus, SessionEvent, SessionEventKind, SessionStatus};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SessionEvent::new(
///     "AB12CD",
///     SessionEventKind::Status(SessionStatus::Active),
/// ));
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.session_code(), Some("AB12CD"));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers
    ///   start dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_channel_round_trip() {
        let channel = presence_channel("AB12CD");
        assert_eq!(channel, "presence-cache-AB12CD");
        assert_eq!(session_code_from_channel(&channel), Some("AB12CD"));
        assert_eq!(session_code_from_channel("private-AB12CD"), None);
        assert_eq!(session_code_from_channel("presence-cache-"), None);
    }

    #[test]
    fn test_topic_names() {
        assert_eq!(Topic::PlaylistChanged.as_str(), "playlist-changed");
        assert_eq!(Topic::parse(" status"), Some(Topic::Status));
        assert_eq!(Topic::parse("members"), None);
    }

    #[test]
    fn test_playlist_changed_serializes_without_payload() {
        let event = SessionEvent::new("AB12CD", SessionEventKind::PlaylistChanged);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "playlist-changed");
        assert!(json.get("data").is_none());
        assert_eq!(json["channel"], "presence-cache-AB12CD");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let event = SessionEvent::new("AB12CD", SessionEventKind::Status(SessionStatus::Closed));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["data"], "closed");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        let event = SessionEvent::new("AB12CD", SessionEventKind::PlaylistChanged);
        assert!(bus.emit(event.clone()).is_err());
        bus.emit_lossy(event);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 10);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::new("AB12CD", SessionEventKind::Messages(Vec::new())))
            .unwrap();
        bus.emit(SessionEvent::new("AB12CD", SessionEventKind::PlaylistChanged))
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().topic(), Topic::Messages);
        assert_eq!(rx.recv().await.unwrap().topic(), Topic::PlaylistChanged);
    }
}
