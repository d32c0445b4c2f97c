//! Broadcast gateway
//!
//! Publishes session events on the process-wide `EventBus` and hands out
//! per-session subscriptions. `publish` returns once the event is queued
//! for every current subscriber.

use std::sync::Arc;

use futures::stream::{Stream, StreamExt};
use partydj_common::events::{
    presence_channel, session_code_from_channel, EventBus, PlaybackSnapshot, SessionEvent,
    SessionEventKind, SessionStatus, Topic, UserMessage,
};
use partydj_common::ids::normalize_party_code;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use super::presence::{is_valid_socket_id, ChannelAuth, PresenceData, PresenceSigner};
use crate::error::{Error, Result};
use crate::store::PartyStore;

/// Publishes session events and authorizes presence subscriptions
#[derive(Clone)]
pub struct BroadcastGateway {
    bus: EventBus,
    signer: PresenceSigner,
    parties: Arc<dyn PartyStore>,
}

impl BroadcastGateway {
    pub fn new(bus: EventBus, signer: PresenceSigner, parties: Arc<dyn PartyStore>) -> Self {
        Self { bus, signer, parties }
    }

    /// Publish `kind` to every subscriber of `session_code`
    ///
    /// Returns the number of subscribers the event was queued for. Having
    /// no subscribers is not an error.
    pub fn publish(&self, session_code: &str, kind: SessionEventKind) -> usize {
        let topic = kind.topic();
        let event = SessionEvent::new(session_code, kind);
        match self.bus.emit(event) {
            Ok(count) => {
                debug!(session_code = %session_code, topic = topic.as_str(), subscribers = count, "Published session event");
                count
            }
            Err(_) => {
                debug!(session_code = %session_code, topic = topic.as_str(), "No subscribers for session event");
                0
            }
        }
    }

    /// Subscribe to all events of `session_code`
    pub fn subscribe(&self, session_code: &str) -> SessionSubscription {
        SessionSubscription {
            channel: presence_channel(session_code),
            receiver: self.bus.subscribe(),
        }
    }

    /// Sign presence metadata for a subscriber of `channel`
    ///
    /// The channel must name an existing session. This tracks members; it
    /// does not gate access to session data.
    pub async fn authorize_subscriber(
        &self,
        socket_id: &str,
        channel: &str,
        presence: &PresenceData,
    ) -> Result<ChannelAuth> {
        if !is_valid_socket_id(socket_id) {
            return Err(Error::BadRequest(format!("Invalid socket id: {socket_id}")));
        }
        if presence.user_info.user_name.trim().is_empty() {
            return Err(Error::BadRequest("User name is required".to_string()));
        }
        if presence.user_id.trim().is_empty() {
            return Err(Error::BadRequest("User id is required".to_string()));
        }

        let code = session_code_from_channel(channel)
            .and_then(normalize_party_code)
            .ok_or_else(|| Error::BadRequest(format!("Invalid channel: {channel}")))?;

        if !self.parties.code_exists(&code).await? {
            return Err(Error::NotFound(format!("Party {code}")));
        }

        let auth = self.signer.sign(socket_id, channel, presence)?;
        info!(session_code = %code, user_id = %presence.user_id, "Authorized presence subscriber");
        Ok(auth)
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

/// Events of one session, from one underlying bus receiver
///
/// Each typed accessor consumes the subscription; subscribe once per
/// stream needed.
pub struct SessionSubscription {
    channel: String,
    receiver: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// All events of the session
    pub fn events(self) -> impl Stream<Item = SessionEvent> + Send + 'static {
        let channel = self.channel;
        BroadcastStream::new(self.receiver).filter_map(move |result| {
            let event = match result {
                Ok(event) if event.channel == channel => Some(event),
                Ok(_) => None,
                Err(e) => {
                    warn!(channel = %channel, "Session subscriber error: {:?}", e);
                    None
                }
            };
            futures::future::ready(event)
        })
    }

    /// Events of the session restricted to `topics`
    pub fn topics(self, topics: Vec<Topic>) -> impl Stream<Item = SessionEvent> + Send + 'static {
        self.events()
            .filter(move |event| futures::future::ready(topics.contains(&event.topic())))
    }

    /// User-visible message lists
    pub fn messages(self) -> impl Stream<Item = Vec<UserMessage>> + Send + 'static {
        self.events().filter_map(|event| {
            futures::future::ready(match event.kind {
                SessionEventKind::Messages(messages) => Some(messages),
                _ => None,
            })
        })
    }

    /// Playlist-changed signals (re-fetch the playlist on each)
    pub fn playlist_changed(self) -> impl Stream<Item = ()> + Send + 'static {
        self.events().filter_map(|event| {
            futures::future::ready(matches!(event.kind, SessionEventKind::PlaylistChanged).then_some(()))
        })
    }

    /// Session lifecycle changes
    pub fn status(self) -> impl Stream<Item = SessionStatus> + Send + 'static {
        self.events().filter_map(|event| {
            futures::future::ready(match event.kind {
                SessionEventKind::Status(status) => Some(status),
                _ => None,
            })
        })
    }

    /// Now-playing snapshots
    pub fn playback(self) -> impl Stream<Item = Option<PlaybackSnapshot>> + Send + 'static {
        self.events().filter_map(|event| {
            futures::future::ready(match event.kind {
                SessionEventKind::Playback(snapshot) => Some(snapshot),
                _ => None,
            })
        })
    }
}
