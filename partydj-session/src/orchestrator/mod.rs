//! Session orchestration
//!
//! Coordinates one party session: guest messages land in the log and are
//! broadcast first, then every `prompt_message_buffer` user messages of an
//! active session trigger a playlist regeneration.
//!
//! State machine: `inactive --start--> active --stop--> closed`.

mod playback;
mod regeneration;

pub use playback::{next_poll_delay, PlaybackReport};
pub use regeneration::RegenerationOutcome;

use std::sync::Arc;

use partydj_common::events::{
    session_code_from_channel, Member, SessionEventKind, SessionStatus, UserMessage,
};
use partydj_common::ids;
use tracing::{debug, info};

use crate::broadcast::{BroadcastGateway, ChannelAuth, PresenceData, PresenceInfo};
use crate::catalog::{self, CatalogProvider};
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::llm::LlmClient;
use crate::models::{NewParty, Party, PartyPlaylist, SessionMessage};
use crate::prompt::PlaylistSettings;
use crate::store::{project_for_users, KeyedLocks, PartyStore, SessionStore};
use crate::tokens::TokenEncoder;

/// Attempts at drawing an unused party code
const MAX_CODE_ATTEMPTS: usize = 10;

/// Collaborators of the orchestrator
pub struct OrchestratorParts {
    pub parties: Arc<dyn PartyStore>,
    pub sessions: SessionStore,
    pub gateway: BroadcastGateway,
    pub llm: Arc<dyn LlmClient>,
    pub catalog: Arc<dyn CatalogProvider>,
    pub encoder: Arc<dyn TokenEncoder>,
    pub settings: Arc<PlaylistSettings>,
    pub playback: PlaybackConfig,
}

/// Result of a successful `submit_message`
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub message: UserMessage,
    /// User messages in the log after the append
    pub user_message_count: usize,
    /// Set when the message landed on the regeneration cadence
    pub regeneration: Option<RegenerationOutcome>,
}

/// Top-level coordinator for party sessions
pub struct SessionOrchestrator {
    parties: Arc<dyn PartyStore>,
    sessions: SessionStore,
    gateway: BroadcastGateway,
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn CatalogProvider>,
    encoder: Arc<dyn TokenEncoder>,
    settings: Arc<PlaylistSettings>,
    playback: PlaybackConfig,
    regenerations: KeyedLocks,
}

impl SessionOrchestrator {
    pub fn new(parts: OrchestratorParts) -> Self {
        Self {
            parties: parts.parties,
            sessions: parts.sessions,
            gateway: parts.gateway,
            llm: parts.llm,
            catalog: parts.catalog,
            encoder: parts.encoder,
            settings: parts.settings,
            playback: parts.playback,
            regenerations: KeyedLocks::new(),
        }
    }

    pub fn gateway(&self) -> &BroadcastGateway {
        &self.gateway
    }

    pub fn settings(&self) -> &PlaylistSettings {
        &self.settings
    }

    /// Party for `code`, or `NotFound`
    pub async fn get_party(&self, code: &str) -> Result<Party> {
        let normalized =
            ids::normalize_party_code(code).ok_or_else(|| Error::NotFound(format!("Party {code}")))?;
        self.parties
            .get_party_by_code(&normalized)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Party {normalized}")))
    }

    async fn get_hosted_party(&self, code: &str, acting_user: &str) -> Result<Party> {
        let party = self.get_party(code).await?;
        if !party.is_host(acting_user) {
            return Err(Error::Unauthorized(format!(
                "User {acting_user} is not the host of party {}",
                party.code
            )));
        }
        Ok(party)
    }

    /// Create a party with its catalog playlist
    pub async fn create_party(&self, owner_user_id: &str, input: NewParty) -> Result<Party> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::BadRequest("Party name is required".to_string()));
        }
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let code = self.unused_party_code().await?;
        let api = self.catalog.for_host(owner_user_id).await?;
        let playlist = api.create_playlist(name, description).await?;

        if let Some(cover) = input.cover_image.as_deref() {
            catalog::upload_cover_image(api.as_ref(), &playlist.id, cover).await;
        }

        let party = Party {
            id: ids::generate(),
            code,
            owner_user_id: owner_user_id.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            playlist_id: playlist.id,
            token_spend: 0,
            status: SessionStatus::Inactive,
            created_at: partydj_common::time::now(),
        };
        self.parties.create_party(&party).await?;

        info!(session_code = %party.code, playlist_id = %party.playlist_id, "Created party");
        Ok(party)
    }

    async fn unused_party_code(&self) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = ids::generate_party_code();
            if !self.parties.code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(Error::Common(partydj_common::Error::Internal(format!(
            "No unused party code after {MAX_CODE_ATTEMPTS} attempts"
        ))))
    }

    /// Delete a party and its session log (host only)
    pub async fn delete_party(&self, code: &str, acting_user: &str) -> Result<()> {
        let party = self.get_hosted_party(code, acting_user).await?;
        self.sessions.delete(&party.code).await?;
        self.parties.delete_party(&party.id).await?;
        info!(session_code = %party.code, "Deleted party");
        Ok(())
    }

    /// Accept a guest message
    ///
    /// The message is persisted and broadcast before any regeneration runs.
    /// Regeneration failures never fail the submission.
    pub async fn submit_message(&self, code: &str, member: Member, content: &str) -> Result<SubmitOutcome> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::BadRequest("Message content is required".to_string()));
        }
        if member.name.trim().is_empty() || member.id.trim().is_empty() {
            return Err(Error::BadRequest("Member id and name are required".to_string()));
        }

        let party = self.get_party(code).await?;
        if !self.settings.budget.allows(party.token_spend) {
            return Err(Error::BudgetExceeded {
                spent: party.token_spend,
                max: self.settings.budget.max_session_tokens,
            });
        }

        let member = Member {
            is_host: party.is_host(&member.id),
            ..member
        };
        let message = SessionMessage::user(ids::generate(), content.to_string(), member);
        let visible = message.to_user_message();

        let log = self.sessions.append(&party.code, message).await?;
        self.gateway
            .publish(&party.code, SessionEventKind::Messages(project_for_users(&log)));

        let user_message_count = log.iter().filter(|m| m.is_user()).count();
        let regeneration = if party.status == SessionStatus::Active
            && self.settings.is_regeneration_due(user_message_count)
        {
            info!(session_code = %party.code, user_message_count, "Regeneration cadence reached");
            self.regenerate_contained(&party).await
        } else {
            None
        };

        let message = visible.ok_or_else(|| {
            Error::Common(partydj_common::Error::Internal("Appended message is not a user message".to_string()))
        })?;

        Ok(SubmitOutcome {
            message,
            user_message_count,
            regeneration,
        })
    }

    /// User-visible messages of a session
    pub async fn get_messages(&self, code: &str) -> Result<Vec<UserMessage>> {
        let party = self.get_party(code).await?;
        let log = self.sessions.read_log(&party.code).await?;
        Ok(project_for_users(&log))
    }

    /// Current party playlist, for re-fetching after `playlist-changed`
    pub async fn get_playlist(&self, code: &str) -> Result<PartyPlaylist> {
        let party = self.get_party(code).await?;
        let api = self.catalog.for_host(&party.owner_user_id).await?;
        Ok(api.get_playlist(&party.playlist_id).await?)
    }

    /// Start an inactive session (host only)
    ///
    /// A backlog of guest messages gets one regeneration before playback
    /// starts.
    pub async fn start_session(&self, code: &str, acting_user: &str) -> Result<SessionStatus> {
        let party = self.get_hosted_party(code, acting_user).await?;
        if party.status != SessionStatus::Inactive {
            return Err(Error::InvalidState(format!(
                "Party {} is {}, only inactive sessions can be started",
                party.code, party.status
            )));
        }

        let log = self.sessions.read_log(&party.code).await?;
        if log.iter().any(|m| m.is_user()) {
            info!(session_code = %party.code, "Regenerating playlist from message backlog");
            self.regenerate_contained(&party).await;
        }

        let api = self.catalog.for_host(&party.owner_user_id).await?;
        catalog::start_playback(api.as_ref(), &party.playlist_id).await?;

        self.parties
            .set_session_status(&party.id, SessionStatus::Active)
            .await?;
        self.gateway
            .publish(&party.code, SessionEventKind::Status(SessionStatus::Active));

        info!(session_code = %party.code, "Session started");
        Ok(SessionStatus::Active)
    }

    /// Sign presence metadata for a member joining a session channel
    ///
    /// The host flag comes from party ownership, not from the client.
    pub async fn authorize_presence(
        &self,
        socket_id: &str,
        channel: &str,
        user_id: &str,
        user_name: &str,
    ) -> Result<ChannelAuth> {
        let code = session_code_from_channel(channel)
            .ok_or_else(|| Error::BadRequest(format!("Invalid channel: {channel}")))?;
        let party = self.get_party(code).await?;
        let presence = PresenceData {
            user_id: user_id.to_string(),
            user_info: PresenceInfo {
                user_name: user_name.to_string(),
                is_host: party.is_host(user_id),
            },
        };
        self.gateway
            .authorize_subscriber(socket_id, channel, &presence)
            .await
    }

    /// Close a session (host only, idempotent)
    pub async fn stop_session(&self, code: &str, acting_user: &str) -> Result<SessionStatus> {
        let party = self.get_hosted_party(code, acting_user).await?;
        if party.status == SessionStatus::Closed {
            debug!(session_code = %party.code, "Session already closed");
        }

        self.gateway
            .publish(&party.code, SessionEventKind::Status(SessionStatus::Closed));
        self.parties
            .set_session_status(&party.id, SessionStatus::Closed)
            .await?;

        info!(session_code = %party.code, "Session closed");
        Ok(SessionStatus::Closed)
    }
}
