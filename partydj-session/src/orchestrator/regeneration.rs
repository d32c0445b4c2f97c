//! Playlist regeneration pipeline
//!
//! log -> prompt -> completion -> token spend -> assistant message ->
//! track requests -> catalog URIs -> playlist -> `playlist-changed`.

use partydj_common::events::SessionEventKind;
use tracing::{error, info, warn};

use super::SessionOrchestrator;
use crate::catalog::{self, PlaylistUpdate};
use crate::error::Result;
use crate::llm::CompletionRequest;
use crate::models::{Party, SessionMessage};
use crate::prompt::{build_prompt, parse_completion};
use crate::tokens::prompt_token_count;

/// What a regeneration attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerationOutcome {
    /// Another regeneration for the session was already running
    Skipped,
    /// The completion carried no playlist
    NoPlaylist { tokens_used: u64 },
    /// No track request resolved; the playlist was left as is
    NothingResolved { tokens_used: u64, requested: usize },
    Updated {
        tokens_used: u64,
        requested: usize,
        resolved: usize,
        update: PlaylistUpdate,
    },
}

impl SessionOrchestrator {
    /// Regenerate, logging failures instead of returning them
    pub(super) async fn regenerate_contained(&self, party: &Party) -> Option<RegenerationOutcome> {
        match self.regenerate(party).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(session_code = %party.code, error = %e, "Playlist regeneration failed");
                None
            }
        }
    }

    /// Run one regeneration for `party`
    ///
    /// At most one regeneration per session runs at a time; a trigger that
    /// arrives meanwhile is skipped and its messages are picked up by the
    /// next cadence trigger.
    pub async fn regenerate(&self, party: &Party) -> Result<RegenerationOutcome> {
        let Some(_guard) = self.regenerations.try_lock(&party.code).await else {
            info!(session_code = %party.code, "Regeneration already running, skipping trigger");
            return Ok(RegenerationOutcome::Skipped);
        };

        let log = self.sessions.read_log(&party.code).await?;
        let messages = build_prompt(&log, &self.settings, self.encoder.as_ref())?;
        let estimated_prompt_tokens = prompt_token_count(self.encoder.as_ref(), &messages) as u64;

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages,
            max_tokens: self.settings.budget.max_playlist_tokens,
        };
        let completion = self.llm.complete(&request).await?;
        let usage = completion.usage;

        if usage.prompt_tokens != estimated_prompt_tokens {
            warn!(
                session_code = %party.code,
                estimated = estimated_prompt_tokens,
                reported = usage.prompt_tokens,
                "Estimated prompt token count differs from reported count"
            );
        }

        let token_spend = self
            .parties
            .increment_token_spend(&party.id, usage.total_tokens)
            .await?;
        info!(
            session_code = %party.code,
            tokens = usage.total_tokens,
            token_spend,
            max = self.settings.budget.max_session_tokens,
            "Recorded completion token usage"
        );

        self.sessions
            .append(
                &party.code,
                SessionMessage::Assistant {
                    content: completion.content.clone(),
                },
            )
            .await?;

        let prompt = &self.settings.prompt;
        let requests = parse_completion(&completion.content, &prompt.playlist_sentinel, &prompt.track_delimiter);
        if requests.is_empty() {
            info!(session_code = %party.code, "Completion contained no playlist");
            return Ok(RegenerationOutcome::NoPlaylist {
                tokens_used: usage.total_tokens,
            });
        }

        let api = self.catalog.for_host(&party.owner_user_id).await?;
        let uris = catalog::resolve_tracks(api.as_ref(), &requests).await;
        if uris.is_empty() {
            warn!(session_code = %party.code, requested = requests.len(), "No track request resolved, keeping playlist");
            return Ok(RegenerationOutcome::NothingResolved {
                tokens_used: usage.total_tokens,
                requested: requests.len(),
            });
        }

        let update = catalog::apply_playlist(api.as_ref(), &party.playlist_id, &uris).await?;
        self.gateway
            .publish(&party.code, SessionEventKind::PlaylistChanged);

        Ok(RegenerationOutcome::Updated {
            tokens_used: usage.total_tokens,
            requested: requests.len(),
            resolved: uris.len(),
            update,
        })
    }
}
