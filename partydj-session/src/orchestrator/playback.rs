//! Now-playing reporting

use partydj_common::events::{PlaybackSnapshot, SessionEventKind, SessionStatus};
use serde::Serialize;
use tracing::debug;

use super::SessionOrchestrator;
use crate::catalog::playlist_uri;
use crate::config::PlaybackConfig;
use crate::error::Result;

/// Result of one host playback report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackReport {
    /// Whether the session is active
    pub active: bool,
    /// Snapshot published to subscribers (None when the party playlist is not playing)
    pub snapshot: Option<PlaybackSnapshot>,
    /// Suggested delay before the next report
    pub next_poll_ms: Option<u64>,
}

/// Delay until the host should report playback again
///
/// While a track plays this is the remaining track time plus a settle
/// offset, otherwise the fallback interval.
pub fn next_poll_delay(snapshot: Option<&PlaybackSnapshot>, config: &PlaybackConfig) -> u64 {
    let Some(snapshot) = snapshot.filter(|s| s.is_playing) else {
        return config.fallback_poll_interval_ms;
    };
    match (snapshot.track.as_ref(), snapshot.progress_ms) {
        (Some(track), Some(progress)) => {
            track.duration_ms.saturating_sub(progress) + config.settle_offset_ms
        }
        _ => config.fallback_poll_interval_ms,
    }
}

impl SessionOrchestrator {
    /// Fetch the host's playback state and publish it to the session (host only)
    pub async fn report_playback(&self, code: &str, acting_user: &str) -> Result<PlaybackReport> {
        let party = self.get_hosted_party(code, acting_user).await?;
        if party.status != SessionStatus::Active {
            return Ok(PlaybackReport {
                active: false,
                snapshot: None,
                next_poll_ms: None,
            });
        }

        let api = self.catalog.for_host(&party.owner_user_id).await?;
        let context = playlist_uri(&party.playlist_id);
        let snapshot = api
            .get_playback()
            .await?
            .filter(|s| s.context_uri.as_deref() == Some(context.as_str()));

        let next_poll_ms = next_poll_delay(snapshot.as_ref(), &self.playback);
        debug!(
            session_code = %party.code,
            track = snapshot.as_ref().and_then(|s| s.track_uri()).unwrap_or("-"),
            next_poll_ms,
            "Publishing playback"
        );
        self.gateway
            .publish(&party.code, SessionEventKind::Playback(snapshot.clone()));

        Ok(PlaybackReport {
            active: true,
            snapshot,
            next_poll_ms: Some(next_poll_ms),
        })
    }
}
