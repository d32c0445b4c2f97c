//! Catalog reconciliation
//!
//! Turns track requests into catalog URIs and merges them into the party
//! playlist without interrupting what is currently playing.

use base64::Engine;
use futures::future::join_all;

use super::{CatalogApi, CatalogError, PlaylistPosition};

/// Largest base64 cover payload the catalog accepts
pub const MAX_COVER_IMAGE_BYTES: usize = 256 * 1024;

/// Catalog URI of a playlist id
pub fn playlist_uri(playlist_id: &str) -> String {
    format!("spotify:playlist:{playlist_id}")
}

/// How `apply_playlist` changed the playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistUpdate {
    /// Playlist was playing: upcoming tracks replaced, played ones kept
    Spliced { kept: usize, removed: usize, added: usize },
    /// Playlist was not playing: every track replaced
    Replaced { added: usize },
}

/// Outcome of `start_playback`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    AlreadyPlaying,
    Resumed,
    Started,
}

/// Search each request (limit 1) and keep the hits, in request order
///
/// Misses and failed searches are dropped.
pub async fn resolve_tracks(api: &dyn CatalogApi, requests: &[String]) -> Vec<String> {
    let results = join_all(requests.iter().map(|query| api.search_track(query))).await;

    let uris: Vec<String> = requests
        .iter()
        .zip(results)
        .filter_map(|(query, result)| match result {
            Ok(Some(uri)) => Some(uri),
            Ok(None) => {
                tracing::debug!(query = %query, "No catalog match for track request");
                None
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Track search failed");
                None
            }
        })
        .collect();

    tracing::info!(requested = requests.len(), resolved = uris.len(), "Resolved track requests");
    uris
}

/// Merge `new_tracks` into the playlist
///
/// While the playlist is the playing context, everything after the current
/// track is removed by position and `new_tracks` appended. The current
/// track is its last occurrence in the playlist, so a playing track is never
/// removed. Otherwise the playlist is replaced outright.
pub async fn apply_playlist(
    api: &dyn CatalogApi,
    playlist_id: &str,
    new_tracks: &[String],
) -> Result<PlaylistUpdate, CatalogError> {
    let playback = api.get_playback().await?;
    let target_context = playlist_uri(playlist_id);

    let playing_track = playback.as_ref().and_then(|snapshot| {
        let in_context = snapshot.context_uri.as_deref() == Some(target_context.as_str());
        in_context.then(|| snapshot.track_uri()).flatten()
    });

    let Some(current_uri) = playing_track else {
        api.replace_tracks(playlist_id, new_tracks).await?;
        tracing::info!(playlist_id = %playlist_id, added = new_tracks.len(), "Replaced playlist tracks");
        return Ok(PlaylistUpdate::Replaced {
            added: new_tracks.len(),
        });
    };

    let existing = api.playlist_track_uris(playlist_id).await?;
    let kept = existing
        .iter()
        .rposition(|uri| uri == current_uri)
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let upcoming: Vec<PlaylistPosition> = existing[kept..]
        .iter()
        .enumerate()
        .map(|(offset, uri)| PlaylistPosition {
            uri: uri.clone(),
            position: kept + offset,
        })
        .collect();

    if !upcoming.is_empty() {
        api.remove_tracks_at(playlist_id, &upcoming).await?;
    }
    api.add_tracks(playlist_id, new_tracks).await?;

    tracing::info!(
        playlist_id = %playlist_id,
        kept,
        removed = upcoming.len(),
        added = new_tracks.len(),
        "Spliced playlist after current track"
    );

    Ok(PlaylistUpdate::Spliced {
        kept,
        removed: upcoming.len(),
        added: new_tracks.len(),
    })
}

/// Play the playlist unless it already is the active context
pub async fn start_playback(api: &dyn CatalogApi, playlist_id: &str) -> Result<PlaybackAction, CatalogError> {
    let context = playlist_uri(playlist_id);
    let playback = api.get_playback().await?;

    match playback {
        Some(snapshot) if snapshot.context_uri.as_deref() == Some(context.as_str()) => {
            if snapshot.is_playing {
                tracing::debug!(playlist_id = %playlist_id, "Playlist already playing");
                Ok(PlaybackAction::AlreadyPlaying)
            } else {
                api.start_playback(None).await?;
                tracing::info!(playlist_id = %playlist_id, "Resumed playlist playback");
                Ok(PlaybackAction::Resumed)
            }
        }
        _ => {
            api.start_playback(Some(&context)).await?;
            tracing::info!(playlist_id = %playlist_id, "Started playlist playback");
            Ok(PlaybackAction::Started)
        }
    }
}

/// Upload a playlist cover; failures are logged and reported as `false`
pub async fn upload_cover_image(api: &dyn CatalogApi, playlist_id: &str, jpeg_base64: &str) -> bool {
    if let Err(reason) = validate_cover_image(jpeg_base64) {
        tracing::warn!(playlist_id = %playlist_id, reason = %reason, "Skipping cover image upload");
        return false;
    }

    match api.upload_cover_image(playlist_id, jpeg_base64).await {
        Ok(()) => {
            tracing::info!(playlist_id = %playlist_id, "Uploaded playlist cover image");
            true
        }
        Err(e) => {
            tracing::warn!(playlist_id = %playlist_id, error = %e, "Cover image upload failed");
            false
        }
    }
}

fn validate_cover_image(jpeg_base64: &str) -> Result<(), String> {
    if jpeg_base64.len() > MAX_COVER_IMAGE_BYTES {
        return Err(format!(
            "cover is {} bytes, limit is {}",
            jpeg_base64.len(),
            MAX_COVER_IMAGE_BYTES
        ));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(jpeg_base64)
        .map_err(|e| format!("invalid base64: {e}"))?;
    if !bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Err("not a JPEG image".to_string());
    }
    Ok(())
}
