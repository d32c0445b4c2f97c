//! Music catalog and playback
//!
//! `CatalogApi` is the per-host view of the catalog (search, playlist
//! mutation, playback). `CatalogProvider` hands out one per host.
//! `reconciler` holds the track resolution and playlist merge logic on top
//! of it.

pub mod reconciler;
pub mod retry;
pub mod spotify;

pub use reconciler::{
    apply_playlist, playlist_uri, resolve_tracks, start_playback, upload_cover_image, PlaybackAction,
    PlaylistUpdate,
};
pub use retry::with_auth_retry;
pub use spotify::{SpotifyClient, SpotifyProvider};

use async_trait::async_trait;
use partydj_common::events::PlaybackSnapshot;
use std::sync::Arc;
use thiserror::Error;

use crate::models::PartyPlaylist;

/// Maximum URIs per playlist mutation request
pub const MAX_URIS_PER_REQUEST: usize = 100;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Access token rejected (retried once after refresh)
    #[error("Unauthorized")]
    Unauthorized,

    #[error("No catalog credentials for user {0}")]
    NoCredentials(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Newly created catalog playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPlaylist {
    pub id: String,
    pub uri: String,
}

/// One playlist item, addressed by URI and zero-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistPosition {
    pub uri: String,
    pub position: usize,
}

/// Catalog operations on behalf of one host
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// URI of the best match for a free-text query
    async fn search_track(&self, query: &str) -> Result<Option<String>, CatalogError>;

    /// Current playback, `None` when nothing is playing
    async fn get_playback(&self) -> Result<Option<PlaybackSnapshot>, CatalogError>;

    /// Track URIs of a playlist, in order
    async fn playlist_track_uris(&self, playlist_id: &str) -> Result<Vec<String>, CatalogError>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError>;

    /// Remove the items at the given positions (other copies of a URI stay)
    async fn remove_tracks_at(&self, playlist_id: &str, items: &[PlaylistPosition]) -> Result<(), CatalogError>;

    async fn replace_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<(), CatalogError>;

    /// Start `context_uri`, or resume the current context when `None`
    async fn start_playback(&self, context_uri: Option<&str>) -> Result<(), CatalogError>;

    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CreatedPlaylist, CatalogError>;

    async fn get_playlist(&self, playlist_id: &str) -> Result<PartyPlaylist, CatalogError>;

    /// Upload a base64-encoded JPEG as the playlist cover
    async fn upload_cover_image(&self, playlist_id: &str, jpeg_base64: &str) -> Result<(), CatalogError>;
}

/// Resolves the catalog client of a host
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn for_host(&self, host_user_id: &str) -> crate::error::Result<Arc<dyn CatalogApi>>;
}
