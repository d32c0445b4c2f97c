//! Spotify Web API client
//!
//! Two kinds of credentials are involved:
//! - a server token (client-credentials flow) for catalog search, cached
//!   until shortly before it expires
//! - the host's user token (refresh-token flow) for playlist and playback
//!   calls, refreshed whenever the API answers 401
//!
//! Every call goes through `with_auth_retry`.

use async_trait::async_trait;
use partydj_common::events::{ImageInfo, PlaybackSnapshot, TrackInfo};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use super::{
    with_auth_retry, CatalogApi, CatalogError, CatalogProvider, CreatedPlaylist, PlaylistPosition,
    MAX_URIS_PER_REQUEST,
};
use crate::config::SpotifyConfig;
use crate::error::{Error, Result};
use crate::models::PartyPlaylist;
use crate::store::{HostCredentials, PartyStore};

const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Server tokens are treated as expired this long before they really are
const TOKEN_EXPIRY_BUFFER_SECS: u64 = 600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<Paging<TrackUri>>,
}

#[derive(Debug, Deserialize)]
struct TrackUri {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistUriItem {
    track: Option<TrackUri>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    #[serde(default)]
    id: Option<String>,
    uri: String,
    name: String,
    #[serde(default)]
    duration_ms: u64,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    #[serde(default)]
    album: Option<SpotifyAlbum>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct PlaybackContext {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct PlaybackResponse {
    timestamp: i64,
    progress_ms: Option<u64>,
    is_playing: bool,
    item: Option<SpotifyTrack>,
    context: Option<PlaybackContext>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    id: String,
    uri: String,
    name: String,
    description: Option<String>,
    #[serde(default)]
    images: Option<Vec<SpotifyImage>>,
    tracks: Paging<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylistResponse {
    id: String,
    uri: String,
}

fn image_info(image: SpotifyImage) -> ImageInfo {
    ImageInfo {
        url: image.url,
        width: image.width,
        height: image.height,
    }
}

fn track_info(track: SpotifyTrack) -> TrackInfo {
    TrackInfo {
        id: track.id.unwrap_or_default(),
        uri: track.uri,
        name: track.name,
        artists: track.artists.into_iter().map(|a| a.name).collect(),
        duration_ms: track.duration_ms,
        images: track
            .album
            .map(|album| album.images.into_iter().map(image_info).collect())
            .unwrap_or_default(),
    }
}

fn playback_snapshot(playback: PlaybackResponse) -> PlaybackSnapshot {
    PlaybackSnapshot {
        track: playback.item.map(track_info),
        context_uri: playback.context.map(|c| c.uri),
        progress_ms: playback.progress_ms,
        is_playing: playback.is_playing,
        timestamp: playback.timestamp,
    }
}

fn network_error(e: reqwest::Error) -> CatalogError {
    CatalogError::Network(e.to_string())
}

async fn check_status(response: Response) -> std::result::Result<Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(CatalogError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CatalogError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> std::result::Result<T, CatalogError> {
    response
        .json()
        .await
        .map_err(|e| CatalogError::Parse(e.to_string()))
}

struct ServerToken {
    token: String,
    expires_at: Instant,
}

/// State shared by the provider and every per-host client
struct SpotifyShared {
    http: Client,
    api_base_url: String,
    accounts_base_url: String,
    client_id: String,
    client_secret: String,
    server_token: Mutex<Option<ServerToken>>,
}

impl SpotifyShared {
    async fn token_request(&self, form: &[(&str, &str)]) -> std::result::Result<TokenResponse, CatalogError> {
        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(network_error)?;
        parse_json(check_status(response).await?).await
    }

    /// Valid server token, fetched via client credentials when expired
    async fn server_access_token(&self) -> std::result::Result<String, CatalogError> {
        let mut cached = self.server_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let response = self.token_request(&[("grant_type", "client_credentials")]).await?;
        if response.expires_in <= TOKEN_EXPIRY_BUFFER_SECS {
            return Err(CatalogError::Parse(format!(
                "Server token expires in {} s, within the {} s refresh buffer",
                response.expires_in, TOKEN_EXPIRY_BUFFER_SECS
            )));
        }

        let expires_at =
            Instant::now() + Duration::from_secs(response.expires_in - TOKEN_EXPIRY_BUFFER_SECS);
        tracing::debug!(expires_in = response.expires_in, "Fetched catalog server token");
        *cached = Some(ServerToken {
            token: response.access_token.clone(),
            expires_at,
        });
        Ok(response.access_token)
    }

    async fn invalidate_server_token(&self) -> std::result::Result<(), CatalogError> {
        *self.server_token.lock().await = None;
        Ok(())
    }

    async fn send_server<B>(&self, build: &B) -> std::result::Result<Response, CatalogError>
    where
        B: Fn(&Client) -> RequestBuilder + Sync,
    {
        let token = self.server_access_token().await?;
        let response = build(&self.http)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await
    }

    async fn server_request<B>(&self, build: B) -> std::result::Result<Response, CatalogError>
    where
        B: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let build = &build;
        with_auth_retry(move || self.send_server(build), move || self.invalidate_server_token()).await
    }
}

/// Hands out per-host Spotify clients
pub struct SpotifyProvider {
    shared: Arc<SpotifyShared>,
    parties: Arc<dyn PartyStore>,
}

impl SpotifyProvider {
    pub fn new(config: &SpotifyConfig, parties: Arc<dyn PartyStore>) -> Result<Self> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret) else {
            return Err(Error::Config("Missing Spotify client credentials".to_string()));
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Catalog(network_error(e)))?;

        Ok(Self {
            shared: Arc::new(SpotifyShared {
                http,
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                accounts_base_url: config.accounts_base_url.trim_end_matches('/').to_string(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                server_token: Mutex::new(None),
            }),
            parties,
        })
    }
}

#[async_trait]
impl CatalogProvider for SpotifyProvider {
    async fn for_host(&self, host_user_id: &str) -> Result<Arc<dyn CatalogApi>> {
        let credentials = self
            .parties
            .get_host_credentials(host_user_id)
            .await?
            .ok_or_else(|| CatalogError::NoCredentials(host_user_id.to_string()))?;

        Ok(Arc::new(SpotifyClient {
            shared: self.shared.clone(),
            parties: self.parties.clone(),
            user_id: credentials.user_id,
            refresh_token: RwLock::new(credentials.refresh_token),
            access_token: RwLock::new(credentials.access_token),
        }))
    }
}

/// Spotify client acting for one host
pub struct SpotifyClient {
    shared: Arc<SpotifyShared>,
    parties: Arc<dyn PartyStore>,
    user_id: String,
    refresh_token: RwLock<String>,
    access_token: RwLock<Option<String>>,
}

impl SpotifyClient {
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.shared.api_base_url, path)
    }

    async fn user_token(&self) -> std::result::Result<String, CatalogError> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        self.refresh_access_token().await?;
        self.access_token
            .read()
            .await
            .clone()
            .ok_or(CatalogError::Unauthorized)
    }

    /// Exchange the refresh token for a new access token and persist both
    async fn refresh_access_token(&self) -> std::result::Result<(), CatalogError> {
        let refresh_token = self.refresh_token.read().await.clone();
        let response = self
            .shared
            .token_request(&[("grant_type", "refresh_token"), ("refresh_token", &refresh_token)])
            .await?;

        *self.access_token.write().await = Some(response.access_token.clone());
        let refresh_token = match response.refresh_token {
            Some(rotated) => {
                *self.refresh_token.write().await = rotated.clone();
                rotated
            }
            None => refresh_token,
        };

        tracing::debug!(user_id = %self.user_id, "Refreshed catalog access token");

        let credentials = HostCredentials {
            user_id: self.user_id.clone(),
            refresh_token,
            access_token: Some(response.access_token),
        };
        if let Err(e) = self.parties.save_host_credentials(&credentials).await {
            tracing::warn!(user_id = %self.user_id, error = %e, "Failed to persist refreshed catalog token");
        }
        Ok(())
    }

    async fn send_user<B>(&self, build: &B) -> std::result::Result<Response, CatalogError>
    where
        B: Fn(&Client) -> RequestBuilder + Sync,
    {
        let token = self.user_token().await?;
        let response = build(&self.shared.http)
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await
    }

    async fn user_request<B>(&self, build: B) -> std::result::Result<Response, CatalogError>
    where
        B: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let build = &build;
        with_auth_retry(move || self.send_user(build), move || self.refresh_access_token()).await
    }

    async fn user_json<T, B>(&self, build: B) -> std::result::Result<T, CatalogError>
    where
        T: DeserializeOwned,
        B: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        parse_json(self.user_request(build).await?).await
    }
}

#[async_trait]
impl CatalogApi for SpotifyClient {
    async fn search_track(&self, query: &str) -> std::result::Result<Option<String>, CatalogError> {
        let url = self.api_url("/search");
        let response = self
            .shared
            .server_request(|http| {
                http.get(&url)
                    .query(&[("q", query), ("type", "track"), ("limit", "1")])
            })
            .await?;
        let result: SearchResponse = parse_json(response).await?;
        Ok(result
            .tracks
            .and_then(|page| page.items.into_iter().next())
            .and_then(|track| track.uri))
    }

    async fn get_playback(&self) -> std::result::Result<Option<PlaybackSnapshot>, CatalogError> {
        let url = self.api_url("/me/player");
        let response = self.user_request(|http| http.get(&url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let playback: PlaybackResponse = parse_json(response).await?;
        Ok(Some(playback_snapshot(playback)))
    }

    async fn playlist_track_uris(&self, playlist_id: &str) -> std::result::Result<Vec<String>, CatalogError> {
        let mut uris = Vec::new();
        let mut next = Some(format!(
            "{}?fields=items(track(uri)),next&limit=100",
            self.api_url(&format!("/playlists/{playlist_id}/tracks"))
        ));
        while let Some(url) = next {
            let page: Paging<PlaylistUriItem> = self.user_json(|http| http.get(&url)).await?;
            uris.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track.and_then(|t| t.uri)),
            );
            next = page.next;
        }
        Ok(uris)
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> std::result::Result<(), CatalogError> {
        let url = self.api_url(&format!("/playlists/{playlist_id}/tracks"));
        for chunk in uris.chunks(MAX_URIS_PER_REQUEST) {
            let body = json!({ "uris": chunk });
            self.user_request(|http| http.post(&url).json(&body)).await?;
        }
        Ok(())
    }

    async fn remove_tracks_at(
        &self,
        playlist_id: &str,
        items: &[PlaylistPosition],
    ) -> std::result::Result<(), CatalogError> {
        let url = self.api_url(&format!("/playlists/{playlist_id}/tracks"));
        for body in removal_bodies(items) {
            self.user_request(|http| http.delete(&url).json(&body)).await?;
        }
        Ok(())
    }

    async fn replace_tracks(&self, playlist_id: &str, uris: &[String]) -> std::result::Result<(), CatalogError> {
        let url = self.api_url(&format!("/playlists/{playlist_id}/tracks"));
        let split = uris.len().min(MAX_URIS_PER_REQUEST);
        let (first, rest) = uris.split_at(split);

        let body = json!({ "uris": first });
        self.user_request(|http| http.put(&url).json(&body)).await?;
        self.add_tracks(playlist_id, rest).await
    }

    async fn start_playback(&self, context_uri: Option<&str>) -> std::result::Result<(), CatalogError> {
        let url = self.api_url("/me/player/play");
        let body = context_uri.map(|uri| json!({ "context_uri": uri }));
        self.user_request(|http| match &body {
            Some(body) => http.put(&url).json(body),
            None => http.put(&url),
        })
        .await?;
        Ok(())
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> std::result::Result<CreatedPlaylist, CatalogError> {
        let url = self.api_url("/me/playlists");
        let body = json!({
            "name": name,
            "description": description.unwrap_or_default(),
            "public": true,
        });
        let created: CreatedPlaylistResponse = self.user_json(|http| http.post(&url).json(&body)).await?;
        tracing::info!(playlist_id = %created.id, "Created catalog playlist");
        Ok(CreatedPlaylist {
            id: created.id,
            uri: created.uri,
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> std::result::Result<PartyPlaylist, CatalogError> {
        let url = self.api_url(&format!("/playlists/{playlist_id}"));
        let playlist: PlaylistResponse = self.user_json(|http| http.get(&url)).await?;

        let mut items = playlist.tracks.items;
        let mut next = playlist.tracks.next;
        while let Some(url) = next {
            let page: Paging<PlaylistItem> = self.user_json(|http| http.get(&url)).await?;
            items.extend(page.items);
            next = page.next;
        }

        Ok(PartyPlaylist {
            id: playlist.id,
            uri: playlist.uri,
            name: playlist.name,
            description: playlist.description,
            images: playlist
                .images
                .unwrap_or_default()
                .into_iter()
                .map(image_info)
                .collect(),
            tracks: items
                .into_iter()
                .filter_map(|item| item.track.map(track_info))
                .collect(),
        })
    }

    async fn upload_cover_image(&self, playlist_id: &str, jpeg_base64: &str) -> std::result::Result<(), CatalogError> {
        let url = self.api_url(&format!("/playlists/{playlist_id}/images"));
        self.user_request(|http| {
            http.put(&url)
                .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
                .body(jpeg_base64.to_string())
        })
        .await?;
        Ok(())
    }
}

/// DELETE bodies removing `items` by position, highest positions first
///
/// Each request sees the playlist as left by the previous one, so later
/// chunks go first to keep the earlier positions valid.
fn removal_bodies(items: &[PlaylistPosition]) -> Vec<Value> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| item.position);
    sorted
        .rchunks(MAX_URIS_PER_REQUEST)
        .map(|chunk| {
            let tracks: Vec<Value> = chunk
                .iter()
                .map(|item| json!({ "uri": item.uri, "positions": [item.position] }))
                .collect();
            json!({ "tracks": tracks })
        })
        .collect()
}
