//! Test doubles and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use partydj_common::events::{EventBus, PlaybackSnapshot, TrackInfo};

use partydj_session::broadcast::{BroadcastGateway, PresenceSigner};
use partydj_session::catalog::{
    playlist_uri, CatalogApi, CatalogError, CatalogProvider, CreatedPlaylist, PlaylistPosition,
};
use partydj_session::config::Config;
use partydj_session::llm::{Completion, CompletionRequest, LlmClient, LlmError, Usage};
use partydj_session::models::{NewParty, Party, PartyPlaylist};
use partydj_session::orchestrator::{OrchestratorParts, SessionOrchestrator};
use partydj_session::prompt::PlaylistSettings;
use partydj_session::store::{init_schema, SessionStore, SqliteKvStore, SqlitePartyStore};
use partydj_session::tokens::TokenEncoder;

pub const HOST: &str = "host-1";
pub const PLAYLIST_ID: &str = "pl123";
pub const APP_KEY: &str = "test-key";
pub const APP_SECRET: &str = "test-secret";

/// One token per whitespace-separated word
pub struct WhitespaceEncoder;

impl TokenEncoder for WhitespaceEncoder {
    fn encoded_len(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Language model returning scripted completions in order
///
/// When gated, each completion waits for `release()` after signalling
/// `entered()`.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<Completion, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gated: AtomicBool,
    entered: Notify,
    released: Notify,
}

impl ScriptedLlm {
    pub fn push_completion(&self, content: &str, total_tokens: u64) {
        self.responses.lock().unwrap().push_back(Ok(completion(content, total_tokens)));
    }

    pub fn push_failure(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hold_completions(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Resolves once a held completion has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.released.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Network("no scripted completion".to_string())))
    }
}

pub fn completion(content: &str, total_tokens: u64) -> Completion {
    Completion {
        content: content.to_string(),
        finish_reason: "stop".to_string(),
        usage: Usage {
            prompt_tokens: total_tokens / 2,
            completion_tokens: total_tokens - total_tokens / 2,
            total_tokens,
        },
    }
}

/// Completion text carrying `tracks` between sentinels
pub fn playlist_completion(tracks: &[&str]) -> String {
    format!("Here you go! $PLAYLIST${}$PLAYLIST$", tracks.join(";"))
}

/// URI the fake catalog resolves a query to
pub fn track_uri(query: &str) -> String {
    let slug: String = query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("spotify:track:{slug}")
}

pub fn track(uri: &str, duration_ms: u64) -> TrackInfo {
    TrackInfo {
        id: uri.rsplit(':').next().unwrap_or(uri).to_string(),
        uri: uri.to_string(),
        name: uri.to_string(),
        artists: vec!["Artist".to_string()],
        duration_ms,
        images: vec![],
    }
}

/// In-memory catalog with one playlist and one player
///
/// Every query resolves except those containing "unknown".
#[derive(Default)]
pub struct FakeCatalog {
    pub tracks: Mutex<Vec<String>>,
    pub playback: Mutex<Option<PlaybackSnapshot>>,
    pub started: Mutex<Vec<Option<String>>>,
    pub searches: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn set_tracks(&self, uris: &[&str]) {
        *self.tracks.lock().unwrap() = uris.iter().map(|u| u.to_string()).collect();
    }

    pub fn tracks(&self) -> Vec<String> {
        self.tracks.lock().unwrap().clone()
    }

    /// Player on `context` at `progress_ms` into `track_uri`
    pub fn set_playing(&self, context: &str, track_uri: &str, progress_ms: u64) {
        *self.playback.lock().unwrap() = Some(PlaybackSnapshot {
            track: Some(track(track_uri, 180_000)),
            context_uri: Some(context.to_string()),
            progress_ms: Some(progress_ms),
            is_playing: true,
            timestamp: 0,
        });
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn search_track(&self, query: &str) -> Result<Option<String>, CatalogError> {
        self.searches.lock().unwrap().push(query.to_string());
        if query.contains("unknown") {
            return Ok(None);
        }
        Ok(Some(track_uri(query)))
    }

    async fn get_playback(&self) -> Result<Option<PlaybackSnapshot>, CatalogError> {
        Ok(self.playback.lock().unwrap().clone())
    }

    async fn playlist_track_uris(&self, _playlist_id: &str) -> Result<Vec<String>, CatalogError> {
        Ok(self.tracks())
    }

    async fn add_tracks(&self, _playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        self.tracks.lock().unwrap().extend_from_slice(uris);
        Ok(())
    }

    async fn remove_tracks_at(
        &self,
        _playlist_id: &str,
        items: &[PlaylistPosition],
    ) -> Result<(), CatalogError> {
        let mut tracks = self.tracks.lock().unwrap();
        let mut positions: Vec<usize> = items.iter().map(|item| item.position).collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        for position in positions {
            if position < tracks.len() {
                tracks.remove(position);
            }
        }
        Ok(())
    }

    async fn replace_tracks(&self, _playlist_id: &str, uris: &[String]) -> Result<(), CatalogError> {
        *self.tracks.lock().unwrap() = uris.to_vec();
        Ok(())
    }

    async fn start_playback(&self, context_uri: Option<&str>) -> Result<(), CatalogError> {
        self.started.lock().unwrap().push(context_uri.map(str::to_string));
        let mut playback = self.playback.lock().unwrap();
        if context_uri.is_none() {
            if let Some(snapshot) = playback.as_mut() {
                snapshot.is_playing = true;
                return Ok(());
            }
        }
        *playback = Some(PlaybackSnapshot {
            track: None,
            context_uri: context_uri.map(str::to_string),
            progress_ms: None,
            is_playing: true,
            timestamp: 0,
        });
        Ok(())
    }

    async fn create_playlist(
        &self,
        _name: &str,
        _description: Option<&str>,
    ) -> Result<CreatedPlaylist, CatalogError> {
        Ok(CreatedPlaylist {
            id: PLAYLIST_ID.to_string(),
            uri: playlist_uri(PLAYLIST_ID),
        })
    }

    async fn get_playlist(&self, playlist_id: &str) -> Result<PartyPlaylist, CatalogError> {
        Ok(PartyPlaylist {
            id: playlist_id.to_string(),
            uri: playlist_uri(playlist_id),
            name: "Party".to_string(),
            description: None,
            images: vec![],
            tracks: self.tracks().iter().map(|uri| track(uri, 180_000)).collect(),
        })
    }

    async fn upload_cover_image(&self, _playlist_id: &str, _jpeg_base64: &str) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Hands the same fake catalog to every host
pub struct FakeProvider(pub Arc<FakeCatalog>);

#[async_trait]
impl CatalogProvider for FakeProvider {
    async fn for_host(&self, _host_user_id: &str) -> partydj_session::Result<Arc<dyn CatalogApi>> {
        Ok(self.0.clone())
    }
}

pub struct TestHarness {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub llm: Arc<ScriptedLlm>,
    pub catalog: Arc<FakeCatalog>,
    pub parties: Arc<SqlitePartyStore>,
}

/// Orchestrator over an in-memory database with default settings
pub async fn harness() -> TestHarness {
    harness_with(Config::default()).await
}

pub async fn harness_with(config: Config) -> TestHarness {
    let pool = partydj_common::db::init_memory_pool()
        .await
        .expect("Failed to create in-memory database");
    init_schema(&pool).await.expect("Failed to create schema");

    let parties = Arc::new(SqlitePartyStore::new(pool.clone()));
    let sessions = SessionStore::new(Arc::new(SqliteKvStore::new(pool)));
    let gateway = BroadcastGateway::new(
        EventBus::new(100),
        PresenceSigner::new(APP_KEY, APP_SECRET),
        parties.clone(),
    );
    let llm = Arc::new(ScriptedLlm::default());
    let catalog = Arc::new(FakeCatalog::default());
    let settings = PlaylistSettings::from_config(&config, &WhitespaceEncoder)
        .expect("Failed to derive settings");

    let orchestrator = SessionOrchestrator::new(OrchestratorParts {
        parties: parties.clone(),
        sessions,
        gateway,
        llm: llm.clone(),
        catalog: Arc::new(FakeProvider(catalog.clone())),
        encoder: Arc::new(WhitespaceEncoder),
        settings: Arc::new(settings),
        playback: config.playback.clone(),
    });

    TestHarness {
        orchestrator: Arc::new(orchestrator),
        llm,
        catalog,
        parties,
    }
}

impl TestHarness {
    /// Party hosted by `HOST` with playlist `PLAYLIST_ID`
    pub async fn party(&self) -> Party {
        self.orchestrator
            .create_party(
                HOST,
                NewParty {
                    name: "Friday Night".to_string(),
                    description: Some("Office party".to_string()),
                    cover_image: None,
                },
            )
            .await
            .expect("Failed to create party")
    }

    pub async fn active_party(&self) -> Party {
        let party = self.party().await;
        self.orchestrator
            .start_session(&party.code, HOST)
            .await
            .expect("Failed to start session");
        self.orchestrator.get_party(&party.code).await.expect("Party vanished")
    }
}

pub fn guest(n: usize) -> partydj_common::events::Member {
    partydj_common::events::Member {
        id: format!("guest-{n}"),
        name: format!("Guest {n}"),
        is_host: false,
    }
}
