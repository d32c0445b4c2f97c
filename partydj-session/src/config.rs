//! partydj-session configuration
//!
//! Loaded once at startup (TOML file + ENV overrides for secrets) and
//! passed explicitly to every component. Nothing reads the environment
//! after `Config::load` returns.

use partydj_common::config::{env_override, load_toml_config, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DEFAULT_SYSTEM_MESSAGE: &str = "You are the perfect party DJ. All following user messages are \
requests and feedback from the guests of a party. The previous assistant message, if any, is the \
current playlist. Respond with an updated playlist of 15 to 25 songs. Write every song as \
\"<title> <artist>\", separate songs with \";\" and wrap the whole list between two \"$PLAYLIST$\" \
markers, for example: $PLAYLIST$Song A Artist A;Song B Artist B$PLAYLIST$";

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

/// Database section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file (defaults to the platform data folder)
    pub path: Option<PathBuf>,
}

/// Language-model API section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            organization: None,
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com".to_string(),
        }
    }
}

/// Music catalog API section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base_url: String,
    pub accounts_base_url: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base_url: "https://api.spotify.com/v1".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
        }
    }
}

/// Presence signing and event bus section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BroadcastConfig {
    pub app_key: Option<String>,
    pub app_secret: Option<String>,
    pub event_capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            app_secret: None,
            event_capacity: 1000,
        }
    }
}

/// Static inputs of the token budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BudgetConfig {
    /// Maximum spend per session, in currency
    pub max_spend_per_session: f64,
    /// Price per 1000 tokens, in currency
    pub currency_per_1k_tokens: f64,
    /// Expected number of user messages over a session
    pub target_user_messages: u64,
    /// Older user messages kept as context in each prompt
    pub trailing_context_messages: usize,
    /// New user messages per prompt (also the regeneration cadence)
    pub prompt_message_buffer: usize,
    /// Fraction of usable tokens reserved for playlist completions
    pub playlist_token_share: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_spend_per_session: 0.15,
            currency_per_1k_tokens: 0.002,
            target_user_messages: 150,
            trailing_context_messages: 10,
            prompt_message_buffer: 5,
            playlist_token_share: 0.75,
        }
    }
}

/// Prompt wording and completion format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_message: String,
    /// Marker wrapping the playlist in a completion
    pub playlist_sentinel: String,
    /// Separator between playlist entries
    pub track_delimiter: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            playlist_sentinel: "$PLAYLIST$".to_string(),
            track_delimiter: ";".to_string(),
        }
    }
}

/// Playback polling hints returned to the host client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Added to the remaining track time so the next poll lands after the
    /// track transition
    pub settle_offset_ms: u64,
    /// Poll interval when no timing data is available
    pub fallback_poll_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_offset_ms: 2000,
            fallback_poll_interval_ms: 10_000,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub openai: OpenAiConfig,
    pub spotify: SpotifyConfig,
    pub broadcast: BroadcastConfig,
    pub budget: BudgetConfig,
    pub prompt: PromptConfig,
    pub playback: PlaybackConfig,
}

impl Config {
    /// Load the TOML file (if any) and apply ENV overrides for secrets
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Config = load_toml_config(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_override("PARTYDJ_OPENAI_API_KEY") {
            self.openai.api_key = Some(value);
        }
        if let Some(value) = env_override("PARTYDJ_OPENAI_ORGANIZATION") {
            self.openai.organization = Some(value);
        }
        if let Some(value) = env_override("PARTYDJ_SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = Some(value);
        }
        if let Some(value) = env_override("PARTYDJ_SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = Some(value);
        }
        if let Some(value) = env_override("PARTYDJ_BROADCAST_APP_KEY") {
            self.broadcast.app_key = Some(value);
        }
        if let Some(value) = env_override("PARTYDJ_BROADCAST_APP_SECRET") {
            self.broadcast.app_secret = Some(value);
        }
    }

    /// Fail fast on missing credentials and malformed budget inputs
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.openai.api_key.is_none() {
            missing.push("openai.api_key (PARTYDJ_OPENAI_API_KEY)");
        }
        if self.spotify.client_id.is_none() {
            missing.push("spotify.client_id (PARTYDJ_SPOTIFY_CLIENT_ID)");
        }
        if self.spotify.client_secret.is_none() {
            missing.push("spotify.client_secret (PARTYDJ_SPOTIFY_CLIENT_SECRET)");
        }
        if self.broadcast.app_key.is_none() {
            missing.push("broadcast.app_key (PARTYDJ_BROADCAST_APP_KEY)");
        }
        if self.broadcast.app_secret.is_none() {
            missing.push("broadcast.app_secret (PARTYDJ_BROADCAST_APP_SECRET)");
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required credentials: {}",
                missing.join(", ")
            )));
        }

        self.budget.validate()?;

        if self.prompt.playlist_sentinel.is_empty() || self.prompt.track_delimiter.is_empty() {
            return Err(Error::Config(
                "prompt.playlist_sentinel and prompt.track_delimiter must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Database file path (configured or platform default)
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| partydj_common::config::default_data_folder().join("partydj.db"))
    }
}

impl BudgetConfig {
    /// Reject inputs that cannot produce a meaningful budget
    pub fn validate(&self) -> Result<()> {
        if !(self.max_spend_per_session > 0.0) || !(self.currency_per_1k_tokens > 0.0) {
            return Err(Error::Config(
                "budget.max_spend_per_session and budget.currency_per_1k_tokens must be positive"
                    .to_string(),
            ));
        }
        if self.prompt_message_buffer == 0 {
            return Err(Error::Config(
                "budget.prompt_message_buffer must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.playlist_token_share) {
            return Err(Error::Config(
                "budget.playlist_token_share must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}
