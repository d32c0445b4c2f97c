//! partydj-session - Party session engine
//!
//! Serves the session HTTP API and SSE event streams. Configuration comes
//! from a TOML file (optional) plus `PARTYDJ_*` environment overrides for
//! credentials.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use partydj_common::config::ConfigFileResolver;
use partydj_common::events::EventBus;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use partydj_session::broadcast::{BroadcastGateway, PresenceSigner};
use partydj_session::catalog::SpotifyProvider;
use partydj_session::config::Config;
use partydj_session::llm::OpenAiClient;
use partydj_session::orchestrator::{OrchestratorParts, SessionOrchestrator};
use partydj_session::prompt::PlaylistSettings;
use partydj_session::store::{init_schema, SessionStore, SqliteKvStore, SqlitePartyStore};
use partydj_session::tokens::BpeEncoder;
use partydj_session::AppState;

/// Command-line arguments for partydj-session
#[derive(Parser, Debug)]
#[command(name = "partydj-session")]
#[command(about = "Party session engine for PartyDJ")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "PARTYDJ_SESSION_PORT")]
    port: Option<u16>,

    /// Database file (overrides config)
    #[arg(short, long, env = "PARTYDJ_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = ConfigFileResolver::new("session").resolve(args.config.as_deref());
    let mut config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = Some(database);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "partydj_session={level},partydj_common={level},tower_http=debug",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting partydj-session {}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Invalid configuration")?;

    let encoder = Arc::new(BpeEncoder::for_model(&config.openai.model).context("Failed to load tokenizer")?);
    let settings = PlaylistSettings::from_config(&config, encoder.as_ref())
        .context("Failed to derive token budget")?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = partydj_common::db::init_database_pool(&db_path).await?;
    init_schema(&pool).await?;

    let parties = Arc::new(SqlitePartyStore::new(pool.clone()));
    let sessions = SessionStore::new(Arc::new(SqliteKvStore::new(pool)));

    let (app_key, app_secret) = match (&config.broadcast.app_key, &config.broadcast.app_secret) {
        (Some(key), Some(secret)) => (key.clone(), secret.clone()),
        _ => anyhow::bail!("Broadcast credentials are not configured"),
    };
    let gateway = BroadcastGateway::new(
        EventBus::new(config.broadcast.event_capacity),
        PresenceSigner::new(app_key, app_secret),
        parties.clone(),
    );

    let llm = Arc::new(OpenAiClient::new(&config.openai).context("Failed to create language model client")?);
    let catalog = Arc::new(
        SpotifyProvider::new(&config.spotify, parties.clone()).context("Failed to create catalog client")?,
    );

    let orchestrator = SessionOrchestrator::new(OrchestratorParts {
        parties,
        sessions,
        gateway,
        llm,
        catalog,
        encoder,
        settings: Arc::new(settings),
        playback: config.playback.clone(),
    });
    let app = partydj_session::build_router(AppState::new(Arc::new(orchestrator)));

    let ip = config
        .server
        .bind
        .parse::<std::net::IpAddr>()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind))?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
