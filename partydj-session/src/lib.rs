//! partydj-session library interface
//!
//! Party session engine: guest messages are collected per session, turned
//! into language-model prompts under a token budget, and the completions
//! are reconciled into the host's catalog playlist. Session state changes
//! are fanned out to subscribers as events.

pub mod api;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod store;
pub mod tokens;

pub use crate::error::{Error, Result};

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::SessionOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::party_routes())
        .merge(api::session_routes())
        .route("/sessions/:code/events", get(api::session_event_stream))
        .merge(api::presence_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
