//! Presence channel authorization for the push transport

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::broadcast::ChannelAuth;
use crate::error::Result;
use crate::AppState;

/// POST /presence/auth body
#[derive(Debug, Deserialize)]
pub struct PresenceAuthRequest {
    pub socket_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
}

/// POST /presence/auth
pub async fn authorize_presence(
    State(state): State<AppState>,
    Json(request): Json<PresenceAuthRequest>,
) -> Result<Json<ChannelAuth>> {
    let auth = state
        .orchestrator
        .authorize_presence(
            &request.socket_id,
            &request.channel_name,
            &request.user_id,
            &request.user_name,
        )
        .await?;
    Ok(Json(auth))
}

pub fn presence_routes() -> Router<AppState> {
    Router::new().route("/presence/auth", post(authorize_presence))
}
