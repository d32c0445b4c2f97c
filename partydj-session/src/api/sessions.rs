//! Session endpoints
//!
//! Messages, lifecycle, playlist and host playback reports.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use partydj_common::events::{Member, SessionStatus, UserMessage};
use serde::{Deserialize, Serialize};

use super::ActingUser;
use crate::error::Result;
use crate::models::PartyPlaylist;
use crate::orchestrator::PlaybackReport;
use crate::AppState;

/// Author of a submitted message
#[derive(Debug, Deserialize)]
pub struct MemberInput {
    pub id: String,
    pub name: String,
}

/// POST /sessions/:code/messages body
#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub content: String,
    pub member: MemberInput,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: SessionStatus,
}

/// GET /sessions/:code/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<UserMessage>>> {
    Ok(Json(state.orchestrator.get_messages(&code).await?))
}

/// POST /sessions/:code/messages
///
/// Responds once the message is stored and broadcast; a regeneration on
/// the cadence runs before the response is sent.
pub async fn submit_message(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<UserMessage>)> {
    let member = Member {
        id: request.member.id,
        name: request.member.name,
        is_host: false,
    };
    let outcome = state
        .orchestrator
        .submit_message(&code, member, &request.content)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome.message)))
}

/// POST /sessions/:code/start
pub async fn start_session(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(code): Path<String>,
) -> Result<Json<StatusResponse>> {
    let status = state.orchestrator.start_session(&code, &user).await?;
    Ok(Json(StatusResponse { status }))
}

/// POST /sessions/:code/stop
pub async fn stop_session(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(code): Path<String>,
) -> Result<Json<StatusResponse>> {
    let status = state.orchestrator.stop_session(&code, &user).await?;
    Ok(Json(StatusResponse { status }))
}

/// GET /sessions/:code/playback
pub async fn report_playback(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(code): Path<String>,
) -> Result<Json<PlaybackReport>> {
    Ok(Json(state.orchestrator.report_playback(&code, &user).await?))
}

/// GET /sessions/:code/playlist
pub async fn get_playlist(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<PartyPlaylist>> {
    Ok(Json(state.orchestrator.get_playlist(&code).await?))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:code/messages", get(get_messages).post(submit_message))
        .route("/sessions/:code/start", post(start_session))
        .route("/sessions/:code/stop", post(stop_session))
        .route("/sessions/:code/playback", get(report_playback))
        .route("/sessions/:code/playlist", get(get_playlist))
}
