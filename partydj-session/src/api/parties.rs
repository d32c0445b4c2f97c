//! Party lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};

use super::ActingUser;
use crate::error::Result;
use crate::models::{NewParty, Party};
use crate::AppState;

/// POST /parties
pub async fn create_party(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Json(input): Json<NewParty>,
) -> Result<(StatusCode, Json<Party>)> {
    let party = state.orchestrator.create_party(&user, input).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

/// DELETE /parties/:code
pub async fn delete_party(
    State(state): State<AppState>,
    ActingUser(user): ActingUser,
    Path(code): Path<String>,
) -> Result<StatusCode> {
    state.orchestrator.delete_party(&code, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn party_routes() -> Router<AppState> {
    Router::new()
        .route("/parties", post(create_party))
        .route("/parties/:code", delete(delete_party))
}
