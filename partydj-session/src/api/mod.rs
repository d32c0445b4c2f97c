//! HTTP API handlers
//!
//! Thin adapters from requests to `SessionOrchestrator` operations.

pub mod health;
pub mod parties;
pub mod presence;
pub mod sessions;
pub mod sse;

pub use health::health_routes;
pub use parties::party_routes;
pub use presence::presence_routes;
pub use sessions::session_routes;
pub use sse::session_event_stream;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::Error;

/// Header carrying the authenticated user id
pub const ACTING_USER_HEADER: &str = "x-partydj-user";

/// Authenticated user acting on a request
#[derive(Debug, Clone)]
pub struct ActingUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| ActingUser(value.to_string()))
            .ok_or_else(|| Error::Unauthorized(format!("Missing {ACTING_USER_HEADER} header")))
    }
}
