//! Server-Sent Events stream of one session

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use partydj_common::events::Topic;
use serde::Deserialize;
use std::convert::Infallible;

use crate::error::{Error, Result};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    /// Comma-separated topic names (all topics when absent)
    pub topics: Option<String>,
}

fn parse_topics(raw: Option<&str>) -> Result<Vec<Topic>> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(Topic::ALL.to_vec());
    };
    raw.split(',')
        .map(|name| Topic::parse(name).ok_or_else(|| Error::BadRequest(format!("Unknown topic: {name}"))))
        .collect()
}

/// GET /sessions/:code/events
pub async fn session_event_stream(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<EventStreamQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let topics = parse_topics(query.topics.as_deref())?;
    let party = state.orchestrator.get_party(&code).await?;
    let events = state.orchestrator.gateway().subscribe(&party.code).topics(topics);
    Ok(partydj_common::sse::session_event_sse(party.code, events))
}
