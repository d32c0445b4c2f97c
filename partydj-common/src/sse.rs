//! Server-Sent Events (SSE) utilities
//!
//! Turns a stream of session events into an axum SSE response. The SSE
//! `event` field carries the topic name so browser clients can bind one
//! listener per topic.

use crate::events::SessionEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between SSE keep-alive comments
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Convert one session event into an SSE event
///
/// Returns `None` if the event cannot be serialized.
pub fn to_sse_event(event: &SessionEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(event.topic().as_str()).data(json)),
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            None
        }
    }
}

/// Wrap a session event stream into an SSE response
///
/// An initial `ConnectionStatus` event is sent so clients can show a
/// connected indicator before the first domain event arrives.
pub fn session_event_sse<S>(
    session_code: String,
    events: S,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = SessionEvent> + Send + 'static,
{
    info!(session_code = %session_code, "New SSE client connected");

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        let mut events = Box::pin(events);
        while let Some(event) = events.next().await {
            debug!(session_code = %session_code, topic = event.topic().as_str(), "SSE: Sending event");
            if let Some(sse_event) = to_sse_event(&event) {
                yield Ok(sse_event);
            }
        }

        debug!(session_code = %session_code, "SSE: Event stream ended");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
