//! Progress stream.
//!
//! Late joiners first receive the most recent events so a page opened
//! mid-run can render the current percentage.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use slicer_core::events::Event as AppEvent;
use tokio::sync::broadcast::error::RecvError;

use crate::context::AppContext;

const REPLAY: usize = 20;
const HEARTBEAT: Duration = Duration::from_secs(15);

fn to_sse(event: &AppEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Event::default().data(data)),
        Err(e) => {
            tracing::warn!("Dropping unserializable event {}: {e}", event.id);
            None
        }
    }
}

/// GET /api/events
pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let backlog = ctx.event_bus.recent_events(REPLAY);
    let mut rx = ctx.event_bus.subscribe();

    let stream = async_stream::stream! {
        // recent_events is newest first
        for event in backlog.iter().rev() {
            if let Some(sse) = to_sse(event) {
                yield Ok(sse);
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT);
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => {
                        if let Some(sse) = to_sse(&event) {
                            yield Ok(sse);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::debug!("Progress stream skipped {missed} events");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = heartbeat.tick() => {
                    yield Ok(Event::default().event("heartbeat").data(r#"{"type":"heartbeat"}"#));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("ping"))
}
