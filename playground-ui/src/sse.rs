//! Server-Sent Events stream of session events.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use playground::core::types::{Notification, SessionPhase};
use playground::session::SessionEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct SsePayload {
    #[serde(rename = "type")]
    event_type: &'static str,
    session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<SessionPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<Notification>,
}

impl From<&SessionEvent> for SsePayload {
    fn from(event: &SessionEvent) -> Self {
        match event {
            SessionEvent::PhaseChanged { session_id, phase } => SsePayload {
                event_type: "phase_changed",
                session_id: session_id.clone(),
                phase: Some(*phase),
                notification: None,
            },
            SessionEvent::Notification {
                session_id,
                notification,
            } => SsePayload {
                event_type: "notification",
                session_id: session_id.clone(),
                phase: None,
                notification: Some(notification.clone()),
            },
        }
    }
}

/// SSE endpoint handler.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.host.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        loop {
            match rx.recv().await {
                Ok(session_event) => {
                    let payload = SsePayload::from(&session_event);
                    if let Ok(json) = serde_json::to_string(&payload) {
                        yield Ok(Event::default().event(payload.event_type).data(json));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "SSE client lagged, some events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
