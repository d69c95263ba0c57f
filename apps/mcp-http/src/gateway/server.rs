//! Push-stream endpoint and per-stream keep-alive loop.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::response::sse::Sse;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::time::{self, MissedTickBehavior};

use crate::error::ApiError;
use crate::middleware::ActiveSession;
use crate::AppState;

use super::client::EventClient;
use super::events::Event;
use super::session::Session;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

pub fn router() -> Router<AppState> {
    Router::new().route("/events", get(open_stream))
}

/// Open the session's push stream
///
/// Replaces any stream already open for the session.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    params(("X-Session-ID" = String, Header, description = "Session id from /connect")),
    responses(
        (
            status = 200,
            description = "Server-sent event stream",
            content_type = "text/event-stream",
            body = String
        ),
        (status = 400, description = "Missing session id", body = crate::error::ApiErrorBody),
        (
            status = 401,
            description = "Unknown or expired session",
            body = crate::error::ApiErrorBody
        ),
    )
)]
pub async fn open_stream(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
) -> Result<impl IntoResponse, ApiError> {
    let (client, frames) = EventClient::new(session.id.clone(), state.config.event_queue_capacity);

    // Buffered ahead of the body, so it is always the first frame.
    if let Err(err) = client.send(&Event::connected(&session.id)).await {
        tracing::error!(session_id = %session.id, error = %err, "failed to write connected event");
        return Err(ApiError::internal("Failed to open event stream"));
    }

    state.sessions.attach_client(&session, client.clone());
    state.hub.register(client.clone());
    tracing::info!(session_id = %session.id, "push stream opened");

    tokio::spawn(run_stream(state, session, client));

    Ok((
        [(CACHE_CONTROL, "no-cache"), (X_ACCEL_BUFFERING, "no")],
        Sse::new(frames),
    ))
}

/// Keep the stream alive until the session ends, the peer leaves, or the
/// client is replaced. The client is unregistered exactly once on the way out.
async fn run_stream(state: AppState, session: Arc<Session>, client: Arc<EventClient>) {
    let cancel = session.cancel_token();
    let mut ticker = time::interval(state.config.ping_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break "session closed",
            _ = client.closed_by_peer() => break "peer disconnected",
            _ = client.closed() => break "client closed",
            _ = ticker.tick() => {
                let ping = Event::ping();
                let sent = tokio::select! {
                    _ = cancel.cancelled() => break "session closed",
                    sent = client.send(&ping) => sent,
                };
                if let Err(err) = sent {
                    tracing::debug!(session_id = %session.id, error = %err, "ping failed");
                    break "ping failed";
                }
            }
        }
    };

    // Whoever clears the session's slot owns the unregister. Teardown and
    // re-attach clear it themselves and have already unregistered.
    if session.detach_client(&client) {
        state.hub.unregister(&client);
    }
    tracing::info!(session_id = %session.id, reason, "push stream closed");
}
