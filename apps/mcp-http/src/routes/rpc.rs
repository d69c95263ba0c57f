//! Call submission.

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use crate::error::{ApiError, ApiErrorBody};
use crate::middleware::ActiveSession;
use crate::protocol::context::CallContext;
use crate::protocol::dispatcher::CallFailure;
use crate::protocol::envelope::{RpcRequest, RpcResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/rpc", post(rpc))
}

// ---------------------------------------------------------------------------
// POST /api/v1/rpc
// ---------------------------------------------------------------------------

/// Submit one JSON-RPC call
///
/// Protocol errors (unknown method, bad params) come back as a 200 envelope;
/// only transport problems use a non-200 status.
#[utoipa::path(
    post,
    path = "/api/v1/rpc",
    tag = "RPC",
    params(("X-Session-ID" = String, Header, description = "Session id from /connect")),
    request_body = RpcRequest,
    responses(
        (status = 200, description = "Response envelope", body = RpcResponse),
        (status = 400, description = "Missing session id or body is not JSON", body = ApiErrorBody),
        (status = 401, description = "Unknown or expired session", body = ApiErrorBody),
        (status = 500, description = "Call failed", body = ApiErrorBody),
    ),
)]
pub async fn rpc(
    State(state): State<AppState>,
    ActiveSession(session): ActiveSession,
    body: Bytes,
) -> Result<Json<RpcResponse>, ApiError> {
    let raw: Value = serde_json::from_slice(&body).map_err(|err| {
        tracing::debug!(session_id = %session.id, error = %err, "rpc body is not JSON");
        ApiError::bad_request("Invalid JSON")
    })?;

    state.sessions.touch(&session.id)?;

    let ctx = CallContext::new(session.id.clone(), session.cancel_token(), state.hub.clone());
    match state.dispatcher.handle(raw, &ctx).await {
        Ok(response) => Ok(Json(response)),
        Err(CallFailure::Cancelled) => {
            tracing::debug!(session_id = %session.id, "call aborted by session teardown");
            Err(ApiError::unauthorized("Invalid session"))
        }
        Err(err) => {
            tracing::error!(session_id = %session.id, error = %err, "rpc processing failed");
            Err(ApiError::internal("RPC processing failed"))
        }
    }
}
