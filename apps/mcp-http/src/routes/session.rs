//! Session establishment and teardown.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::middleware::SessionHeader;
use crate::provider::{Capabilities, ClientInfo, ServerInfo};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect", post(connect))
        .route("/disconnect", post(disconnect))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    #[serde(default)]
    pub client_info: ClientInfo,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub session_id: String,
    pub server_info: ServerInfo,
    pub capabilities: Capabilities,
    pub read_only: bool,
}

// ---------------------------------------------------------------------------
// POST /api/v1/connect
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/connect",
    tag = "Sessions",
    request_body = ConnectRequest,
    responses(
        (status = 200, description = "Session established", body = ConnectResponse),
        (status = 400, description = "Body is not valid JSON", body = ApiErrorBody),
        (status = 500, description = "Provider failed to initialize", body = ApiErrorBody),
    ),
)]
pub async fn connect(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ConnectResponse>, ApiError> {
    // Content-Type is not checked; an empty body means no client info.
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ConnectRequest::default()
    } else {
        serde_json::from_slice::<ConnectRequest>(&body).map_err(|err| {
            tracing::debug!(error = %err, "rejected connect body");
            ApiError::bad_request("Invalid request body")
        })?
    };

    let session = state.sessions.create(req.client_info);

    let init = match state.provider.initialize(&session.client).await {
        Ok(init) => init,
        Err(err) => {
            tracing::error!(
                session_id = %session.id,
                error = %err,
                "provider initialization failed"
            );
            state.sessions.delete(&session.id);
            return Err(ApiError::internal("Failed to initialize MCP connection"));
        }
    };

    Ok(Json(ConnectResponse {
        session_id: session.id.clone(),
        server_info: init.server_info,
        capabilities: init.capabilities,
        read_only: init.read_only,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/v1/disconnect
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/v1/disconnect",
    tag = "Sessions",
    params(("X-Session-ID" = String, Header, description = "Session id from /connect")),
    responses(
        (status = 204, description = "Session closed (or was already gone)"),
        (status = 400, description = "Missing session id", body = ApiErrorBody),
    ),
)]
pub async fn disconnect(
    State(state): State<AppState>,
    SessionHeader(session_id): SessionHeader,
) -> StatusCode {
    if !state.sessions.delete(&session_id) {
        tracing::debug!(session_id = %session_id, "disconnect for unknown session");
    }
    StatusCode::NO_CONTENT
}
