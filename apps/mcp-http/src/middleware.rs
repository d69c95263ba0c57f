//! Request extractors and middleware shared by the session-bound routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Span;

use crate::error::ApiError;
use crate::gateway::session::Session;
use crate::AppState;

/// Header carrying the session id on every call after `/connect`.
pub const SESSION_HEADER: &str = "x-session-id";

/// Raw session id from the `X-Session-ID` header. Rejects with 400 when absent.
#[derive(Debug, Clone)]
pub struct SessionHeader(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionHeader {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| SessionHeader(v.to_string()))
            .ok_or_else(|| ApiError::bad_request("Missing session ID"))
    }
}

/// A live session resolved from `X-Session-ID`. Rejects with 401 when the id is
/// unknown or expired.
pub struct ActiveSession(pub Arc<Session>);

impl FromRequestParts<AppState> for ActiveSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionHeader(id) = SessionHeader::from_request_parts(parts, state).await?;
        let session = state.sessions.lookup(&id).inspect_err(|_| {
            tracing::debug!(session_id = %id, "rejected unknown session");
        })?;
        Ok(ActiveSession(session))
    }
}

/// Access-control hook for the session routes. Admits every request; policy
/// lives outside this service.
pub async fn authorize(request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Span for `TraceLayer`, tagged with the caller's session when there is one.
pub fn request_span(request: &axum::http::Request<Body>) -> Span {
    let session_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        session_id = %session_id,
    )
}
