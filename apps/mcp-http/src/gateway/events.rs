//! Push-stream event type and its SSE wire frame.

use axum::response::sse::Event as SseFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event types emitted by the transport itself.
pub struct EventName;

impl EventName {
    pub const CONNECTED: &'static str = "connected";
    pub const PING: &'static str = "ping";
    pub const RESOURCES_LIST_CHANGED: &'static str = "notifications/resources/list_changed";
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A server-pushed event.
///
/// Rendered on the wire as an `event:` line, an optional `id:` line, an
/// optional `data:` line holding one JSON value, and a terminating blank line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event has no type")]
    MissingType,
    #[error("event {field} contains a line break")]
    LineBreak { field: &'static str },
    #[error("failed to encode event data: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: event_type.into(),
            data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// First frame of every push stream.
    pub fn connected(session_id: &str) -> Self {
        Self::new(EventName::CONNECTED).with_data(serde_json::json!({ "sessionId": session_id }))
    }

    /// Carries the matching JSON-RPC notification, so standard SSE clients
    /// (which skip frames without data) still dispatch it.
    pub fn resources_list_changed() -> Self {
        Self::new(EventName::RESOURCES_LIST_CHANGED).with_data(serde_json::json!({
            "jsonrpc": "2.0",
            "method": EventName::RESOURCES_LIST_CHANGED,
        }))
    }

    /// Liveness frame, no payload.
    pub fn ping() -> Self {
        Self::new(EventName::PING)
    }

    /// Check the invariants a frame needs before anything touches the wire.
    pub fn validate(&self) -> Result<(), EventError> {
        if self.event_type.is_empty() {
            return Err(EventError::MissingType);
        }
        if has_line_break(&self.event_type) {
            return Err(EventError::LineBreak { field: "type" });
        }
        if let Some(id) = &self.id {
            if has_line_break(id) || id.contains('\0') {
                return Err(EventError::LineBreak { field: "id" });
            }
        }
        Ok(())
    }

    /// Render the event as an SSE frame.
    pub fn to_frame(&self) -> Result<SseFrame, EventError> {
        self.validate()?;

        let mut frame = SseFrame::default().event(&self.event_type);
        if let Some(id) = &self.id {
            frame = frame.id(id);
        }
        if let Some(data) = &self.data {
            // Compact JSON never contains a raw newline, so this stays one `data:` line.
            frame = frame.data(serde_json::to_string(data)?);
        }
        Ok(frame)
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains('\n') || s.contains('\r')
}
