use tokio_util::sync::CancellationToken;

use crate::gateway::events::{Event, EventError};
use crate::gateway::hub::EventHub;

/// Per-call context handed to every method handler.
#[derive(Clone)]
pub struct CallContext {
    pub session_id: String,
    /// The session's token; cancelled when the session is torn down.
    pub cancel: CancellationToken,
    hub: EventHub,
}

impl CallContext {
    pub fn new(session_id: impl Into<String>, cancel: CancellationToken, hub: EventHub) -> Self {
        Self {
            session_id: session_id.into(),
            cancel,
            hub,
        }
    }

    /// Push `event` to every open stream.
    pub fn publish(&self, event: Event) -> Result<(), EventError> {
        self.hub.broadcast(event)
    }
}
