//! Per-session state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mcp_common::id::{prefix, prefixed_ulid};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::client::EventClient;
use crate::provider::ClientInfo;

/// Server-side state for one client session.
pub struct Session {
    /// Unique session identifier (`ses_` prefixed ULID).
    pub id: String,
    /// Name and version the client announced at connect time.
    pub client: ClientInfo,
    pub created_at: DateTime<Utc>,
    /// Cancelled on teardown; scopes every call and the push stream.
    cancel: CancellationToken,
    last_active: Mutex<Instant>,
    event_client: Mutex<Option<Arc<EventClient>>>,
}

impl Session {
    pub fn new(client: ClientInfo, cancel: CancellationToken) -> Self {
        Self {
            id: prefixed_ulid(prefix::SESSION),
            client,
            created_at: Utc::now(),
            cancel,
            last_active: Mutex::new(Instant::now()),
            event_client: Mutex::new(None),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn last_active(&self) -> Instant {
        *self.last_active.lock()
    }

    /// Mark the session active. Successive touches always move forward, even
    /// when the clock has not advanced between them.
    pub fn touch(&self) {
        let mut last = self.last_active.lock();
        let now = Instant::now();
        *last = if now > *last {
            now
        } else {
            *last + Duration::from_nanos(1)
        };
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_active())
    }

    #[cfg(test)]
    pub(crate) fn event_client(&self) -> Option<Arc<EventClient>> {
        self.event_client.lock().clone()
    }

    /// Store `client` as the attached push client, returning the previous one.
    pub fn attach_client(&self, client: Arc<EventClient>) -> Option<Arc<EventClient>> {
        self.event_client.lock().replace(client)
    }

    /// Clear the attached client if it is still `client`.
    pub fn detach_client(&self, client: &Arc<EventClient>) -> bool {
        let mut slot = self.event_client.lock();
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, client)) {
            slot.take();
            true
        } else {
            false
        }
    }

    pub fn take_client(&self) -> Option<Arc<EventClient>> {
        self.event_client.lock().take()
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        let mut last = self.last_active.lock();
        if let Some(earlier) = last.checked_sub(by) {
            *last = earlier;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
