//! Session registry with idle expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::client::EventClient;
use super::hub::EventHub;
use super::session::Session;
use crate::provider::ClientInfo;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session not found")]
    NotFound,
}

/// Shared registry of all live sessions.
///
/// Uses `DashMap` for shard-level concurrency; per-session mutable state sits
/// behind `parking_lot::Mutex` inside `Session`.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    hub: EventHub,
    idle_timeout: Duration,
    /// Parent of every session token; cancelled by `shutdown`.
    root: CancellationToken,
}

impl SessionRegistry {
    pub fn new(hub: EventHub, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            hub,
            idle_timeout,
            root: CancellationToken::new(),
        }
    }

    pub fn create(&self, client: ClientInfo) -> Arc<Session> {
        let session = Arc::new(Session::new(client, self.root.child_token()));
        self.sessions.insert(session.id.clone(), Arc::clone(&session));
        tracing::info!(
            session_id = %session.id,
            client_name = %session.client.name,
            client_version = %session.client.version,
            "session created"
        );
        session
    }

    /// Fetch a live session. One that has sat idle past the threshold is torn
    /// down here rather than waiting for the next sweep.
    pub fn lookup(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        let session = self
            .sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(SessionError::NotFound)?;

        if session.idle_for(Instant::now()) > self.idle_timeout {
            let removed = self.sessions.remove_if(id, |_, current| {
                Arc::ptr_eq(current, &session)
                    && current.idle_for(Instant::now()) > self.idle_timeout
            });
            if let Some((_, expired)) = removed {
                self.teardown(&expired);
                tracing::info!(session_id = %id, "session expired on lookup");
                return Err(SessionError::NotFound);
            }
        }

        Ok(session)
    }

    pub fn touch(&self, id: &str) -> Result<(), SessionError> {
        let entry = self.sessions.get(id).ok_or(SessionError::NotFound)?;
        entry.touch();
        Ok(())
    }

    /// Remove a session and cancel everything scoped to it.
    /// Returns `false` if it was already gone.
    pub fn delete(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                self.teardown(&session);
                tracing::info!(session_id = %id, "session deleted");
                true
            }
            None => false,
        }
    }

    /// Attach a new push client to `session`, unregistering whichever one was
    /// there before.
    pub fn attach_client(&self, session: &Session, client: Arc<EventClient>) {
        if let Some(previous) = session.attach_client(client) {
            tracing::debug!(session_id = %session.id, "replacing existing push stream");
            self.hub.unregister(&previous);
        }
    }

    /// Tear down every session idle longer than the threshold.
    /// Returns the number of sessions removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        // `retain` decides under the shard lock, so a concurrent delete or
        // touch of the same id sees either the old or the new state.
        self.sessions.retain(|_, session| {
            if session.idle_for(now) > self.idle_timeout {
                expired.push(Arc::clone(session));
                false
            } else {
                true
            }
        });

        for session in &expired {
            self.teardown(session);
            tracing::debug!(session_id = %session.id, "session expired");
        }
        expired.len()
    }

    /// Tear down every session. Used at process shutdown.
    pub fn shutdown(&self) {
        self.root.cancel();
        let ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            self.delete(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run `sweep_expired` every `interval` until `shutdown` is cancelled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = registry.sweep_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = registry.len(),
                                "expired idle sessions"
                            );
                        }
                    }
                }
            }
            tracing::debug!("session sweeper stopped");
        })
    }

    fn teardown(&self, session: &Session) {
        session.cancel();
        if let Some(client) = session.take_client() {
            self.hub.unregister(&client);
        }
    }
}
