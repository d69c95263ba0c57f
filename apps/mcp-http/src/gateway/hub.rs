//! Event hub: one actor task owning every registered push client.
//!
//! Register, unregister and broadcast are messages on a single unbounded inbox,
//! so the client map is only ever touched by the actor and needs no lock.
//! Callers never wait on a slow consumer: a client whose queue is full is
//! dropped instead.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::client::{EnqueueError, EventClient};
use super::events::{Event, EventError};

enum HubCommand {
    Register(Arc<EventClient>),
    Unregister(Arc<EventClient>),
    Broadcast(Event),
    Count(oneshot::Sender<usize>),
}

/// Handle to the hub actor. Cloneable; lives in `AppState`.
#[derive(Clone)]
pub struct EventHub {
    inbox: mpsc::UnboundedSender<HubCommand>,
}

impl EventHub {
    /// Start the actor. It runs until `shutdown` is cancelled or every handle
    /// is dropped, and closes any clients still registered on the way out.
    pub fn spawn(shutdown: CancellationToken) -> Self {
        let (inbox, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, shutdown));
        Self { inbox }
    }

    /// Make `client` eligible for future broadcasts.
    pub fn register(&self, client: Arc<EventClient>) {
        if let Err(mpsc::error::SendError(HubCommand::Register(client))) =
            self.inbox.send(HubCommand::Register(client))
        {
            // Hub is gone; nothing would ever feed this client.
            client.close();
        }
    }

    /// Remove `client` and close it. Idempotent.
    pub fn unregister(&self, client: &Arc<EventClient>) {
        // Close right away so the stream ends even if the inbox is backed up.
        client.close();
        let _ = self.inbox.send(HubCommand::Unregister(Arc::clone(client)));
    }

    /// Queue `event` for every registered client.
    pub fn broadcast(&self, event: Event) -> Result<(), EventError> {
        event.validate()?;
        let _ = self.inbox.send(HubCommand::Broadcast(event));
        Ok(())
    }

    /// Number of registered clients. Zero once the hub has stopped.
    pub async fn client_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.inbox.send(HubCommand::Count(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

async fn run(mut inbox: mpsc::UnboundedReceiver<HubCommand>, shutdown: CancellationToken) {
    let mut state = HubState::default();

    loop {
        let command = tokio::select! {
            _ = shutdown.cancelled() => break,
            command = inbox.recv() => match command {
                Some(command) => command,
                None => break,
            },
        };

        match command {
            HubCommand::Register(client) => state.register(client),
            HubCommand::Unregister(client) => state.unregister(&client),
            HubCommand::Broadcast(event) => {
                state.broadcast(event);
            }
            HubCommand::Count(reply) => {
                let _ = reply.send(state.len());
            }
        }
    }

    let remaining = state.close_all();
    tracing::debug!(remaining, "event hub stopped");
}

/// The actor's private state.
#[derive(Default)]
struct HubState {
    clients: HashMap<String, Arc<EventClient>>,
}

impl HubState {
    fn register(&mut self, client: Arc<EventClient>) {
        // Unregistered before its registration was processed.
        if client.is_closed() {
            return;
        }
        let id = client.id().to_string();
        if let Some(previous) = self.clients.insert(id.clone(), client) {
            previous.close();
            tracing::debug!(client_id = %id, "replaced push client");
        } else {
            tracing::debug!(client_id = %id, "registered push client");
        }
    }

    fn unregister(&mut self, client: &Arc<EventClient>) {
        // Only drop the entry if it is still this client; a newer stream for
        // the same session may already have taken the slot.
        let current = self
            .clients
            .get(client.id())
            .is_some_and(|existing| Arc::ptr_eq(existing, client));
        if current {
            self.clients.remove(client.id());
            tracing::debug!(client_id = %client.id(), "unregistered push client");
        }
        client.close();
    }

    /// Returns the number of clients that were dropped.
    fn broadcast(&mut self, event: Event) -> usize {
        let mut dropped = 0;
        self.clients.retain(|id, client| match client.try_enqueue(event.clone()) {
            Ok(()) => true,
            Err(reason) => {
                match reason {
                    EnqueueError::Full => {
                        tracing::warn!(
                            client_id = %id,
                            event_type = %event.event_type,
                            "push queue full, dropping client"
                        );
                    }
                    EnqueueError::Closed => {
                        tracing::warn!(client_id = %id, "push client closed, dropping");
                    }
                }
                client.close();
                dropped += 1;
                false
            }
        });
        dropped
    }

    fn len(&self) -> usize {
        self.clients.len()
    }

    fn close_all(&mut self) -> usize {
        let count = self.clients.len();
        for (_, client) in self.clients.drain() {
            client.close();
        }
        count
    }
}
