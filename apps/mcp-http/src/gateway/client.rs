//! Per-session push client.
//!
//! An `EventClient` owns a bounded outbound queue and a drain task that writes
//! queued events onto one live SSE response. The Hub only ever enqueues, so a
//! slow consumer fills its own queue and nothing else.

use std::convert::Infallible;
use std::sync::{Arc, Weak};

use axum::response::sse::Event as SseFrame;
use futures_util::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::events::{Event, EventError};

/// Default capacity of a client's outbound queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Frames buffered between the client and the HTTP response body.
const CONNECTION_BUFFER: usize = 16;

/// Body stream handed to `axum::response::sse::Sse`.
pub type FrameStream = BoxStream<'static, Result<SseFrame, Infallible>>;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("client is closed")]
    Closed,
    #[error("peer disconnected")]
    Disconnected,
    #[error(transparent)]
    Event(#[from] EventError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("outbound queue is full")]
    Full,
    #[error("client is closed")]
    Closed,
}

pub struct EventClient {
    /// Same as the owning session's id.
    id: String,
    /// `None` once the client is closed.
    queue: Mutex<Option<mpsc::Sender<Event>>>,
    connection: mpsc::Sender<SseFrame>,
    /// Serializes writers so frames never interleave and none follow `close`.
    write_lock: tokio::sync::Mutex<()>,
    closed: CancellationToken,
}

impl EventClient {
    /// Create a client and the SSE body it writes to.
    ///
    /// Spawns the drain task, so this must run inside a Tokio runtime.
    pub fn new(id: impl Into<String>, queue_capacity: usize) -> (Arc<Self>, FrameStream) {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        let (frame_tx, frame_rx) = mpsc::channel(CONNECTION_BUFFER);

        let client = Arc::new(Self {
            id: id.into(),
            queue: Mutex::new(Some(queue_tx)),
            connection: frame_tx,
            write_lock: tokio::sync::Mutex::new(()),
            closed: CancellationToken::new(),
        });

        tokio::spawn(drain(Arc::downgrade(&client), queue_rx));

        let body = frame_stream(frame_rx, client.closed.clone());
        (client, body)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Write one event straight to the connection.
    pub async fn send(&self, event: &Event) -> Result<(), SendError> {
        let _guard = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(SendError::Closed),
            guard = self.write_lock.lock() => guard,
        };
        if self.is_closed() {
            return Err(SendError::Closed);
        }

        let frame = event.to_frame()?;

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(SendError::Closed),
            sent = self.connection.send(frame) => sent.map_err(|_| SendError::Disconnected),
        }
    }

    /// Non-blocking push onto the outbound queue.
    pub fn try_enqueue(&self, event: Event) -> Result<(), EnqueueError> {
        let queue = self.queue.lock();
        let Some(tx) = queue.as_ref() else {
            return Err(EnqueueError::Closed);
        };
        tx.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => EnqueueError::Full,
            TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Close the client. Idempotent.
    ///
    /// Releases the queue (ending the drain task) and ends the SSE body.
    pub fn close(&self) {
        self.closed.cancel();
        self.queue.lock().take();
    }

    /// Resolves once the client has been closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Resolves once the HTTP consumer has dropped the response body.
    pub async fn closed_by_peer(&self) {
        self.connection.closed().await
    }
}

impl std::fmt::Debug for EventClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventClient")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn drain(client: Weak<EventClient>, mut queue: mpsc::Receiver<Event>) {
    while let Some(event) = queue.recv().await {
        let Some(client) = client.upgrade() else {
            break;
        };
        match client.send(&event).await {
            Ok(()) => {}
            Err(SendError::Event(err)) => {
                tracing::warn!(client_id = %client.id, error = %err, "skipping unrenderable event");
            }
            Err(err) => {
                tracing::debug!(client_id = %client.id, error = %err, "drain stopped");
                break;
            }
        }
    }
}

fn frame_stream(frames: mpsc::Receiver<SseFrame>, closed: CancellationToken) -> FrameStream {
    stream::unfold((frames, closed), |(mut frames, closed)| async move {
        // Frames already buffered still go out before the body ends.
        let next = tokio::select! {
            biased;
            frame = frames.recv() => frame,
            _ = closed.cancelled() => None,
        };
        next.map(|frame| (Ok(frame), (frames, closed)))
    })
    .boxed()
}
