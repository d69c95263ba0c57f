//! SSE reader shared by the unit tests and the integration tests.
//!
//! Frames are decoded with `eventsource-stream`, so only frames carrying a
//! `data:` line are surfaced. Everything received is also kept verbatim in a
//! byte transcript, which is how data-less frames such as `ping` are observed.

#![allow(dead_code)]

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::response::IntoResponse;
use eventsource_stream::Eventsource;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;

/// One dispatched SSE event.
#[derive(Debug, Clone)]
pub struct Frame {
    pub event: String,
    /// Last event id seen on the stream; empty if none was ever sent.
    pub id: String,
    pub data: String,
}

impl Frame {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.data).expect("frame data is JSON")
    }
}

impl From<eventsource_stream::Event> for Frame {
    fn from(event: eventsource_stream::Event) -> Self {
        Self {
            event: event.event,
            id: event.id,
            data: event.data,
        }
    }
}

pub struct SseReader {
    events: BoxStream<'static, Option<Frame>>,
    transcript: Arc<Mutex<Vec<u8>>>,
}

impl SseReader {
    /// Read any chunked byte body.
    pub fn new<S, B, E>(body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        let transcript = Arc::new(Mutex::new(Vec::new()));
        let raw = Arc::clone(&transcript);

        let events = body
            .map(|chunk| chunk.map_err(|err| err.to_string()))
            .inspect(move |chunk| {
                if let Ok(bytes) = chunk {
                    raw.lock().extend_from_slice(bytes.as_ref());
                }
            })
            .eventsource()
            .map(|event| event.ok().map(Frame::from))
            .boxed();

        Self { events, transcript }
    }

    /// Render an in-process response (e.g. `Sse::new(frames)`) and read it.
    pub fn from_response(response: impl IntoResponse) -> Self {
        Self::new(response.into_response().into_body().into_data_stream())
    }

    /// Read a live HTTP response.
    pub fn from_reqwest(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Next dispatched frame, or `None` once the stream ends.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        self.events.next().await.flatten()
    }

    /// Like `next_frame`, bounded by a timeout.
    pub async fn next_frame_within(&mut self, limit: Duration) -> Option<Frame> {
        tokio::time::timeout(limit, self.next_frame())
            .await
            .expect("timed out waiting for a frame")
    }

    /// Skip frames until one of `event_type` arrives.
    pub async fn next_event(&mut self, event_type: &str, limit: Duration) -> Frame {
        tokio::time::timeout(limit, async {
            loop {
                let frame = self.next_frame().await.expect("stream ended early");
                if frame.event == event_type {
                    return frame;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
    }

    /// Keep reading until the raw transcript contains `needle`. Dispatched
    /// frames read along the way are discarded.
    pub async fn wait_for_bytes(&mut self, needle: &[u8], limit: Duration) {
        let found = tokio::time::timeout(limit, async {
            loop {
                if self.transcript_contains(needle) {
                    return true;
                }
                // Data-less frames never come out of `next`, so poll in slices.
                match tokio::time::timeout(Duration::from_millis(20), self.events.next()).await {
                    Ok(None) => return self.transcript_contains(needle),
                    Ok(Some(_)) | Err(_) => {}
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(found, "never saw {:?}", String::from_utf8_lossy(needle));
    }

    /// Everything received so far, byte for byte.
    pub fn transcript(&self) -> Vec<u8> {
        self.transcript.lock().clone()
    }

    fn transcript_contains(&self, needle: &[u8]) -> bool {
        self.transcript
            .lock()
            .windows(needle.len())
            .any(|window| window == needle)
    }
}
