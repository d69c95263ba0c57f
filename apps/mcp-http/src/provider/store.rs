use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mcp_common::id::{prefix, MonotonicIds};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::protocol::errors::DispatchError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("note store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DispatchError {
    fn from(err: StoreError) -> Self {
        DispatchError::backend(err)
    }
}

/// Abstraction over wherever notes live.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes, oldest first.
    async fn list(&self) -> Result<Vec<Note>, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<Note>, StoreError>;
    async fn create(&self, title: &str, body: &str) -> Result<Note, StoreError>;
    /// Returns `false` if there was no such note.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Keyed by monotonic ULID-based id, so iteration order is creation order.
pub struct MemoryNoteStore {
    inner: Mutex<Inner>,
}

struct Inner {
    notes: BTreeMap<String, Note>,
    ids: MonotonicIds,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                notes: BTreeMap::new(),
                ids: MonotonicIds::new(prefix::NOTE),
            }),
        }
    }
}

impl Default for MemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn list(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self.inner.lock().notes.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Note>, StoreError> {
        Ok(self.inner.lock().notes.get(id).cloned())
    }

    async fn create(&self, title: &str, body: &str) -> Result<Note, StoreError> {
        let mut inner = self.inner.lock();
        let note = Note {
            id: inner.ids.next_id(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        };
        inner.notes.insert(note.id.clone(), note.clone());
        Ok(note)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().notes.remove(id).is_some())
    }
}
