use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Notes;
use crate::protocol::context::CallContext;
use crate::protocol::errors::DispatchError;
use crate::protocol::registry::{decode_params, MethodHandler};

const SCHEME: &str = "notes://";
const ALL_NOTES_URI: &str = "notes://all";
const MIME_TYPE: &str = "application/json";

pub(super) struct ListResources(pub(super) Arc<Notes>);

#[async_trait]
impl MethodHandler for ListResources {
    async fn handle(
        &self,
        _params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let notes = self.0.store.list().await?;

        let mut resources = Vec::with_capacity(notes.len() + 1);
        resources.push(json!({
            "uri": ALL_NOTES_URI,
            "name": "All notes",
            "description": "Every note in the store",
            "mimeType": MIME_TYPE,
        }));
        resources.extend(notes.iter().map(|note| {
            json!({
                "uri": format!("{SCHEME}{}", note.id),
                "name": note.title,
                "mimeType": MIME_TYPE,
            })
        }));

        Ok(json!({ "resources": resources }))
    }
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    uri: String,
}

pub(super) struct ReadResource(pub(super) Arc<Notes>);

#[async_trait]
impl MethodHandler for ReadResource {
    async fn handle(
        &self,
        params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let ReadParams { uri } = decode_params(params)?;
        let unknown = || DispatchError::invalid_params(format!("Unknown resource URI: {uri}"));

        let text = if uri == ALL_NOTES_URI {
            let notes = self.0.store.list().await?;
            serde_json::to_string_pretty(&notes).map_err(DispatchError::backend)?
        } else {
            let id = uri.strip_prefix(SCHEME).filter(|id| !id.is_empty()).ok_or_else(unknown)?;
            let note = self.0.store.get(id).await?.ok_or_else(unknown)?;
            serde_json::to_string_pretty(&note).map_err(DispatchError::backend)?
        };

        Ok(json!({
            "contents": [{ "uri": uri, "mimeType": MIME_TYPE, "text": text }]
        }))
    }
}
