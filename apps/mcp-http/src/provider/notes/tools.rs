use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{text_content, NamedCall, Notes};
use crate::protocol::context::CallContext;
use crate::protocol::errors::DispatchError;
use crate::protocol::registry::MethodHandler;

struct ToolDef {
    name: &'static str,
    description: &'static str,
    /// Mutating tools are hidden and refused in read-only mode.
    mutating: bool,
    input_schema: fn() -> Value,
}

const TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "list_notes",
        description: "List every note",
        mutating: false,
        input_schema: no_arguments,
    },
    ToolDef {
        name: "get_note",
        description: "Fetch one note by id",
        mutating: false,
        input_schema: note_id_argument,
    },
    ToolDef {
        name: "create_note",
        description: "Create a note",
        mutating: true,
        input_schema: create_arguments,
    },
    ToolDef {
        name: "delete_note",
        description: "Delete a note by id",
        mutating: true,
        input_schema: note_id_argument,
    },
];

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn note_id_argument() -> Value {
    json!({
        "type": "object",
        "properties": { "id": { "type": "string", "description": "Note id" } },
        "required": ["id"]
    })
}

fn create_arguments() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "Note title" },
            "body": { "type": "string", "description": "Note text" }
        },
        "required": ["title"]
    })
}

fn find_tool(name: &str) -> Option<&'static ToolDef> {
    TOOLS.iter().find(|tool| tool.name == name)
}

pub(super) struct ListTools(pub(super) Arc<Notes>);

#[async_trait]
impl MethodHandler for ListTools {
    async fn handle(
        &self,
        _params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let read_only = self.0.read_only;
        let tools: Vec<Value> = TOOLS
            .iter()
            .filter(|tool| !(read_only && tool.mutating))
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": (tool.input_schema)(),
                })
            })
            .collect();
        Ok(json!({ "tools": tools }))
    }
}

pub(super) struct CallTool(pub(super) Arc<Notes>);

#[async_trait]
impl MethodHandler for CallTool {
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let call = NamedCall::decode(params)?;
        let tool = find_tool(&call.name)
            .ok_or_else(|| DispatchError::invalid_params(format!("Unknown tool: {}", call.name)))?;
        if tool.mutating && self.0.read_only {
            return Err(DispatchError::Unavailable(
                "Tool not available in read-only mode".to_string(),
            ));
        }

        let notes = &self.0;
        let text = match tool.name {
            "list_notes" => to_pretty(&notes.store.list().await?)?,
            "get_note" => {
                let id = call.required_str("id")?;
                to_pretty(&notes.require_note(id).await?)?
            }
            "create_note" => {
                let title = call.required_str("title")?;
                let body = call.optional_str("body").unwrap_or_default();
                let note = notes.store.create(title, body).await?;
                tracing::info!(session_id = %ctx.session_id, note_id = %note.id, "note created");
                notes.announce_list_changed(ctx);
                to_pretty(&note)?
            }
            "delete_note" => {
                let id = call.required_str("id")?;
                if !notes.store.delete(id).await? {
                    return Err(DispatchError::invalid_params(format!("Note not found: {id}")));
                }
                tracing::info!(session_id = %ctx.session_id, note_id = %id, "note deleted");
                notes.announce_list_changed(ctx);
                format!("Deleted note {id}")
            }
            other => return Err(DispatchError::invalid_params(format!("Unknown tool: {other}"))),
        };

        Ok(json!({ "content": [text_content(text)] }))
    }
}

fn to_pretty<T: serde::Serialize>(value: &T) -> Result<String, DispatchError> {
    serde_json::to_string_pretty(value).map_err(DispatchError::backend)
}
