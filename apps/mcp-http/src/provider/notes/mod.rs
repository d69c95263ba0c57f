//! Notes provider: tools, resources and prompts over a `NoteStore`.

mod prompts;
mod resources;
mod tools;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::store::{Note, NoteStore};
use super::{Capabilities, CapabilityProvider, ClientInfo, InitializeResult, ServerInfo};
use crate::gateway::events::Event;
use crate::protocol::context::CallContext;
use crate::protocol::errors::DispatchError;
use crate::protocol::registry::{decode_params, MethodHandler, MethodRegistry};

/// State shared by every notes handler.
struct Notes {
    store: Arc<dyn NoteStore>,
    read_only: bool,
}

impl Notes {
    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            server_info: ServerInfo::default(),
            capabilities: Capabilities::default(),
            read_only: self.read_only,
        }
    }

    async fn require_note(&self, id: &str) -> Result<Note, DispatchError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DispatchError::invalid_params(format!("Note not found: {id}")))
    }

    /// Tell every open stream the resource list moved.
    fn announce_list_changed(&self, ctx: &CallContext) {
        if let Err(err) = ctx.publish(Event::resources_list_changed()) {
            tracing::warn!(
                session_id = %ctx.session_id,
                error = %err,
                "failed to publish list change"
            );
        }
    }
}

pub struct NotesProvider {
    notes: Arc<Notes>,
    methods: MethodRegistry,
}

impl NotesProvider {
    pub fn new(store: Arc<dyn NoteStore>, read_only: bool) -> Self {
        let notes = Arc::new(Notes { store, read_only });

        let mut methods = MethodRegistry::new();
        methods.register("initialize", Initialize(notes.clone()));
        methods.register("ping", Ping);
        methods.register("tools/list", tools::ListTools(notes.clone()));
        methods.register("tools/call", tools::CallTool(notes.clone()));
        methods.register("resources/list", resources::ListResources(notes.clone()));
        methods.register("resources/read", resources::ReadResource(notes.clone()));
        methods.register("prompts/list", prompts::ListPrompts);
        methods.register("prompts/get", prompts::GetPrompt(notes.clone()));

        Self { notes, methods }
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.methods()
    }
}

#[async_trait]
impl CapabilityProvider for NotesProvider {
    fn server_info(&self) -> ServerInfo {
        ServerInfo::default()
    }

    fn read_only(&self) -> bool {
        self.notes.read_only
    }

    async fn initialize(&self, client: &ClientInfo) -> Result<InitializeResult, DispatchError> {
        tracing::debug!(
            client_name = %client.name,
            client_version = %client.version,
            "initializing notes provider"
        );
        Ok(self.notes.initialize_result())
    }

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        self.methods.call(method, params, ctx).await
    }
}

struct Initialize(Arc<Notes>);

#[async_trait]
impl MethodHandler for Initialize {
    async fn handle(
        &self,
        _params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        serde_json::to_value(self.0.initialize_result()).map_err(DispatchError::backend)
    }
}

struct Ping;

#[async_trait]
impl MethodHandler for Ping {
    async fn handle(
        &self,
        _params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        Ok(json!({}))
    }
}

/// `{name, arguments}` as sent to `tools/call` and `prompts/get`.
#[derive(Debug, Deserialize)]
struct NamedCall {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

impl NamedCall {
    fn decode(params: Option<Value>) -> Result<Self, DispatchError> {
        decode_params(params)
    }

    fn required_str(&self, key: &str) -> Result<&str, DispatchError> {
        self.arguments
            .as_ref()
            .and_then(|args| args.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DispatchError::missing_argument(key))
    }

    fn optional_str(&self, key: &str) -> Option<&str> {
        self.arguments
            .as_ref()
            .and_then(|args| args.get(key))
            .and_then(Value::as_str)
    }
}

/// `{type: "text", text}` content block.
fn text_content(text: impl Into<String>) -> Value {
    json!({ "type": "text", "text": text.into() })
}
