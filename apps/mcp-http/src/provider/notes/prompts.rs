use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{text_content, NamedCall, Notes};
use crate::protocol::context::CallContext;
use crate::protocol::errors::DispatchError;
use crate::protocol::registry::MethodHandler;

const SUMMARIZE_NOTE: &str = "summarize_note";

pub(super) struct ListPrompts;

#[async_trait]
impl MethodHandler for ListPrompts {
    async fn handle(
        &self,
        _params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        Ok(json!({
            "prompts": [{
                "name": SUMMARIZE_NOTE,
                "description": "Summarize a note in a few sentences",
                "arguments": [{
                    "name": "id",
                    "description": "Id of the note to summarize",
                    "required": true
                }]
            }]
        }))
    }
}

pub(super) struct GetPrompt(pub(super) Arc<Notes>);

#[async_trait]
impl MethodHandler for GetPrompt {
    async fn handle(
        &self,
        params: Option<Value>,
        _ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let call = NamedCall::decode(params)?;
        if call.name != SUMMARIZE_NOTE {
            return Err(DispatchError::invalid_params(format!("Unknown prompt: {}", call.name)));
        }

        let id = call.required_str("id")?;
        let note = self.0.require_note(id).await?;
        let text = format!(
            "Summarize the following note in a few sentences.\n\nTitle: {}\n\n{}",
            note.title, note.body
        );

        Ok(json!({
            "description": format!("Summary of note {}", note.id),
            "messages": [{ "role": "user", "content": text_content(text) }]
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::super::tests::{ctx, provider};
    use crate::protocol::errors::DispatchError;
    use crate::provider::CapabilityProvider;

    #[tokio::test]
    async fn list_has_summarize_note() {
        let listed = provider(true).dispatch("prompts/list", None, &ctx()).await.unwrap();
        assert_eq!(listed["prompts"][0]["name"], "summarize_note");
        assert_eq!(listed["prompts"][0]["arguments"][0]["required"], true);
    }

    #[tokio::test]
    async fn get_renders_note_into_message() {
        let p = provider(false);
        let ctx = ctx();
        let created = p
            .dispatch(
                "tools/call",
                Some(json!({
                    "name": "create_note",
                    "arguments": { "title": "Trip", "body": "Pack boots" }
                })),
                &ctx,
            )
            .await
            .unwrap();
        let note: serde_json::Value =
            serde_json::from_str(created["content"][0]["text"].as_str().unwrap()).unwrap();

        let prompt = p
            .dispatch(
                "prompts/get",
                Some(json!({ "name": "summarize_note", "arguments": { "id": note["id"] } })),
                &ctx,
            )
            .await
            .unwrap();
        let message = &prompt["messages"][0];
        assert_eq!(message["role"], "user");
        assert_eq!(message["content"]["type"], "text");
        assert!(message["content"]["text"].as_str().unwrap().contains("Pack boots"));
    }

    #[tokio::test]
    async fn unknown_prompt_is_invalid_params() {
        let err = provider(false)
            .dispatch("prompts/get", Some(json!({ "name": "write_poem" })), &ctx())
            .await
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::InvalidParams(msg) if msg == "Unknown prompt: write_poem")
        );
    }

    #[tokio::test]
    async fn missing_id_is_invalid_params() {
        let err = provider(false)
            .dispatch("prompts/get", Some(json!({ "name": "summarize_note" })), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParams(msg) if msg == "id is required"));
    }
}
