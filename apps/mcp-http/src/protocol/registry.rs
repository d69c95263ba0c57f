//! Method registry: name → handler table used by capability providers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::context::CallContext;
use super::errors::DispatchError;

/// Trait implemented by every method handler.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    async fn handle(
        &self,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> Result<Value, DispatchError>;
}

/// Registry mapping method names to handlers.
pub struct MethodRegistry {
    handlers: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a method name. A later registration wins.
    pub fn register(&mut self, method: &str, handler: impl MethodHandler + 'static) {
        let _ = self.handlers.insert(method.to_owned(), Arc::new(handler));
    }

    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> Result<Value, DispatchError> {
        let handler = self
            .handlers
            .get(method)
            .ok_or_else(|| DispatchError::MethodNotFound {
                method: method.to_owned(),
            })?;
        handler.handle(params, ctx).await
    }

    /// List all registered method names (sorted).
    pub fn methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `params` into `T`; absent params decode from `{}`.
pub fn decode_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, DispatchError> {
    let value = params.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value)
        .map_err(|err| DispatchError::invalid_params(format!("Invalid params: {err}")))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::gateway::hub::EventHub;

    struct EchoHandler;

    #[async_trait]
    impl MethodHandler for EchoHandler {
        async fn handle(
            &self,
            params: Option<Value>,
            _ctx: &CallContext,
        ) -> Result<Value, DispatchError> {
            Ok(params.unwrap_or(json!(null)))
        }
    }

    struct SessionHandler;

    #[async_trait]
    impl MethodHandler for SessionHandler {
        async fn handle(
            &self,
            _params: Option<Value>,
            ctx: &CallContext,
        ) -> Result<Value, DispatchError> {
            Ok(json!({ "session": ctx.session_id }))
        }
    }

    fn ctx() -> CallContext {
        CallContext::new(
            "ses_test",
            CancellationToken::new(),
            EventHub::spawn(CancellationToken::new()),
        )
    }

    #[tokio::test]
    async fn call_registered_method() {
        let mut registry = MethodRegistry::new();
        registry.register("echo", EchoHandler);

        let result = registry.call("echo", Some(json!({ "a": 1 })), &ctx()).await.unwrap();
        assert_eq!(result, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn handler_sees_context() {
        let mut registry = MethodRegistry::new();
        registry.register("whoami", SessionHandler);

        let result = registry.call("whoami", None, &ctx()).await.unwrap();
        assert_eq!(result["session"], "ses_test");
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let registry = MethodRegistry::new();
        let err = registry.call("missing", None, &ctx()).await.unwrap_err();
        assert!(matches!(err, DispatchError::MethodNotFound { method } if method == "missing"));
    }

    #[test]
    fn methods_are_sorted() {
        let mut registry = MethodRegistry::default();
        registry.register("b", EchoHandler);
        registry.register("a", EchoHandler);
        assert_eq!(registry.methods(), vec!["a", "b"]);
    }

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    #[test]
    fn decode_params_reports_shape_errors() {
        let ok: Named = decode_params(Some(json!({ "name": "x" }))).unwrap();
        assert_eq!(ok.name, "x");

        let err = decode_params::<Named>(None).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParams(_)));
    }
}
