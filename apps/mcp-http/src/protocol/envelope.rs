//! JSON-RPC 2.0 request and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const JSONRPC_VERSION: &str = "2.0";

/// A decoded call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub params: Option<Value>,
    /// Correlation id, echoed verbatim. `null` when the caller sent none.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub id: Value,
}

/// A body that parsed as JSON but is not a usable request.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRequest {
    /// Whatever id could be recovered from the body.
    pub id: Value,
    pub reason: &'static str,
}

impl RpcRequest {
    pub fn decode(raw: Value) -> Result<Self, InvalidRequest> {
        let Value::Object(mut body) = raw else {
            return Err(InvalidRequest {
                id: Value::Null,
                reason: "request must be a JSON object",
            });
        };

        let id = body.remove("id").unwrap_or(Value::Null);
        let invalid = |reason| InvalidRequest { id: id.clone(), reason };

        let jsonrpc = match body.remove("jsonrpc") {
            None | Some(Value::Null) => None,
            Some(Value::String(v)) if v == JSONRPC_VERSION => Some(v),
            Some(_) => return Err(invalid("jsonrpc must be \"2.0\"")),
        };

        let method = match body.remove("method") {
            Some(Value::String(m)) if !m.is_empty() => m,
            _ => return Err(invalid("method must be a non-empty string")),
        };

        let params = body.remove("params").filter(|p| !p.is_null());

        Ok(Self {
            jsonrpc,
            method,
            params,
            id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

/// Exactly one of `result` and `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[schema(value_type = Object)]
    pub id: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}
