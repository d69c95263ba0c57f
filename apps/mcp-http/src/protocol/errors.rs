//! Protocol error codes and the error type handlers return.

use serde_json::json;

use super::envelope::RpcError;

// ── Error code constants ────────────────────────────────────────────

/// Body is JSON but not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// No handler for the requested method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Bad or missing arguments, unknown names, or a capability-disabled operation.
pub const INVALID_PARAMS: i64 = -32602;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by method handlers.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Method not found")]
    MethodNotFound { method: String },

    /// Caller input is wrong.
    #[error("{0}")]
    InvalidParams(String),

    /// The operation exists but the current capability set forbids it.
    #[error("{0}")]
    Unavailable(String),

    /// Backend fault; never shown to the caller verbatim.
    #[error(transparent)]
    Backend(BoxError),
}

impl DispatchError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn missing_argument(name: &str) -> Self {
        Self::InvalidParams(format!("{name} is required"))
    }

    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    /// Wire form of a protocol-level error. `None` for backend faults, which
    /// become transport errors.
    pub fn to_rpc_error(&self) -> Option<RpcError> {
        let (code, data) = match self {
            Self::MethodNotFound { method } => {
                (METHOD_NOT_FOUND, Some(json!({ "method": method })))
            }
            Self::InvalidParams(_) | Self::Unavailable(_) => (INVALID_PARAMS, None),
            Self::Backend(_) => return None,
        };
        Some(RpcError {
            code,
            message: self.to_string(),
            data,
        })
    }
}

/// Wire form of a malformed request.
pub fn invalid_request(reason: &str) -> RpcError {
    RpcError {
        code: INVALID_REQUEST,
        message: "Invalid Request".to_string(),
        data: Some(json!({ "reason": reason })),
    }
}
