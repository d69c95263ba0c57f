//! Turns a raw request body into exactly one response envelope.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::context::CallContext;
use super::envelope::{RpcRequest, RpcResponse};
use super::errors::{self, BoxError, DispatchError};
use crate::provider::CapabilityProvider;

/// A call that produced no envelope and must fail at the transport level.
#[derive(Debug, thiserror::Error)]
pub enum CallFailure {
    #[error("session cancelled")]
    Cancelled,
    #[error("handler for '{method}' timed out after {timeout:?}")]
    TimedOut { method: String, timeout: Duration },
    #[error("handler for '{method}' failed: {source}")]
    Backend { method: String, source: BoxError },
}

pub struct Dispatcher {
    provider: Arc<dyn CapabilityProvider>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn CapabilityProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn handle(&self, raw: Value, ctx: &CallContext) -> Result<RpcResponse, CallFailure> {
        let request = match RpcRequest::decode(raw) {
            Ok(request) => request,
            Err(invalid) => {
                tracing::debug!(
                    session_id = %ctx.session_id,
                    reason = invalid.reason,
                    "invalid request"
                );
                return Ok(RpcResponse::error(invalid.id, errors::invalid_request(invalid.reason)));
            }
        };
        let RpcRequest { method, params, id, .. } = request;

        let start = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(CallFailure::Cancelled),
            outcome = tokio::time::timeout(
                self.timeout,
                self.provider.dispatch(&method, params, ctx),
            ) => outcome,
        };

        let response = match outcome {
            Ok(Ok(result)) => RpcResponse::success(id, result),
            Ok(Err(DispatchError::Backend(source))) => {
                return Err(CallFailure::Backend { method, source });
            }
            Ok(Err(err)) => match err.to_rpc_error() {
                Some(error) => {
                    tracing::debug!(
                        session_id = %ctx.session_id,
                        method = %method,
                        code = error.code,
                        "call rejected"
                    );
                    RpcResponse::error(id, error)
                }
                None => return Err(CallFailure::Backend { method, source: err.into() }),
            },
            Err(_elapsed) => {
                return Err(CallFailure::TimedOut {
                    method,
                    timeout: self.timeout,
                });
            }
        };

        let duration = start.elapsed();
        if duration.as_secs() >= 5 {
            tracing::warn!(
                session_id = %ctx.session_id,
                method = %method,
                duration_secs = duration.as_secs_f64(),
                "slow RPC request"
            );
        }

        Ok(response)
    }
}
