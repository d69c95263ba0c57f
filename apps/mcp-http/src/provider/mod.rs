//! Capability providers: the business logic behind named operations.

pub mod notes;
pub mod store;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::protocol::context::CallContext;
use crate::protocol::errors::DispatchError;

pub const SERVER_NAME: &str = "mcp-http";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name and version a client announces when it connects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: SERVER_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    pub subscribe: bool,
    pub list_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListChangedCapability {
    pub list_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    pub resources: ResourcesCapability,
    pub tools: ListChangedCapability,
    pub prompts: ListChangedCapability,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            resources: ResourcesCapability {
                subscribe: true,
                list_changed: true,
            },
            tools: ListChangedCapability { list_changed: true },
            prompts: ListChangedCapability { list_changed: true },
        }
    }
}

/// Handshake returned by `initialize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub server_info: ServerInfo,
    pub capabilities: Capabilities,
    pub read_only: bool,
}

/// The operations a transport can route calls to.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    fn server_info(&self) -> ServerInfo;

    /// When set, mutating operations are hidden from discovery and refused.
    fn read_only(&self) -> bool;

    async fn initialize(&self, client: &ClientInfo) -> Result<InitializeResult, DispatchError>;

    async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> Result<Value, DispatchError>;
}
