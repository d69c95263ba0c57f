pub mod health;
pub mod rpc;
pub mod session;

use axum::middleware;
use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    let session_routes = session::router()
        .merge(rpc::router())
        .merge(crate::gateway::server::router())
        .layer(middleware::from_fn(crate::middleware::authorize));

    Router::new().nest("/api/v1", health::router().merge(session_routes))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "mcp-http",
        description = "Session-scoped JSON-RPC over HTTP with server-sent events"
    ),
    paths(
        // Health
        health::health,
        // Sessions
        session::connect,
        session::disconnect,
        // RPC
        rpc::rpc,
        // Events
        crate::gateway::server::open_stream,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Protocol
            crate::protocol::envelope::RpcRequest,
            crate::protocol::envelope::RpcResponse,
            crate::protocol::envelope::RpcError,
            crate::provider::ClientInfo,
            crate::provider::ServerInfo,
            crate::provider::Capabilities,
            crate::provider::ResourcesCapability,
            crate::provider::ListChangedCapability,
            // Route request/response types
            health::HealthResponse,
            session::ConnectRequest,
            session::ConnectResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Sessions", description = "Session lifecycle"),
        (name = "RPC", description = "JSON-RPC calls"),
        (name = "Events", description = "Server-sent event stream"),
    )
)]
pub struct ApiDoc;
