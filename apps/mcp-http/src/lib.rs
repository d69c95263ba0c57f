pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod protocol;
pub mod provider;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use config::Config;
use gateway::hub::EventHub;
use gateway::registry::SessionRegistry;
use protocol::dispatcher::Dispatcher;
use provider::CapabilityProvider;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub hub: EventHub,
    pub dispatcher: Arc<Dispatcher>,
    pub provider: Arc<dyn CapabilityProvider>,
    /// Stops the hub and the expiry sweep.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build the state and start its background tasks (hub actor, expiry
    /// sweep). Must run inside a Tokio runtime.
    pub fn new(config: Config, provider: Arc<dyn CapabilityProvider>) -> Self {
        let shutdown = CancellationToken::new();
        let hub = EventHub::spawn(shutdown.clone());
        let sessions = Arc::new(SessionRegistry::new(hub.clone(), config.session_idle_timeout));
        sessions.spawn_sweeper(config.sweep_interval, shutdown.clone());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&provider), config.handler_timeout));

        Self {
            config: Arc::new(config),
            sessions,
            hub,
            dispatcher,
            provider,
            shutdown,
        }
    }

    /// Tear down every session, then stop the background tasks.
    pub fn shutdown(&self) {
        let open = self.sessions.len();
        self.sessions.shutdown();
        self.shutdown.cancel();
        tracing::info!(sessions = open, "state shut down");
    }
}

/// The full HTTP application: routes plus CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .make_span_with(middleware::request_span)
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    Router::new()
        .merge(routes::router())
        .layer(cors)
        .layer(trace)
        .with_state(state)
}
