use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcp_http::config::Config;
use mcp_http::provider::notes::NotesProvider;
use mcp_http::provider::store::MemoryNoteStore;
use mcp_http::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing; env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        read_only = config.read_only,
        idle_secs = config.session_idle_timeout.as_secs(),
        ping_secs = config.ping_interval.as_secs(),
        "mcp-http configured"
    );

    let provider = Arc::new(NotesProvider::new(Arc::new(MemoryNoteStore::new()), config.read_only));
    let state = AppState::new(config, provider);
    let app = mcp_http::app(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");
    tracing::info!(%addr, "mcp-http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .expect("server error");

    tracing::info!("graceful shutdown complete");
}

/// Resolves on SIGINT or SIGTERM, after tearing down every session so open
/// event streams end and the server can drain.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    state.shutdown();
}
