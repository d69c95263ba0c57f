#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use axum_test::TestServer;
use serde_json::{json, Value};

use mcp_http::config::Config;
use mcp_http::provider::notes::NotesProvider;
use mcp_http::provider::store::MemoryNoteStore;
use mcp_http::AppState;

#[path = "../../src/gateway/test_support.rs"]
mod sse;

pub use sse::{Frame, SseReader};

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("x-session-id");

/// Defaults with a short ping so stream tests don't wait 30 s.
pub fn test_config() -> Config {
    Config {
        ping_interval: Duration::from_millis(100),
        ..Config::default()
    }
}

/// Build an AppState backed by an empty in-memory note store.
pub fn test_state_with(config: Config) -> AppState {
    let provider = Arc::new(NotesProvider::new(Arc::new(MemoryNoteStore::new()), config.read_only));
    AppState::new(config, provider)
}

pub fn test_state() -> AppState {
    test_state_with(test_config())
}

pub fn test_server(state: AppState) -> TestServer {
    TestServer::new(mcp_http::app(state)).unwrap()
}

/// Establish a session and return its id.
pub async fn connect(server: &TestServer) -> String {
    let resp = server
        .post("/api/v1/connect")
        .json(&json!({ "clientInfo": { "name": "test-client", "version": "0.0.1" } }))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    body["sessionId"].as_str().unwrap().to_string()
}

/// Send one JSON-RPC call and return the envelope.
pub async fn rpc(server: &TestServer, session_id: &str, body: Value) -> Value {
    let resp = server
        .post("/api/v1/rpc")
        .add_header(SESSION_HEADER, session_id)
        .json(&body)
        .await;
    resp.assert_status_ok();
    resp.json()
}

// ---------------------------------------------------------------------------
// Real TCP server, for the event stream
// ---------------------------------------------------------------------------

/// Start an actual TCP server. The server runs in the background.
pub async fn start_server(state: AppState) -> SocketAddr {
    let app = mcp_http::app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

pub async fn http_connect(client: &reqwest::Client, addr: SocketAddr) -> String {
    let body: Value = client
        .post(format!("http://{addr}/api/v1/connect"))
        .json(&json!({ "clientInfo": { "name": "stream-client", "version": "1.0" } }))
        .send()
        .await
        .expect("connect request")
        .json()
        .await
        .expect("parse connect response");
    body["sessionId"].as_str().unwrap().to_string()
}

pub async fn http_rpc(
    client: &reqwest::Client,
    addr: SocketAddr,
    session_id: &str,
    body: Value,
) -> reqwest::Response {
    client
        .post(format!("http://{addr}/api/v1/rpc"))
        .header("X-Session-ID", session_id)
        .json(&body)
        .send()
        .await
        .expect("rpc request")
}

/// `GET /events`, returning the raw response so headers can be checked.
pub async fn open_stream_response(
    client: &reqwest::Client,
    addr: SocketAddr,
    session_id: &str,
) -> reqwest::Response {
    let resp = client
        .get(format!("http://{addr}/api/v1/events"))
        .header("X-Session-ID", session_id)
        .send()
        .await
        .expect("events request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    resp
}

pub async fn open_stream(
    client: &reqwest::Client,
    addr: SocketAddr,
    session_id: &str,
) -> SseReader {
    SseReader::from_reqwest(open_stream_response(client, addr, session_id).await)
}
