mod common;

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

async fn health_connections(client: &reqwest::Client, addr: SocketAddr) -> u64 {
    let body: serde_json::Value = client
        .get(format!("http://{addr}/api/v1/health"))
        .send()
        .await
        .expect("health request")
        .json()
        .await
        .expect("parse health");
    body["connections"].as_u64().unwrap()
}

/// Poll /health until it reports `expected` open streams.
async fn wait_for_connections(client: &reqwest::Client, addr: SocketAddr, expected: u64) {
    let mut last = u64::MAX;
    for _ in 0..100 {
        last = health_connections(client, addr).await;
        if last == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {expected} connections, last saw {last}");
}

async fn create_note(client: &reqwest::Client, addr: SocketAddr, session_id: &str, title: &str) {
    let resp = common::http_rpc(
        client,
        addr,
        session_id,
        json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": { "name": "create_note", "arguments": { "title": title } },
            "id": 1
        }),
    )
    .await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body.get("error").is_none(), "unexpected error: {body}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_headers_and_connected_frame() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();
    let session_id = common::http_connect(&client, addr).await;

    let resp = common::open_stream_response(&client, addr, &session_id).await;
    let headers = resp.headers();
    assert!(headers["content-type"].to_str().unwrap().starts_with("text/event-stream"));
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");

    let mut stream = common::SseReader::from_reqwest(resp);
    let frame = stream.next_frame_within(WAIT).await.expect("connected frame");
    assert_eq!(frame.event, "connected");
    assert_eq!(frame.json(), json!({ "sessionId": session_id }));
    assert!(stream.transcript().starts_with(b"event: connected\n"));
}

#[tokio::test]
async fn stream_requires_valid_session() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("http://{addr}/api/v1/events"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = client
        .get(format!("http://{addr}/api/v1/events"))
        .header("X-Session-ID", "ses_unknown")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_session_lifecycle() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();
    let session_id = common::http_connect(&client, addr).await;

    // Unknown method comes back as a protocol error with a null id.
    let resp =
        common::http_rpc(&client, addr, &session_id, json!({ "method": "does-not-exist" })).await;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], serde_json::Value::Null);

    let mut stream = common::open_stream(&client, addr, &session_id).await;
    let first = stream.next_frame_within(WAIT).await.unwrap();
    assert_eq!(first.event, "connected");
    assert!(stream.transcript().starts_with(b"event: connected\n"));

    // The test config pings every 100 ms. A ping has no data line.
    stream.wait_for_bytes(b"\n\nevent: ping\n\n", WAIT).await;

    let resp = client
        .post(format!("http://{addr}/api/v1/disconnect"))
        .header("X-Session-ID", &session_id)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    // Stream ends; any remaining pings drain first.
    let ended = tokio::time::timeout(WAIT, async {
        while stream.next_frame().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok(), "stream should end after disconnect");

    let resp =
        common::http_rpc(&client, addr, &session_id, json!({ "method": "ping", "id": 1 })).await;
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn broadcast_reaches_every_stream() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();
    let s1 = common::http_connect(&client, addr).await;
    let s2 = common::http_connect(&client, addr).await;

    let mut stream1 = common::open_stream(&client, addr, &s1).await;
    let mut stream2 = common::open_stream(&client, addr, &s2).await;
    stream1.next_event("connected", WAIT).await;
    stream2.next_event("connected", WAIT).await;
    wait_for_connections(&client, addr, 2).await;

    create_note(&client, addr, &s1, "shared").await;

    stream1.next_event("notifications/resources/list_changed", WAIT).await;
    stream2.next_event("notifications/resources/list_changed", WAIT).await;
}

#[tokio::test]
async fn closing_one_stream_leaves_the_other() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();
    let s1 = common::http_connect(&client, addr).await;
    let s2 = common::http_connect(&client, addr).await;

    let mut stream1 = common::open_stream(&client, addr, &s1).await;
    let mut stream2 = common::open_stream(&client, addr, &s2).await;
    stream1.next_event("connected", WAIT).await;
    stream2.next_event("connected", WAIT).await;
    wait_for_connections(&client, addr, 2).await;

    drop(stream1);
    wait_for_connections(&client, addr, 1).await;

    // s1 is still a live session even though its stream is gone.
    create_note(&client, addr, &s1, "after close").await;
    stream2.next_event("notifications/resources/list_changed", WAIT).await;
}

#[tokio::test]
async fn reopening_stream_replaces_previous() {
    let addr = common::start_server(common::test_state()).await;
    let client = reqwest::Client::new();
    let session_id = common::http_connect(&client, addr).await;

    let mut first = common::open_stream(&client, addr, &session_id).await;
    first.next_event("connected", WAIT).await;

    let mut second = common::open_stream(&client, addr, &session_id).await;
    second.next_event("connected", WAIT).await;

    let ended = tokio::time::timeout(WAIT, async {
        while first.next_frame().await.is_some() {}
    })
    .await;
    assert!(ended.is_ok(), "older stream should end");

    wait_for_connections(&client, addr, 1).await;
    create_note(&client, addr, &session_id, "still delivered").await;
    second.next_event("notifications/resources/list_changed", WAIT).await;
}
