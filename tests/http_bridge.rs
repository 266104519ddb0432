use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use chat_stream_bridge::config::parse_config;
use chat_stream_bridge::routing::dispatch_request;
use chat_stream_bridge::state::AppState;

/// Mock backend: reports how many messages it received, then the canned tail.
async fn spawn_backend(status: StatusCode, tail: &'static str) -> String {
    let app = Router::new().route(
        "/chat",
        post(move |Json(request): Json<Value>| async move {
            let received = request["messages"].as_array().map_or(0, Vec::len);
            let roles: Vec<String> = request["messages"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|m| m["role"].as_str().map(str::to_owned))
                .collect();
            let body = format!(
                "data: {}\n\n{tail}",
                json!({"content": format!("{received}:{}", roles.join(","))})
            );
            (status, [("content-type", "text/event-stream")], body)
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn bridge(backend_url: &str, extra: &str) -> Arc<AppState> {
    let config = parse_config(&format!(
        "server:\n  base_path: /dash\nbackend:\n  base_url: {backend_url}\n{extra}"
    ))
    .unwrap();
    Arc::new(AppState::new(config).unwrap())
}

async fn call(state: &Arc<AppState>, method: Method, path: &str, body: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    let response = dispatch_request(Arc::clone(state), request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn frames(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .filter(|f| !f.is_empty())
        .map(|f| f.strip_prefix("data: ").unwrap())
        .collect()
}

const CHAT_BODY: &str = r#"{"messages":[
    {"role":"system","content":"rules"},
    {"role":"user","parts":[{"type":"text","text":"show signups"}]},
    {"role":"assistant","parts":[{"type":"text","text":"   "}]},
    {"role":"assistant","content":"sure"}
]}"#;

#[tokio::test]
async fn chat_streams_adapted_chunks() {
    let backend = spawn_backend(StatusCode::OK, "data: [DONE]\n\n").await;
    let state = bridge(&backend, "");
    let (status, headers, body) = call(&state, Method::POST, "/dash/api/chat", CHAT_BODY).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/event-stream");
    assert_eq!(headers["x-vercel-ai-ui-message-stream"], "v1");

    let frames = frames(&body);
    assert_eq!(frames.last(), Some(&"[DONE]"));
    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|f| serde_json::from_str(f).unwrap())
        .collect();
    let kinds: Vec<&str> = chunks.iter().map(|c| c["type"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        vec!["start", "text-start", "text-delta", "text-end", "finish"]
    );
    assert_eq!(chunks[2]["delta"], "2:user,assistant");
    let message_id = chunks[0]["messageId"].as_str().unwrap();
    assert!(message_id.starts_with("msg_"));
    assert_eq!(chunks[1]["id"], format!("{message_id}-text"));
}

#[tokio::test]
async fn done_sentinel_can_be_disabled() {
    let backend = spawn_backend(StatusCode::OK, "").await;
    let state = bridge(&backend, "features:\n  emit_done_sentinel: false\n");
    let (status, _, body) = call(&state, Method::POST, "/dash/api/chat", CHAT_BODY).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("[DONE]"));
    assert!(body.ends_with("data: {\"type\":\"finish\"}\n\n"));
}

#[tokio::test]
async fn backend_error_status_is_mapped() {
    let backend = spawn_backend(StatusCode::SERVICE_UNAVAILABLE, "").await;
    let state = bridge(&backend, "");
    let (status, _, body) = call(&state, Method::POST, "/dash/api/chat", CHAT_BODY).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["type"], "backend_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("status=503"));
}

#[tokio::test]
async fn request_validation_and_routing() {
    let state = bridge("http://127.0.0.1:1", "");

    let (status, _, _) = call(&state, Method::POST, "/dash/api/chat", "{nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = call(
        &state,
        Method::POST,
        "/dash/api/chat",
        r#"{"messages":[{"role":"system","content":"only rules"}]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("invalid_request_error"));

    let (status, _, _) = call(&state, Method::GET, "/dash/api/chat", "").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = call(&state, Method::POST, "/api/chat", CHAT_BODY).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let oversized = format!(r#"{{"messages":[{{"role":"user","content":"{}"}}]}}"#, "a".repeat(3 * 1024 * 1024));
    let (status, _, _) = call(&state, Method::POST, "/dash/api/chat", &oversized).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _, _) = call(&state, Method::POST, "/dash/api/chat", CHAT_BODY).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn health_reports_config_summary() {
    let state = bridge("http://127.0.0.1:9", "");
    let (status, _, body) = call(&state, Method::GET, "/dash", "").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "chat-bridge is running");
    assert_eq!(body["config"]["backend_chat_url"], "http://127.0.0.1:9/chat");
    assert_eq!(body["config"]["base_path"], "/dash");
    assert_eq!(body["config"]["features"]["emit_done_sentinel"], true);
}
