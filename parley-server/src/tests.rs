//! Router-level tests: requests go through the full middleware stack into a
//! mocked completion provider.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_test::traced_test;
use wiremock::matchers::{body_partial_json, header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::Config;
use crate::middleware::trace::X_TRACE_ID;
use crate::routes;
use crate::state::AppState;
use parley_core::{ProviderConfig, DEFAULT_GREETING};

const BOUNDARY: &str = "parley-test-boundary";

fn test_config(server_uri: &str, upload_dir: &Path) -> Config {
    Config {
        bind_address: "127.0.0.1:0".into(),
        log_level: "debug".into(),
        log_json: false,
        cors_allowed_origins: None,
        enable_swagger: true,
        provider: ProviderConfig {
            endpoint: format!("{server_uri}/chat/completions"),
            api_key: "test-key".into(),
            model: "vision-model".into(),
            timeout: Some(Duration::from_secs(5)),
        },
        max_upload_bytes: 1024,
        upload_dir: upload_dir.to_path_buf(),
        greeting: Some(DEFAULT_GREETING.into()),
    }
}

fn app(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config).expect("state builds"));
    (routes::build(Arc::clone(&state)), state)
}

fn reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
    }))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

fn upload_request(file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/v1/composer/attachment")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}

#[tokio::test]
async fn fresh_conversation_shows_greeting_and_idle_phase() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    let (status, body) = call(&app, empty_request(Method::GET, "/v1/conversation")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "idle");
    assert_eq!(body["sending"], false);
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["messages"][0]["role"], "assistant");
    assert_eq!(body["messages"][0]["content"], DEFAULT_GREETING);
}

#[tokio::test]
async fn text_send_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header_eq("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "messages": [{ "role": "user", "content": [{ "type": "text", "text": "hello" }] }]
        })))
        .respond_with(reply("Hi there"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    let (status, composer) = call(
        &app,
        json_request(Method::PUT, "/v1/composer/text", json!({ "text": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(composer["text"], "hello");

    let (status, sent) = call(&app, empty_request(Method::POST, "/v1/composer/send")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["resolution"], "replied");
    assert_eq!(sent["user"]["content"], "hello");
    assert_eq!(sent["reply"]["content"], "Hi there");

    let (_, view) = call(&app, empty_request(Method::GET, "/v1/conversation")).await;
    let roles: Vec<&str> = view["messages"]
        .as_array()
        .expect("messages array")
        .iter()
        .filter_map(|m| m["role"].as_str())
        .collect();
    assert_eq!(roles, ["assistant", "user", "assistant"]);
    assert_eq!(view["composer"]["text"], "");
    assert_eq!(view["phase"], "idle");
}

#[tokio::test]
async fn empty_send_is_bad_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("unused"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = app(test_config(&server.uri(), dir.path()));

    call(
        &app,
        json_request(Method::PUT, "/v1/composer/text", json!({ "text": "   " })),
    )
    .await;
    let (status, body) = call(&app, empty_request(Method::POST, "/v1/composer/send")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(state.orchestrator.store().len(), 1);
    assert_eq!(state.orchestrator.composer().text, "   ");
}

#[tokio::test]
async fn provider_failure_is_reported_in_conversation_not_as_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    call(
        &app,
        json_request(Method::PUT, "/v1/composer/text", json!({ "text": "hi" })),
    )
    .await;
    let (status, sent) = call(&app, empty_request(Method::POST, "/v1/composer/send")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["resolution"], "failed");
    let content = sent["reply"]["content"].as_str().expect("reply content");
    assert!(content.starts_with("Error: "), "got {content}");
}

#[tokio::test]
async fn image_upload_then_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [{
                "role": "user",
                "content": [{
                    "type": "image_url",
                    "image_url": { "url": "data:image/png;base64,iVBORw==" }
                }]
            }]
        })))
        .respond_with(reply("A tiny picture"))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    let (status, composer) = call(&app, upload_request("dot.png", "image/png", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(composer["attachment"]["name"], "dot.png");
    assert_eq!(composer["attachment"]["mime_type"], "image/png");
    assert_eq!(
        composer["attachment"]["preview"],
        "data:image/png;base64,iVBORw=="
    );

    let (_, view) = call(&app, empty_request(Method::GET, "/v1/conversation")).await;
    assert_eq!(view["phase"], "composing");

    let (status, sent) = call(&app, empty_request(Method::POST, "/v1/composer/send")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["reply"]["content"], "A tiny picture");
    assert_eq!(sent["user"]["attachment"]["name"], "dot.png");

    let (_, view) = call(&app, empty_request(Method::GET, "/v1/conversation")).await;
    assert!(view["composer"]["attachment"].is_null());
}

#[tokio::test]
async fn unsupported_upload_is_rejected() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = app(test_config(&server.uri(), dir.path()));

    let (status, body) = call(&app, upload_request("song.mp3", "audio/mpeg", b"ID3")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("song.mp3")));
    assert!(state.orchestrator.composer().attachment.is_none());
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = app(test_config(&server.uri(), dir.path()));

    let (status, _) = call(&app, upload_request("big.txt", "text/plain", &[b'a'; 2048])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(state.orchestrator.composer().attachment.is_none());
}

#[tokio::test]
async fn clearing_attachment_returns_empty_composer() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    call(&app, upload_request("notes.txt", "text/plain", b"remember")).await;
    let (status, composer) =
        call(&app, empty_request(Method::DELETE, "/v1/composer/attachment")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(composer["attachment"].is_null());
}

#[tokio::test]
async fn second_send_while_first_in_flight_conflicts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(reply("slow answer").set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = app(test_config(&server.uri(), dir.path()));

    call(
        &app,
        json_request(Method::PUT, "/v1/composer/text", json!({ "text": "first" })),
    )
    .await;
    let first = {
        let app = app.clone();
        tokio::spawn(async move { call(&app, empty_request(Method::POST, "/v1/composer/send")).await })
    };
    while !state.orchestrator.is_sending() {
        tokio::task::yield_now().await;
    }

    let (_, view) = call(&app, empty_request(Method::GET, "/v1/conversation")).await;
    assert_eq!(view["phase"], "sending");
    assert_eq!(view["sending"], true);

    let (status, body) = call(&app, empty_request(Method::POST, "/v1/composer/send")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "a message is already being sent");

    let (status, sent) = first.await.expect("first send task");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["reply"]["content"], "slow answer");
    assert_eq!(state.orchestrator.store().len(), 3);
}

#[tokio::test]
#[traced_test]
async fn trace_id_is_echoed_or_generated() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    let supplied = "0b7e1f52-3f7c-4b8e-9a57-3f1c1f0e9d11";
    let req = Request::builder()
        .uri("/health")
        .header(X_TRACE_ID, supplied)
        .body(Body::empty())
        .expect("request builds");
    let response = app.clone().oneshot(req).await.expect("router is infallible");
    assert_eq!(response.headers()[X_TRACE_ID], supplied);

    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/health"))
        .await
        .expect("router is infallible");
    let generated = response.headers()[X_TRACE_ID].to_str().expect("ascii header");
    assert!(uuid::Uuid::parse_str(generated).is_ok());
    assert!(logs_contain("response finished"));
}

#[tokio::test]
async fn openapi_document_lists_composer_routes() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _) = app(test_config(&server.uri(), dir.path()));

    let (status, doc) = call(&app, empty_request(Method::GET, "/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    for route in [
        "/v1/conversation",
        "/v1/composer/text",
        "/v1/composer/attachment",
        "/v1/composer/send",
        "/health",
    ] {
        assert!(doc["paths"].get(route).is_some(), "missing {route}");
    }
}
