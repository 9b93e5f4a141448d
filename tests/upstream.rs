use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use songplan::config::Config;
use songplan::llm::{
    GenerationRequest, ModelApi, ModelContent, OpenAiClient, OutputFormat, UpstreamError,
};

const TEST_KEY: &str = "sk-test-0123456789abcdef";

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<Value>>>,
}

async fn responses(State(stub): State<Stub>, Json(request): Json<Value>) -> (StatusCode, String) {
    stub.seen.lock().unwrap().push(request);
    (stub.status, stub.body.clone())
}

/// Serve a fixed reply on `/v1/responses` from an ephemeral local port.
async fn spawn_stub(status: StatusCode, body: String) -> (SocketAddr, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub {
        status,
        body,
        seen: seen.clone(),
    };
    let router = Router::new()
        .route("/v1/responses", post(responses))
        .with_state(stub);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, seen)
}

fn client_for(addr: SocketAddr) -> OpenAiClient {
    let config = Config {
        api_key: Some(TEST_KEY.to_string()),
        api_base: format!("http://{}/v1", addr),
        timeout_ms: 5_000,
        max_detail_chars: 500,
        ..Config::default()
    };
    OpenAiClient::new(&config).unwrap()
}

fn json_object_request() -> GenerationRequest {
    GenerationRequest {
        system: "system text".to_string(),
        user: "user text".to_string(),
        format: OutputFormat::JsonObject,
        max_output_tokens: 256,
        temperature: Some(0.2),
    }
}

#[tokio::test]
async fn rate_limit_status_and_truncated_body_surface() {
    let body = format!("{} key={}", "x".repeat(10_000), TEST_KEY);
    let (addr, _) = spawn_stub(StatusCode::TOO_MANY_REQUESTS, body).await;

    let err = client_for(addr)
        .generate(&json_object_request())
        .await
        .unwrap_err();

    match err {
        UpstreamError::Status { status, body } => {
            assert_eq!(status, 429);
            assert_eq!(body.chars().count(), 500);
            assert!(!body.contains(TEST_KEY));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn error_body_echoing_the_key_is_redacted() {
    let body = format!(r#"{{"error":{{"message":"Incorrect API key provided: {}"}}}}"#, TEST_KEY);
    let (addr, _) = spawn_stub(StatusCode::UNAUTHORIZED, body).await;

    let err = client_for(addr)
        .generate(&json_object_request())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 401);
    assert!(err.detail().contains("[redacted]"));
    assert!(!err.detail().contains(TEST_KEY));
}

#[tokio::test]
async fn success_body_is_plucked_and_request_is_well_formed() {
    let reply = json!({
        "model": "gpt-4o-mini",
        "output": [{
            "type": "message",
            "content": [{ "type": "output_text", "text": "{\"addon\":{}}" }]
        }],
        "usage": { "input_tokens": 12, "output_tokens": 4, "total_tokens": 16 }
    });
    let (addr, seen) = spawn_stub(StatusCode::OK, reply.to_string()).await;

    let result = client_for(addr)
        .generate(&json_object_request())
        .await
        .unwrap();

    assert_eq!(result.content, ModelContent::Text("{\"addon\":{}}".to_string()));
    assert_eq!(result.usage.map(|u| u.total_tokens), Some(16));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let sent = &seen[0];
    assert_eq!(sent["input"][0]["role"], "system");
    assert_eq!(sent["input"][1]["content"], "user text");
    assert_eq!(sent["text"]["format"]["type"], "json_object");
    assert_eq!(sent["max_output_tokens"], 256);
}

#[tokio::test]
async fn unreachable_upstream_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(addr)
        .generate(&json_object_request())
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Network(_)));
    assert_eq!(err.status_code(), 502);
}

#[tokio::test]
async fn probe_returns_raw_status_and_body() {
    let (addr, seen) = spawn_stub(StatusCode::OK, r#"{"output_text":"ok"}"#.to_string()).await;

    let reply = client_for(addr).probe().await.unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, r#"{"output_text":"ok"}"#);
    assert_eq!(seen.lock().unwrap()[0]["input"][0]["content"], "Say: ok");
}
