//! HTTP surface tests driven through the full router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use embedding::{
    ApiFormat, EmbeddingError, EmbeddingGateway, EmbeddingProvider, EmbeddingVector,
    GatewayConfig, HashEmbeddingProvider, HttpEmbeddingProvider, ProviderConfig,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use tower::ServiceExt;

/// Returns a fixed vector per text.
struct FixedProvider(HashMap<&'static str, Vec<f32>>);

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.0
            .get(text)
            .cloned()
            .map(EmbeddingVector::new)
            .ok_or_else(|| EmbeddingError::Provider {
                message: format!("unknown text {text}"),
                status: None,
            })
    }

    fn model(&self) -> &str {
        "fixed"
    }
}

/// Never answers.
struct HangingProvider;

#[async_trait]
impl EmbeddingProvider for HangingProvider {
    async fn embed(&self, _text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        std::future::pending().await
    }

    fn model(&self) -> &str {
        "hanging"
    }
}

fn state_with(provider: Arc<dyn EmbeddingProvider>, config: ServerConfig) -> Arc<ServerState> {
    let gateway = EmbeddingGateway::new(provider, GatewayConfig::default()).unwrap();
    Arc::new(ServerState::with_gateway(config, Arc::new(gateway), "http"))
}

fn stub_state() -> Arc<ServerState> {
    state_with(
        Arc::new(HashEmbeddingProvider::new("stub-16", 16)),
        ServerConfig::default(),
    )
}

fn reference_state() -> Arc<ServerState> {
    state_with(
        Arc::new(FixedProvider(HashMap::from([
            ("machine learning basics", vec![1.0, 0.0, 0.0]),
            ("deep learning intro", vec![0.9, 0.1, 0.0]),
            ("cooking recipes", vec![0.0, 0.0, 1.0]),
            ("neural networks", vec![0.6, 0.8, 0.0]),
            ("zero", vec![0.0, 0.0, 0.0]),
            ("short", vec![1.0, 0.0]),
        ]))),
        ServerConfig::default(),
    )
}

fn http_state(url: String, timeout: Duration) -> Arc<ServerState> {
    let provider = HttpEmbeddingProvider::new(&ProviderConfig {
        base_url: url,
        model: "remote-model".into(),
        api_key: Some("test-key".into()),
        api_format: ApiFormat::HuggingFace,
        timeout,
        ..Default::default()
    })
    .unwrap();
    state_with(Arc::new(provider), ServerConfig::default())
}

async fn post_json(state: Arc<ServerState>, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(state: Arc<ServerState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn generate_without_text_is_bad_request() {
    let (status, body) = post_json(stub_state(), "/embeddings/generate", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("text"));
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn generate_with_both_fields_is_bad_request() {
    let (status, body) = post_json(
        stub_state(),
        "/embeddings/generate",
        r#"{"text":"a","texts":["b"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (status, body) = post_json(stub_state(), "/embeddings/generate", "{\"text\":").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = post_json(stub_state(), "/embeddings/generate", r#"{"text": 42}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_text_is_bad_request() {
    let (status, body) = post_json(
        stub_state(),
        "/embeddings/generate",
        r#"{"texts":["fine","  "]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("texts[1]"));
}

#[tokio::test]
async fn generate_single_and_batch() {
    let (status, body) = post_json(stub_state(), "/embeddings/generate", r#"{"text":"hello"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "stub-16");
    assert_eq!(body["embedding"].as_array().unwrap().len(), 16);

    let (status, body) = post_json(
        stub_state(),
        "/embeddings/generate",
        r#"{"texts":["one","two","three"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 3);
    assert!(embeddings.iter().all(|e| e.as_array().unwrap().len() == 16));
}

#[tokio::test]
async fn similarity_reference_scenario() {
    let (status, body) = post_json(
        reference_state(),
        "/embeddings/similarity",
        &json!({
            "query": "machine learning basics",
            "candidates": ["deep learning intro", "cooking recipes", "neural networks"],
            "threshold": 0.5
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "fixed");
    assert_eq!(body["threshold"], 0.5);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["text"], "deep learning intro");
    assert_eq!(results[0]["index"], 0);
    assert_eq!(results[1]["text"], "neural networks");
    assert_eq!(results[1]["index"], 2);
    assert!(results[0]["score"].as_f64().unwrap() > results[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn similarity_applies_default_threshold() {
    let (status, body) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"query":"machine learning basics","candidates":["neural networks","deep learning intro"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["threshold"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["index"], 1);
}

#[tokio::test]
async fn similarity_validation_errors() {
    let (status, _) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"candidates":["x"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"query":"machine learning basics","candidates":[]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");

    let (status, _) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"query":"machine learning basics","candidates":["neural networks"],"threshold":3}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn zero_vector_from_provider_is_bad_gateway() {
    let (status, body) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"query":"machine learning basics","candidates":["zero"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "DEGENERATE_VECTOR");
}

#[tokio::test]
async fn inconsistent_provider_dimensions_are_bad_gateway() {
    let (status, body) = post_json(
        reference_state(),
        "/embeddings/similarity",
        r#"{"query":"machine learning basics","candidates":["short"]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "DIMENSION_MISMATCH");
}

#[tokio::test]
async fn provider_failure_is_internal_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/embed")
        .with_status(500)
        .with_body("model exploded")
        .create_async()
        .await;

    let state = http_state(format!("{}/embed", server.url()), Duration::from_secs(5));
    let (status, body) = post_json(state, "/embeddings/generate", r#"{"text":"hello"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("500"));
    assert_eq!(body["code"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn provider_timeout_is_gateway_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let state = http_state(format!("http://{addr}/embed"), Duration::from_millis(100));
    let (status, body) = post_json(state, "/embeddings/generate", r#"{"text":"hello"}"#).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "PROVIDER_TIMEOUT");
}

#[tokio::test]
async fn request_timeout_has_json_body() {
    let config = ServerConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let state = state_with(Arc::new(HangingProvider), config);
    let (status, body) = post_json(state, "/embeddings/generate", r#"{"text":"hello"}"#).await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["code"], "REQUEST_TIMEOUT");
    assert!(body["error"].as_str().unwrap().contains("timeout"));
}

#[tokio::test]
async fn health_does_not_touch_provider() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/embed")
        .expect(0)
        .create_async()
        .await;

    let state = http_state(format!("{}/embed", server.url()), Duration::from_secs(5));
    let (status, body) = get_json(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["model"], "remote-model");
    assert!(body["timestamp"].is_string());
    mock.assert_async().await;
}

#[tokio::test]
async fn ready_and_info_endpoints() {
    let (status, body) = get_json(stub_state(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["max_concurrency"], 16);

    let (status, body) = get_json(stub_state(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "embedgate");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, body) = get_json(stub_state(), "/embeddings/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let response = build_router(stub_state())
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");

    let response = build_router(stub_state())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let state = state_with(
        Arc::new(HashEmbeddingProvider::new("stub", 4)),
        ServerConfig {
            max_body_size_mb: 1,
            ..Default::default()
        },
    );
    let big = json!({ "text": "x".repeat(2 * 1024 * 1024) }).to_string();
    let (status, body) = post_json(state, "/embeddings/generate", &big).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn served_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(stub_state());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("http://{addr}/embeddings/generate"))
        .json(&json!({ "texts": ["a", "b"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["embeddings"].as_array().unwrap().len(), 2);
    assert_eq!(body["model"], "stub-16");
}
