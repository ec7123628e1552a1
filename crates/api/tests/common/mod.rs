#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use edupub_api::config::{LogFormat, ServerConfig};
use edupub_api::routes;
use edupub_api::state::AppState;
use edupub_core::generation::{
    ContentGenerator, GenerationError, GenerationOutput, GenerationRequest,
};
use edupub_core::store::InMemoryContentStore;
use edupub_publisher::dispatch::DispatchQueue;
use edupub_publisher::document::{DocumentPublisher, PublisherError, RemoteDocument};
use edupub_publisher::rate_limiter::{RateLimiter, RateLimiterConfig};

// ---------------------------------------------------------------------------
// Fakes for the external collaborators
// ---------------------------------------------------------------------------

/// Generator that echoes its input. Models named `broken` fail.
pub struct FakeGenerator;

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        if request.model == "broken" {
            return Err(GenerationError::Failed("model unavailable".into()));
        }
        Ok(GenerationOutput {
            content: format!("[{}] {}", request.model, request.prompt),
            tokens_used: 120,
            duration_ms: 850,
            model_id: format!("{}-2025", request.model),
        })
    }
}

/// Publisher that records every document it receives.
#[derive(Default)]
pub struct RecordingPublisher {
    pub documents: Mutex<Vec<RemoteDocument>>,
    pub url_lookups: AtomicUsize,
    pub fail_creates: AtomicBool,
    pub fail_urls: AtomicBool,
    /// Artificial latency for create calls.
    pub create_delay_ms: AtomicUsize,
}

impl RecordingPublisher {
    pub fn created(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn content_ids(&self) -> Vec<i64> {
        self.documents
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.content_id)
            .collect()
    }
}

#[async_trait]
impl DocumentPublisher for RecordingPublisher {
    async fn create_or_update_document(
        &self,
        document: &RemoteDocument,
    ) -> Result<String, PublisherError> {
        let delay = self.create_delay_ms.load(Ordering::SeqCst) as u64;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(PublisherError::Api {
                status: 503,
                body: "maintenance".into(),
            });
        }
        let mut documents = self.documents.lock().unwrap();
        documents.push(document.clone());
        Ok(format!("doc-{}", documents.len()))
    }

    async fn get_public_url(&self, document_id: &str) -> Result<String, PublisherError> {
        self.url_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_urls.load(Ordering::SeqCst) {
            return Err(PublisherError::Malformed("no url".into()));
        }
        Ok(format!("https://docs.example.org/{document_id}"))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        database_url: None,
        publishing_api_url: "http://publisher.invalid".to_string(),
        publishing_api_token: String::new(),
        publish_rate: RateLimiterConfig {
            capacity: 50,
            refill_per_sec: 50,
        },
        publish_wait_timeout_secs: 5,
        generation_api_url: "http://generator.invalid".to_string(),
        generation_timeout_secs: 5,
        log_format: LogFormat::Pretty,
    }
}

pub struct TestApp {
    pub router: Router,
    pub publisher: Arc<RecordingPublisher>,
    pub store: Arc<InMemoryContentStore>,
}

/// Build the full application router with all middleware layers over an
/// in-memory store and fake external services.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack production uses.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(InMemoryContentStore::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let limiter = Arc::new(RateLimiter::new(config.publish_rate).unwrap());
    let (queue, _worker) = DispatchQueue::start(Arc::clone(&limiter), CancellationToken::new());

    let state = AppState::new(
        config,
        None,
        store.clone(),
        Arc::new(FakeGenerator),
        publisher.clone(),
        limiter,
        queue,
    );

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    TestApp {
        router,
        publisher,
        store,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(
        app,
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a content item through the API and return its id.
pub async fn create_item(app: &Router, title: &str) -> i64 {
    let (status, json) = post_json(
        app,
        "/api/v1/content-items",
        serde_json::json!({
            "content_type": "course",
            "title": title,
            "subject_id": 4,
            "model": "writer",
            "prompt": format!("Outline for {title}"),
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
    json["data"]["id"].as_i64().unwrap()
}

/// Add a comparison batch for `models` to item `id`.
pub async fn compare(app: &Router, id: i64, models: &[&str]) -> serde_json::Value {
    let (status, json) = post_json(
        app,
        &format!("/api/v1/content-items/{id}/comparisons"),
        serde_json::json!({ "models": models, "prompt": "Try another angle" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "compare failed: {json}");
    json
}

/// Statuses of all versions in order.
pub fn statuses(item: &serde_json::Value) -> Vec<String> {
    item["versions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["status"].as_str().unwrap().to_string())
        .collect()
}
