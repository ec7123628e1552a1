//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app};
use tower::ServiceExt;

#[tokio::test]
async fn health_check_reports_memory_store() {
    let app = build_test_app();
    let (status, json) = common::get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["store"], "memory");
    // No database configured, so the field is omitted.
    assert!(json.get("db_healthy").is_none());
    assert_eq!(json["publish_queue_pending"], 0);
    assert_eq!(json["publish_tokens_available"], 50);
    assert!(json["unreconciled_documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app();
    let (status, _) = common::get(&app.router, "/this-route-does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let app = build_test_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/content-items")
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("DELETE"), "methods: {methods}");
}
