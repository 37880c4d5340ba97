//! Health Check API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.server.get("/health/live").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "alive");
}

#[tokio::test]
async fn test_readiness_reports_redis_disabled() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    // 200 or 503 depending on whether a local database happens to be up
    let status = response.status_code();
    assert!(status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["checks"]["redis"]["status"], "disabled");
    assert!(body["checks"]["database"]["status"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_http_counters() {
    let app = TestApp::new();
    app.server.get("/health").await.assert_status_ok();

    let response = app.server.get("/metrics").await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("petcare_http_requests_total"));
    assert!(text.contains("petcare_db_pool_connections"));
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    assert_eq!(response.header("x-content-type-options"), "nosniff");
    assert_eq!(response.header("x-frame-options"), "DENY");
}
