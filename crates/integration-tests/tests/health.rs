//! Probe endpoints and cross-cutting middleware.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};

use zebrands_integration_tests::TestApp;

#[tokio::test]
async fn test_liveness_is_always_ok() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let response = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_readiness_follows_storage() {
    let app = TestApp::new();

    let ready = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);

    app.store.set_unavailable(true);
    let unready = app.send(Method::GET, "/health/ready", None, None).await;
    assert_eq!(unready.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "edge-7")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send_request(request).await;
    assert_eq!(response.headers["x-request-id"], "edge-7");

    let generated = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(generated.headers["x-request-id"].len(), 36);
}
