//! Health and Metrics API Tests

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;

use crate::common;

#[tokio::test]
async fn test_health_check_reports_counts() {
    let server = TestServer::new(common::test_router()).unwrap();

    let resp = server.get("/health").await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 0);
    assert_eq!(body["rooms"], 0);
    assert_eq!(body["channels"], 0);
    assert!(body.get("version").is_some());
}

#[tokio::test]
async fn test_liveness_probe() {
    let server = TestServer::new(common::test_router()).unwrap();

    let resp = server.get("/health/live").await;

    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_metrics_exposition() {
    let server = TestServer::new(common::test_router()).unwrap();

    let resp = server.get("/metrics").await;

    resp.assert_status_ok();
    assert!(resp.text().contains("signal_server_connections_active"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = TestServer::new(common::test_router()).unwrap();

    server.get("/api/v1/guilds").await.assert_status(StatusCode::NOT_FOUND);
}
