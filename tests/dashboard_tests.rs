use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use dispatch_lite::dashboard::{router, run_dashboard, DashboardState};
use dispatch_lite::metrics::{MetricsSink, PrometheusSink};
use dispatch_lite::scheduler::{CategorySet, Job, WorkQueue};

/// Helper to create test state with a fresh sink and queue
fn create_test_state() -> DashboardState {
    DashboardState {
        sink: Arc::new(PrometheusSink::new().unwrap()),
        queue: WorkQueue::with_capacity(8).unwrap(),
        categories: CategorySet::new(["email", "transaction"]).unwrap(),
        worker_count: 3,
        started_at: chrono::Utc::now(),
    }
}

async fn get(state: DashboardState, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint_exports_series() {
    let state = create_test_state();
    state.sink.increment_processed(0, "email");
    state.sink.increment_processed(0, "email");
    state.sink.increment_processed(2, "transaction");
    state.sink.add_in_flight("email", 4);

    let (status, content_type, body) = get(state, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/plain"));
    assert!(body.contains("# TYPE worker_jobs_processed_total counter"));
    assert!(body.contains("worker_jobs_processed_total{type=\"email\",worker_id=\"0\"} 2"));
    assert!(body.contains("worker_jobs_processed_total{type=\"transaction\",worker_id=\"2\"} 1"));
    assert!(body.contains("# TYPE worker_jobs_inflight gauge"));
    assert!(body.contains("worker_jobs_inflight{type=\"email\"} 4"));
}

#[tokio::test]
async fn test_status_endpoint_reports_queue_and_counts() {
    let state = create_test_state();
    state.sink.increment_processed(1, "email");
    state.sink.add_in_flight("email", 2);
    state.sink.add_in_flight("transaction", 1);
    state
        .queue
        .enqueue(Job::new("email", Duration::from_millis(10)))
        .await
        .unwrap();

    let (status, _, body) = get(state, "/api/status").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["worker_count"], 3);
    assert_eq!(json["queue_depth"], 1);
    assert_eq!(json["queue_capacity"], 8);
    assert_eq!(json["processed_total"], 1);
    assert_eq!(json["in_flight"]["email"], 2);
    assert_eq!(json["in_flight"]["transaction"], 1);
    assert!(json["started_at"].is_string());
    assert!(json["uptime_secs"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn test_status_does_not_add_metric_series() {
    let state = create_test_state();
    state.sink.add_in_flight("email", 1);

    let (status, _, body) = get(state.clone(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["in_flight"]["transaction"], 0);

    let (_, _, metrics) = get(state, "/metrics").await;
    assert!(metrics.contains("worker_jobs_inflight{type=\"email\"} 1"));
    assert!(
        !metrics.contains("type=\"transaction\""),
        "status request leaked a series:\n{}",
        metrics
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _, _) = get(create_test_state(), "/api/jobs").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let token = CancellationToken::new();
    let server = tokio::spawn(run_dashboard(
        "127.0.0.1:0".parse().unwrap(),
        create_test_state(),
        token.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap()
        .unwrap();
}
