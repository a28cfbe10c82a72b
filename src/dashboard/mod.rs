use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::error::Result;
use crate::metrics::PrometheusSink;
use crate::scheduler::{CategorySet, WorkQueue};

#[derive(Clone)]
pub struct DashboardState {
    pub sink: Arc<PrometheusSink>,
    pub queue: WorkQueue,
    pub categories: CategorySet,
    pub worker_count: usize,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StatusResponse {
    worker_count: usize,
    queue_depth: usize,
    queue_capacity: usize,
    started_at: DateTime<Utc>,
    uptime_secs: i64,
    processed_total: u64,
    in_flight: BTreeMap<String, i64>,
}

pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/api/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the metrics endpoint until `shutdown` is cancelled.
pub async fn run_dashboard(
    addr: SocketAddr,
    state: DashboardState,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind metrics server");
        e
    })?;

    tracing::info!(addr = %addr, "Starting metrics server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Metrics server stopped");
    Ok(())
}

async fn metrics_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    match state.sink.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.sink.content_type())],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain".to_string())],
                e.to_string(),
            )
        }
    }
}

async fn status_handler(State(state): State<DashboardState>) -> impl IntoResponse {
    let in_flight = state
        .categories
        .iter()
        .map(|category| (category.to_string(), state.sink.in_flight(category)))
        .collect();

    Json(StatusResponse {
        worker_count: state.worker_count,
        queue_depth: state.queue.len(),
        queue_capacity: state.queue.capacity(),
        started_at: state.started_at,
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
        processed_total: state.sink.processed_total(),
        in_flight,
    })
}
