use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::{render_prometheus, MetricsCollector, MetricsSnapshot};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn prometheus(State(metrics): State<MetricsCollector>) -> impl IntoResponse {
    let body = render_prometheus(&metrics.get_snapshot().await);
    ([(CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

async fn status(State(metrics): State<MetricsCollector>) -> Json<MetricsSnapshot> {
    Json(metrics.get_snapshot().await)
}

pub fn router(metrics: MetricsCollector) -> Router {
    Router::new()
        .route("/metrics", get(prometheus))
        .route("/status", get(status))
        .route("/health", get(health_check))
        .with_state(metrics)
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind metrics port {port}"))
}

/// Serve until `cancel_token` fires.
pub async fn serve(
    listener: TcpListener,
    metrics: MetricsCollector,
    cancel_token: CancellationToken,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log_info!("serving metrics on http://{addr}/metrics");
    }

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { cancel_token.cancelled().await })
        .await
        .context("metrics server failed")
}
