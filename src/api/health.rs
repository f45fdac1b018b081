/// Health check endpoints for liveness and readiness probes
///
/// - Liveness: is the process responsive at all?
/// - Readiness: can it reach the database and the counter store?
use crate::{context::AppContext, error::BookmarksResult, metrics};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health of one dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// "healthy" or "unhealthy"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/live", get(liveness_probe))
        .route("/health/ready", get(readiness_probe))
        .route("/metrics", get(metrics_endpoint))
}

pub async fn health_basic() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe: responds as long as the server is running
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": metrics::UPTIME_SECONDS.get(),
    }))
}

/// Readiness probe: 503 unless every dependency answers
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> (StatusCode, Json<serde_json::Value>) {
    let checks = vec![
        timed("database", check_database(&ctx)).await,
        timed("counter_store", ctx.counter_store.ping()).await,
    ];

    let ready = checks.iter().all(|c| c.status == "healthy");
    if !ready {
        tracing::warn!(?checks, "readiness_probe_failed");
    }

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "unavailable" },
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks,
        })),
    )
}

async fn metrics_endpoint() -> String {
    metrics::render_metrics()
}

/// Check database connectivity
pub async fn check_database(ctx: &AppContext) -> BookmarksResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

async fn timed<F>(name: &str, check: F) -> ComponentHealth
where
    F: std::future::Future<Output = BookmarksResult<()>>,
{
    let start = Instant::now();
    let result = check.await;
    let response_time_ms = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(()) => ComponentHealth {
            name: name.to_string(),
            status: "healthy".to_string(),
            response_time_ms,
            error: None,
        },
        Err(e) => ComponentHealth {
            name: name.to_string(),
            status: "unhealthy".to_string(),
            response_time_ms,
            error: Some(e.to_string()),
        },
    }
}
