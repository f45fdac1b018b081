/// Metrics and telemetry for the bookmarks service
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Activity stream writes and dedup hits
/// - Image views, likes and follows
/// - Background job execution

use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder,
    Gauge, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Activity Metrics ==========

    /// Activity writes, split into stored and suppressed duplicates
    pub static ref ACTIONS_RECORDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "actions_recorded_total",
        "Total number of activity stream writes",
        &["outcome"]
    )
    .unwrap();

    // ========== Image Metrics ==========

    /// Image view increments by status
    pub static ref IMAGE_VIEWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_views_total",
        "Total number of image view increments",
        &["status"]
    )
    .unwrap();

    /// Like membership changes
    pub static ref IMAGE_LIKES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "image_likes_total",
        "Total number of like and unlike operations",
        &["action"]
    )
    .unwrap();

    // ========== Social Graph Metrics ==========

    /// Follow graph changes
    pub static ref FOLLOWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "follows_total",
        "Total number of follow and unfollow operations",
        &["action"]
    )
    .unwrap();

    // ========== Background Job Metrics ==========

    /// Background job executions by job type and status
    pub static ref BACKGROUND_JOBS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "background_jobs_total",
        "Total number of background job executions",
        &["job_type", "status"]
    )
    .unwrap();

    /// Background job duration in seconds
    pub static ref BACKGROUND_JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "background_job_duration_seconds",
        "Background job execution time in seconds",
        &["job_type"],
        vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Application uptime in seconds
    pub static ref UPTIME_SECONDS: Gauge = register_gauge!(
        "uptime_seconds",
        "Application uptime in seconds"
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record an activity write; `stored` is false for suppressed duplicates
pub fn record_action_outcome(stored: bool) {
    ACTIONS_RECORDED_TOTAL
        .with_label_values(&[if stored { "created" } else { "suppressed" }])
        .inc();
}

/// Record an image view increment
pub fn record_view(success: bool) {
    IMAGE_VIEWS_TOTAL
        .with_label_values(&[if success { "recorded" } else { "failed" }])
        .inc();
}

/// Record a like or unlike
pub fn record_like(action: &str) {
    IMAGE_LIKES_TOTAL.with_label_values(&[action]).inc();
}

/// Record a follow or unfollow
pub fn record_follow(action: &str) {
    FOLLOWS_TOTAL.with_label_values(&[action]).inc();
}

/// Record a background job execution
pub fn record_background_job(job_type: &str, status: &str, duration: f64) {
    BACKGROUND_JOBS_TOTAL
        .with_label_values(&[job_type, status])
        .inc();
    BACKGROUND_JOB_DURATION_SECONDS
        .with_label_values(&[job_type])
        .observe(duration);
}
