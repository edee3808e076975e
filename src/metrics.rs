/// Metrics and telemetry for Content Studio
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Store sizes (images held, tasks per status)
/// - AI upstream calls and their latency

use crate::error::{StudioError, StudioResult};
use lazy_static::lazy_static;
use prometheus::{
    register_gauge, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    register_int_gauge_vec, Encoder, Gauge, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec,
    TextEncoder,
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

    // ========== Store Metrics ==========

    /// Images currently held in memory
    pub static ref IMAGES_STORED: IntGauge = register_int_gauge!(
        "studio_images_stored",
        "Number of uploaded images currently held"
    )
    .unwrap();

    /// Publish tasks by status
    pub static ref PUBLISH_TASKS: IntGaugeVec = register_int_gauge_vec!(
        "studio_publish_tasks",
        "Number of publish tasks by status",
        &["status"]
    )
    .unwrap();

    // ========== AI Metrics ==========

    /// Upstream AI calls by endpoint and outcome
    pub static ref AI_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "studio_ai_requests_total",
        "Total number of AI upstream requests",
        &["endpoint", "outcome"]
    )
    .unwrap();

    /// Upstream AI latency; upscaling can take most of a minute
    pub static ref AI_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "studio_ai_request_duration_seconds",
        "AI upstream request latencies in seconds",
        &["endpoint"],
        vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]
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
pub fn render_metrics() -> StudioResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| StudioError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| StudioError::Internal(format!("Metrics are not UTF-8: {}", e)))
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

/// Record an AI upstream call
pub fn record_ai_request(endpoint: &str, outcome: &str, duration: f64) {
    AI_REQUESTS_TOTAL
        .with_label_values(&[endpoint, outcome])
        .inc();
    AI_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/images", 200, 0.05);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("http_requests_total"));
        assert!(metrics.contains("http_request_duration_seconds"));
    }

    #[test]
    fn test_record_ai_request() {
        record_ai_request("title", "success", 1.2);
        record_ai_request("enhance", "error", 30.0);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("studio_ai_requests_total"));
        assert!(metrics.contains("studio_ai_request_duration_seconds"));
    }

    #[test]
    fn test_store_gauges_render() {
        IMAGES_STORED.set(3);
        PUBLISH_TASKS.with_label_values(&["draft"]).set(1);
        let metrics = render_metrics().unwrap();
        assert!(metrics.contains("studio_images_stored"));
        assert!(metrics.contains("studio_publish_tasks{status=\"draft\"}"));
    }
}
