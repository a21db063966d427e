//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the repometer server:
//! - HTTP request metrics (latency, counts, errors)
//! - Tracked progress entries (collected dynamically)
//! - Run, pipeline and external service metrics registered by the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "repometer_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("repometer_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "repometer_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "repometer_auth_failures_total",
            "Total authentication failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Progress (collected dynamically)
// =============================================================================

/// Subjects with a progress entry.
pub static PROGRESS_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "repometer_progress_entries",
        "Number of subjects with a tracked progress entry",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Progress
    registry
        .register(Box::new(PROGRESS_ENTRIES.clone()))
        .unwrap();

    // Core metrics (runs, pipeline steps, external services)
    for metric in repometer_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Update gauges that mirror application state before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    PROGRESS_ENTRIES.set(state.orchestrator().progress_tracker().active() as i64);
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());
static TEAM_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(/api/v1/teams)/[^/]+").unwrap());

/// Normalize a path for metric labels (replace IDs and team names with placeholders).
pub fn normalize_path(path: &str) -> String {
    let result = TEAM_SEGMENT.replace(path, "$1/{name}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_team_name() {
        assert_eq!(
            normalize_path("/api/v1/teams/core-devs/trigger"),
            "/api/v1/teams/{name}/trigger"
        );
        assert_eq!(normalize_path("/api/v1/teams/core"), "/api/v1/teams/{name}");
    }

    #[test]
    fn test_normalize_path_team_list_unchanged() {
        assert_eq!(normalize_path("/api/v1/teams"), "/api/v1/teams");
    }

    #[test]
    fn test_normalize_path_numeric() {
        assert_eq!(normalize_path("/api/v1/things/12345"), "/api/v1/things/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/api/v1/users/me/status"), "/api/v1/users/me/status");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("repometer_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        // Prometheus only outputs vectors that have at least one child
        repometer_core::metrics::RUNS_TOTAL
            .with_label_values(&["user", "completed"])
            .inc_by(0);
        PROGRESS_ENTRIES.set(0);

        let output = encode_metrics();
        assert!(output.contains("repometer_runs_total"));
        assert!(output.contains("repometer_progress_entries"));
        assert!(output.contains("repometer_repositories_analyzed_total"));
    }
}
