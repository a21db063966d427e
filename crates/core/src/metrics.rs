//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Analysis runs (outcome, duration, repositories analyzed)
//! - Pipeline steps (duration per step)
//! - External services (GitHub fetcher failures, summarizer calls)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Runs
// =============================================================================

/// Finished runs by result.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("repometer_runs_total", "Total analysis runs finished"),
        &["kind", "result"], // kind: "user", "team"; result: "completed", "cached", "partial"
    )
    .unwrap()
});

/// Run duration in seconds.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("repometer_run_duration_seconds", "Duration of analysis runs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]),
        &["kind"],
    )
    .unwrap()
});

/// Runs currently executing.
pub static RUNS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "repometer_runs_in_flight",
        "Number of analysis runs currently executing",
    )
    .unwrap()
});

/// Repositories whose pipeline finished.
pub static REPOSITORIES_ANALYZED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "repometer_repositories_analyzed_total",
        "Total repositories fully analyzed",
    )
    .unwrap()
});

// =============================================================================
// Pipeline
// =============================================================================

/// Step duration in seconds.
pub static STEP_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "repometer_step_duration_seconds",
            "Duration of individual pipeline steps",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["step"],
    )
    .unwrap()
});

/// Step faults that aborted a run.
pub static STEP_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("repometer_step_failures_total", "Pipeline step faults"),
        &["step"],
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// GitHub calls that were absorbed into empty results.
pub static FETCHER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "repometer_fetcher_failures_total",
            "GitHub requests that failed and were treated as empty",
        ),
        &["operation"],
    )
    .unwrap()
});

/// Summarizer requests by result.
pub static SUMMARIZER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "repometer_summarizer_requests_total",
            "Summarizer requests",
        ),
        &["provider", "result"], // result: "success", "rate_limited", "error"
    )
    .unwrap()
});

/// LLM tokens used.
pub static LLM_TOKENS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("repometer_llm_tokens_total", "Total LLM tokens used"),
        &["provider", "direction"], // direction: "input", "output"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(RUNS_IN_FLIGHT.clone()),
        Box::new(REPOSITORIES_ANALYZED.clone()),
        Box::new(STEP_DURATION.clone()),
        Box::new(STEP_FAILURES.clone()),
        Box::new(FETCHER_FAILURES.clone()),
        Box::new(SUMMARIZER_REQUESTS.clone()),
        Box::new(LLM_TOKENS.clone()),
    ]
}
