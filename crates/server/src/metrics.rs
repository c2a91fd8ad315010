//! Prometheus metrics for the revalidation service.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! Metrics carry target kinds and outcomes only, never paths, tags or secrets.
//! The endpoint should still be network-restricted to authorized scrapers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Request metrics
pub static REVALIDATION_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "revalidator_requests_total",
            "Total revalidation requests by result status",
        ),
        &["status"],
    )
    .expect("metric creation failed")
});

pub static TARGETS_INVALIDATED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "revalidator_targets_total",
            "Total invalidation targets executed by kind and result",
        ),
        &["kind", "result"],
    )
    .expect("metric creation failed")
});

pub static EXECUTION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "revalidator_execution_duration_seconds",
            "Time taken to execute all targets of one request",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["backend"],
    )
    .expect("metric creation failed")
});

// Background work metrics
pub static PAGES_WARMED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("revalidator_pages_warmed_total", "Page warm fetches by result"),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static DEPLOY_HOOKS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "revalidator_deploy_hooks_total",
            "Deploy hook triggers by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

// Error metrics
pub static HANDLER_PANICS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "revalidator_handler_panics_total",
        "Total request handler panics converted to 500 responses",
    )
    .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once; only the first call registers.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(REVALIDATION_REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(TARGETS_INVALIDATED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(EXECUTION_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PAGES_WARMED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DEPLOY_HOOKS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(HANDLER_PANICS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Record one executed target.
pub fn record_target(kind: &str, succeeded: bool) {
    let result = if succeeded { "success" } else { "failure" };
    TARGETS_INVALIDATED.with_label_values(&[kind, result]).inc();
}
