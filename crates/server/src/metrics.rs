//! Prometheus metrics
//!
//! Counters and histograms are recorded through the `metrics` facade in the
//! agent crate; this module installs the Prometheus recorder and renders it.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Install the global Prometheus recorder
///
/// Call once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(
        "arn_requests_total",
        "Answered utterances by intent and response tier"
    );
    describe_counter!("arn_cache_hits_total", "Query cache hits");
    describe_counter!("arn_cache_misses_total", "Query cache misses");
    describe_counter!(
        "arn_enrichment_failures_total",
        "Narrative enrichment attempts that failed or timed out"
    );
    describe_histogram!(
        "arn_pipeline_latency_ms",
        Unit::Milliseconds,
        "End-to-end latency of one utterance"
    );
}

/// Prometheus text exposition
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics disabled\n".to_string(),
        ),
    }
}
