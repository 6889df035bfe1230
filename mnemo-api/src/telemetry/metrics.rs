//! Prometheus Metrics Definitions
//!
//! Defines the generation service metrics and the /metrics endpoint.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// Synthesis latency buckets (seconds). Image generation runs from a few
/// seconds up to about a minute.
const SYNTHESIS_LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<MnemoMetrics>> = Lazy::new(MnemoMetrics::new);

/// Container for all generation service metrics.
#[derive(Clone)]
pub struct MnemoMetrics {
    /// Ensure outcomes - labels: status (already_present/created or a failure kind)
    pub ensure_total: CounterVec,

    /// Synthesis calls - labels: provider, status (success/error)
    pub synthesis_total: CounterVec,

    /// Synthesis duration histogram - labels: provider
    pub synthesis_duration_seconds: HistogramVec,
}

impl MnemoMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            ensure_total: register_counter_vec!(
                "mnemo_ensure_total",
                "Ensure calls by outcome",
                &["status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register ensure_total: {}", e)))?,

            synthesis_total: register_counter_vec!(
                "mnemo_synthesis_total",
                "Image synthesis calls",
                &["provider", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register synthesis_total: {}", e)))?,

            synthesis_duration_seconds: register_histogram_vec!(
                "mnemo_synthesis_duration_seconds",
                "Image synthesis duration in seconds",
                &["provider"],
                SYNTHESIS_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| {
                ApiError::internal_error(format!(
                    "Failed to register synthesis_duration_seconds: {}",
                    e
                ))
            })?,
        })
    }

    /// Record how an ensure call ended.
    pub fn record_ensure(&self, status: &str) {
        self.ensure_total.with_label_values(&[status]).inc();
    }

    /// Record a synthesis call.
    pub fn record_synthesis(&self, provider: &str, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.synthesis_total
            .with_label_values(&[provider, status])
            .inc();
        self.synthesis_duration_seconds
            .with_label_values(&[provider])
            .observe(duration_secs);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
