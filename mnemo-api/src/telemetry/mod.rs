//! Mnemo Telemetry - Observability Infrastructure
//!
//! Tracing subscriber setup and Prometheus metrics for the API layer.

pub mod metrics;
pub mod tracer;

pub use metrics::{metrics_handler, MnemoMetrics, METRICS};
pub use tracer::init_tracer;
