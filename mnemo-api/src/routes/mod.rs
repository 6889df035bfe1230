//! REST API Routes Module
//!
//! Includes:
//! - The generation endpoint and its preflight
//! - Health check endpoints
//! - Prometheus metrics
//! - The fixed trusted origin header on every response

pub mod generate;
pub mod health;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::get,
    Router,
};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::GenerationService;
use crate::telemetry::metrics_handler;

pub use generate::create_router as generate_router;
pub use health::create_router as health_router;

/// Create the complete API router.
///
/// # Errors
/// Fails when the configured origin is not a valid header value.
pub fn create_api_router(
    service: Arc<GenerationService>,
    config: &ServiceConfig,
) -> ApiResult<Router> {
    let origin = HeaderValue::from_str(&config.allowed_origin).map_err(|e| {
        ApiError::internal_error(format!(
            "Invalid allowed origin {:?}: {}",
            config.allowed_origin, e
        ))
    })?;

    let health_state = health::HealthState::new(service.store().clone(), &config.subjects_key);

    let router = Router::new()
        .nest("/health", health_router(health_state))
        .route("/metrics", get(metrics_handler))
        .merge(generate_router(service))
        .fallback(generate::fallback)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            origin,
        ))
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
