//! Mnemo API Server Entry Point
//!
//! Bootstraps configuration, opens the blob cache, and starts the Axum
//! HTTP server.

use std::sync::Arc;

use axum::Router;
use mnemo_api::telemetry::init_tracer;
use mnemo_api::{build_service, create_api_router, ApiError, ApiResult, ServiceConfig};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = ServiceConfig::from_env()?;
    init_tracer(config.log_format)?;
    tracing::debug!(?config, "Configuration loaded");

    if config.default_credential.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; requests must carry their own credential");
    }

    let service = build_service(&config).await?;
    let app: Router = create_api_router(Arc::new(service), &config)?;

    let addr = config.bind_addr()?;
    tracing::info!(%addr, store = %config.store_dir.display(), "Starting mnemo API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
