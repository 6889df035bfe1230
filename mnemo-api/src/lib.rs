//! Mnemo API - Mnemonic Image Generation Service
//!
//! Axum HTTP surface over the cache-or-generate operation: a request for
//! `(facet, subject)` either finds the artifact already in the blob cache or
//! synthesizes it from the subject's mnemonic and stores it.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod telemetry;

use std::sync::Arc;

use mnemo_core::MnemoResult;
use mnemo_llm::{OpenAIClient, OpenAIImageSynthesizer};
use mnemo_storage::{FsBlobStore, StoreCatalogResolver};

// Re-export commonly used types
pub use config::{LogFormat, ServiceConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use services::{EnsureOutcome, EnsureStatus, GenerationService};

/// Wire the production collaborators described by `config`.
///
/// Opens (and creates if needed) the filesystem blob cache.
pub async fn build_service(config: &ServiceConfig) -> MnemoResult<GenerationService> {
    let store = Arc::new(FsBlobStore::open(&config.store_dir).await?);
    let prompts = Arc::new(StoreCatalogResolver::new(
        store.clone(),
        config.subjects_key.clone(),
    ));
    let client = OpenAIClient::new(config.synth_requests_per_minute, config.synth_timeout)?
        .with_base_url(&config.openai_base_url);
    let synthesizer = Arc::new(OpenAIImageSynthesizer::new(
        client,
        config.image_model.clone(),
        config.image_size.clone(),
    ));

    Ok(
        GenerationService::new(store, prompts, synthesizer, config.asset_base.clone())
            .with_default_credential(config.default_credential.clone())
            .with_single_flight(config.single_flight),
    )
}
