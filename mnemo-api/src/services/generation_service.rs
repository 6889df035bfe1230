//! Generation Service
//!
//! The cache-or-generate operation behind `POST /<facet>/<subject_id>`.
//! Store interactions are limited to one existence read and at most one
//! write per call.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use mnemo_core::{AssetBase, CacheKey, Facet, MnemoError, MnemoResult, SubjectId};
use mnemo_llm::{ImageSynthesizer, SynthesisCredential};
use mnemo_storage::{BlobStore, PromptResolver};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::telemetry::METRICS;

/// How an ensure call was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnsureStatus {
    AlreadyPresent,
    Created,
}

impl EnsureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EnsureStatus::AlreadyPresent => "already_present",
            EnsureStatus::Created => "created",
        }
    }
}

/// Result of a successful ensure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub status: EnsureStatus,
    pub key: CacheKey,
    /// Public retrieval URL of the artifact.
    pub url: String,
}

/// Composes blob store, prompt resolver and synthesizer.
pub struct GenerationService {
    store: Arc<dyn BlobStore>,
    prompts: Arc<dyn PromptResolver>,
    synthesizer: Arc<dyn ImageSynthesizer>,
    assets: AssetBase,
    default_credential: Option<SynthesisCredential>,
    in_flight: Option<DashMap<String, Arc<Mutex<()>>>>,
}

impl GenerationService {
    /// Create a service without a deployment credential or single-flight.
    pub fn new(
        store: Arc<dyn BlobStore>,
        prompts: Arc<dyn PromptResolver>,
        synthesizer: Arc<dyn ImageSynthesizer>,
        assets: AssetBase,
    ) -> Self {
        Self {
            store,
            prompts,
            synthesizer,
            assets,
            default_credential: None,
            in_flight: None,
        }
    }

    /// Credential used when a request does not carry one.
    pub fn with_default_credential(mut self, credential: Option<SynthesisCredential>) -> Self {
        self.default_credential = credential;
        self
    }

    /// Serialize concurrent ensures of the same key so only one synthesizes.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(DashMap::new);
        self
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn assets(&self) -> &AssetBase {
        &self.assets
    }

    /// Ensure an artifact exists for `(subject, facet)`.
    ///
    /// # Arguments
    /// * `subject` - Subject to illustrate
    /// * `facet` - Which mnemonic of the subject
    /// * `credential` - Per-request credential, falling back to the deployment one
    ///
    /// # Errors
    /// * `NotConfigured` before touching the store when no credential is available
    /// * `Storage` when the existence read or the final write fails
    /// * `NoPromptFound` when the subject has no text for the facet
    /// * `Synthesis` when the image call fails; nothing is written
    pub async fn ensure(
        &self,
        subject: SubjectId,
        facet: Facet,
        credential: Option<SynthesisCredential>,
    ) -> MnemoResult<EnsureOutcome> {
        let result = self.ensure_with_credential(subject, facet, credential).await;
        record_outcome(&result);
        result
    }

    async fn ensure_with_credential(
        &self,
        subject: SubjectId,
        facet: Facet,
        credential: Option<SynthesisCredential>,
    ) -> MnemoResult<EnsureOutcome> {
        let credential = credential
            .or_else(|| self.default_credential.clone())
            .ok_or(MnemoError::NotConfigured)?;
        let key = CacheKey::new(subject, facet);

        let Some(locks) = &self.in_flight else {
            return self.ensure_key(subject, facet, key, &credential).await;
        };

        let flight = FlightEntry::join(locks, key.as_str());
        let _turn = flight.lock.lock().await;
        self.ensure_key(subject, facet, key.clone(), &credential).await
    }

    async fn ensure_key(
        &self,
        subject: SubjectId,
        facet: Facet,
        key: CacheKey,
        credential: &SynthesisCredential,
    ) -> MnemoResult<EnsureOutcome> {
        let url = self.assets.url_for(&key);

        if self.store.exists(key.as_str()).await? {
            tracing::debug!(subject_id = %subject, facet = %facet, key = %key, "Artifact already present");
            return Ok(EnsureOutcome {
                status: EnsureStatus::AlreadyPresent,
                key,
                url,
            });
        }

        let prompt = self
            .prompts
            .resolve(subject, facet)
            .await?
            .ok_or(MnemoError::NoPromptFound { subject, facet })?;

        tracing::info!(
            subject_id = %subject,
            facet = %facet,
            key = %key,
            provider = self.synthesizer.provider_name(),
            "Synthesizing artifact"
        );
        let started = Instant::now();
        let synthesized = self.synthesizer.synthesize(&prompt, credential).await;
        record_synthesis(
            self.synthesizer.provider_name(),
            synthesized.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        let bytes = synthesized?;

        self.store.put(key.as_str(), bytes).await?;
        tracing::info!(subject_id = %subject, facet = %facet, key = %key, "Artifact stored");

        Ok(EnsureOutcome {
            status: EnsureStatus::Created,
            key,
            url,
        })
    }
}

/// A caller's handle on the per-key lock. Dropping it, including when the
/// ensure future is cancelled, removes the map entry once no one else holds
/// the lock.
struct FlightEntry<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: &'a str,
    lock: Arc<Mutex<()>>,
}

impl<'a> FlightEntry<'a> {
    fn join(locks: &'a DashMap<String, Arc<Mutex<()>>>, key: &'a str) -> Self {
        let lock = locks.entry(key.to_string()).or_default().clone();
        Self { locks, key, lock }
    }
}

impl Drop for FlightEntry<'_> {
    fn drop(&mut self) {
        // The map's handle plus ours.
        self.locks.remove_if(self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

/// Metric label for how an ensure call ended.
fn outcome_label(result: &MnemoResult<EnsureOutcome>) -> &'static str {
    match result {
        Ok(outcome) => outcome.status.as_str(),
        Err(MnemoError::NotConfigured) => "not_configured",
        Err(MnemoError::NoPromptFound { .. }) => "no_prompt_found",
        Err(MnemoError::Storage(_)) => "store_unavailable",
        Err(MnemoError::Synthesis(_)) => "synthesis_failed",
        Err(MnemoError::Timeout { .. }) => "timeout",
        Err(MnemoError::Validation(_)) => "invalid_input",
        Err(MnemoError::Config(_)) => "config_error",
    }
}

fn record_outcome(result: &MnemoResult<EnsureOutcome>) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_ensure(outcome_label(result));
    }
}

fn record_synthesis(provider: &str, success: bool, duration_secs: f64) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_synthesis(provider, success, duration_secs);
    }
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("store", &self.store.backend_name())
            .field("synthesizer", &self.synthesizer.provider_name())
            .field("assets", &self.assets.as_str())
            .field("default_credential", &self.default_credential.is_some())
            .field("single_flight", &self.in_flight.is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
