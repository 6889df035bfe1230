//! Mnemo LLM - Image Synthesis Layer
//!
//! Provider-agnostic trait for turning a text prompt into raw image bytes.
//! The generation service only sees `ImageSynthesizer`; concrete providers
//! live under [`providers`].

pub mod providers;

use async_trait::async_trait;
use mnemo_core::{MnemoResult, SynthesisError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub use providers::{OpenAIClient, OpenAIImageSynthesizer};

// ============================================================================
// CREDENTIAL
// ============================================================================

/// API credential for the synthesizer. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SynthesisCredential(String);

impl SynthesisCredential {
    /// Wrap a credential, treating blank input as absent.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SynthesisCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SynthesisCredential([REDACTED])")
    }
}

// ============================================================================
// IMAGE SYNTHESIZER TRAIT
// ============================================================================

/// Trait for image synthesizers.
/// Implementations must be thread-safe (Send + Sync).
///
/// # Example
/// ```ignore
/// let client = OpenAIClient::new(5, DEFAULT_REQUEST_TIMEOUT)?;
/// let synthesizer = OpenAIImageSynthesizer::with_default_model(client);
/// let png = synthesizer.synthesize("A go board under a tree", &credential).await?;
/// ```
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Generate one image for the prompt.
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Raw image bytes
    /// * `Err(MnemoError::Synthesis)` - Quota, rejected prompt, or transport failure
    async fn synthesize(
        &self,
        prompt: &str,
        credential: &SynthesisCredential,
    ) -> MnemoResult<Vec<u8>>;

    /// Provider identifier for logs and metrics.
    fn provider_name(&self) -> &str;
}

// ============================================================================
// MOCK SYNTHESIZER (for testing)
// ============================================================================

/// Mock synthesizer that returns fixed bytes and records its prompts.
#[derive(Debug, Default)]
pub struct MockImageSynthesizer {
    output: Vec<u8>,
    failure: Option<SynthesisError>,
    delay: Option<Duration>,
    calls: AtomicU64,
    prompts: Mutex<Vec<String>>,
}

impl MockImageSynthesizer {
    /// Succeed with `output` on every call.
    pub fn returning(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    /// Fail with `error` on every call.
    pub fn failing(error: SynthesisError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Take `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageSynthesizer for MockImageSynthesizer {
    async fn synthesize(
        &self,
        prompt: &str,
        _credential: &SynthesisCredential,
    ) -> MnemoResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(self.output.clone()),
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
