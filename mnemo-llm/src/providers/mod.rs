//! Image synthesizer implementations
//!
//! Concrete implementations of the `ImageSynthesizer` trait for external
//! image generation services.

pub mod openai;

pub use openai::{OpenAIClient, OpenAIImageSynthesizer};

use mnemo_core::{MnemoError, SynthesisError};

pub(crate) fn request_failed(provider: &str, status: u16, message: impl Into<String>) -> MnemoError {
    MnemoError::Synthesis(SynthesisError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    })
}

pub(crate) fn rate_limited(provider: &str, retry_after_ms: u64) -> MnemoError {
    MnemoError::Synthesis(SynthesisError::RateLimited {
        provider: provider.to_string(),
        retry_after_ms,
    })
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> MnemoError {
    MnemoError::Synthesis(SynthesisError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    })
}
