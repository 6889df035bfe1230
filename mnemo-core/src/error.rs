//! Error types for mnemonic image operations

use thiserror::Error;

use crate::identity::{Facet, SubjectId};

/// Blob store errors. Every variant surfaces as "store unavailable".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Read of {key} failed: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("Write of {key} failed: {reason}")]
    WriteFailed { key: String, reason: String },

    #[error("Required entry {key} is missing from the store")]
    MissingEntry { key: String },

    #[error("Entry {key} is malformed: {reason}")]
    Malformed { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Image synthesizer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Image download failed: {reason}")]
    DownloadFailed { reason: String },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid subject id: {value}")]
    InvalidSubjectId { value: String },

    #[error("Unknown facet: {value}")]
    UnknownFacet { value: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MnemoError {
    #[error("Image synthesis credential is not configured")]
    NotConfigured,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No {facet} mnemonic found for subject ID {subject}")]
    NoPromptFound { subject: SubjectId, facet: Facet },

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Artifact did not become available after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl MnemoError {
    /// Whether a caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            MnemoError::Storage(_) | MnemoError::Timeout { .. } => true,
            MnemoError::Synthesis(SynthesisError::RateLimited { .. }) => true,
            MnemoError::NotConfigured
            | MnemoError::NoPromptFound { .. }
            | MnemoError::Synthesis(_)
            | MnemoError::Validation(_)
            | MnemoError::Config(_) => false,
        }
    }
}

/// Result type alias for mnemonic image operations.
pub type MnemoResult<T> = Result<T, MnemoError>;

// =============================================================================
// TESTS
// =============================================================================
