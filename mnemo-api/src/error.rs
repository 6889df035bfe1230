//! Error Types for the Generation API
//!
//! This module defines error handling for the HTTP layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion from the core `MnemoError` taxonomy
//!
//! All errors are serialized as `{"error": "...", "code": "..."}` with the
//! status carried by the code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mnemo_core::{ConfigError, MnemoError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Path or body could not be interpreted (400)
    InvalidInput,

    /// No mnemonic text exists for the subject facet (404)
    NoPromptFound,

    /// Method is not served on this path (405)
    MethodNotAllowed,

    /// No synthesis credential supplied or configured (500)
    NotConfigured,

    /// Blob cache read or write failed (500)
    StoreUnavailable,

    /// The external image generation call failed (500)
    SynthesisFailed,

    /// Anything else (500)
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorCode::NoPromptFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::NotConfigured
            | ErrorCode::StoreUnavailable
            | ErrorCode::SynthesisFailed
            | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::NoPromptFound => "No mnemonic found",
            ErrorCode::MethodNotAllowed => "Method Not Allowed",
            ErrorCode::NotConfigured => "OpenAI API key is not configured.",
            ErrorCode::StoreUnavailable => "Error accessing the image store.",
            ErrorCode::SynthesisFailed => "Image generation failed.",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Error code categorizing the error
    pub code: ErrorCode,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MethodNotAllowed error.
    pub fn method_not_allowed() -> Self {
        Self::from_code(ErrorCode::MethodNotAllowed)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM CORE ERRORS
// ============================================================================

/// Store and synthesis details are logged, not returned to the caller.
impl From<MnemoError> for ApiError {
    fn from(err: MnemoError) -> Self {
        match err {
            MnemoError::NotConfigured => {
                tracing::warn!("Generation requested without a synthesis credential");
                ApiError::from_code(ErrorCode::NotConfigured)
            }
            MnemoError::NoPromptFound { subject, facet } => ApiError::new(
                ErrorCode::NoPromptFound,
                format!("No {} mnemonic found for subject ID {}.", facet, subject),
            ),
            MnemoError::Storage(e) => {
                tracing::error!(error = %e, "Blob store failure");
                ApiError::from_code(ErrorCode::StoreUnavailable)
            }
            MnemoError::Synthesis(e) => {
                tracing::error!(error = %e, "Image synthesis failure");
                ApiError::from_code(ErrorCode::SynthesisFailed)
            }
            MnemoError::Validation(e) => ApiError::invalid_input(e.to_string()),
            other => {
                tracing::error!(error = %other, "Unexpected generation error");
                ApiError::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::invalid_input(err.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal_error(format!("Configuration error: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
