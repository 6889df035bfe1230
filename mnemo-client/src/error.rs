//! Client error types.

use crate::config::ClientConfigError;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ClientError {
    /// The generation endpoint answered with a non-success status.
    #[error("Generation request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    /// The artifact never became retrievable.
    #[error("Image did not become available after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether generation itself succeeded and only availability lagged.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<ClientConfigError> for ClientError {
    fn from(err: ClientConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinct() {
        assert!(ClientError::Timeout { attempts: 30 }.is_timeout());
        assert!(!ClientError::Transport("reset".to_string()).is_timeout());
        assert_eq!(
            ClientError::Timeout { attempts: 30 }.to_string(),
            "Image did not become available after 30 attempts"
        );
    }
}
