//! Configuration loading for the page client.
//!
//! Endpoints and the request timeout are required; polling has defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::poller::PollPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Generation service, e.g. `https://api.wanikani-mnemonic-images.com`.
    pub api_base_url: String,
    /// Static artifact host, e.g. `https://wanikani-mnemonic-images.com`.
    pub asset_base_url: String,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    30
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_millis(self.interval_ms))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn from_path(path: &Path) -> Result<Self, ClientConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ClientConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClientConfigError> {
        check_url("api_base_url", &self.api_base_url)?;
        check_url("asset_base_url", &self.asset_base_url)?;
        if self.request_timeout_ms == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.poll.max_attempts == 0 {
            return Err(ClientConfigError::InvalidValue {
                field: "poll.max_attempts",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ClientConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ClientConfigError::InvalidValue {
            field,
            reason: "must be an http(s) URL".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        api_base_url = "https://api.wanikani-mnemonic-images.com"
        asset_base_url = "https://wanikani-mnemonic-images.com"
        request_timeout_ms = 120000
    "#;

    #[test]
    fn test_poll_defaults() {
        let config = ClientConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.poll.max_attempts, 30);
        assert_eq!(config.poll.interval_ms, 1000);
        assert_eq!(config.poll.policy().interval, Duration::from_secs(1));
    }

    #[test]
    fn test_poll_overrides() {
        let toml = format!("{}\n[poll]\nmax_attempts = 5\n", MINIMAL);
        let config = ClientConfig::from_toml_str(&toml).unwrap();
        assert_eq!(config.poll.max_attempts, 5);
        assert_eq!(config.poll.interval_ms, 1000);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let toml = format!("{}\nverbose = true\n", MINIMAL);
        assert!(matches!(
            ClientConfig::from_toml_str(&toml),
            Err(ClientConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation() {
        let toml = MINIMAL.replace("120000", "0");
        assert!(matches!(
            ClientConfig::from_toml_str(&toml),
            Err(ClientConfigError::InvalidValue {
                field: "request_timeout_ms",
                ..
            })
        ));

        let toml = MINIMAL.replace("https://api.", "ftp://api.");
        assert!(matches!(
            ClientConfig::from_toml_str(&toml),
            Err(ClientConfigError::InvalidValue {
                field: "api_base_url",
                ..
            })
        ));
    }

    #[test]
    fn test_from_path() -> Result<(), ClientConfigError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("client.toml");
        std::fs::write(&path, MINIMAL)?;
        let config = ClientConfig::from_path(&path)?;
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        Ok(())
    }
}
