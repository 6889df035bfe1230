//! Service Configuration Module
//!
//! Configuration for the generation service, loaded from environment
//! variables with defaults suitable for local development.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use mnemo_core::{AssetBase, ConfigError};
use mnemo_llm::SynthesisCredential;
use mnemo_storage::DEFAULT_SUBJECTS_KEY;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default trusted origin allowed to call the service from a browser.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "https://www.wanikani.com";

/// Default public host serving stored artifacts.
pub const DEFAULT_ASSET_BASE_URL: &str = "https://wanikani-mnemonic-images.com";

// ============================================================================
// LOG FORMAT
// ============================================================================

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Generation service configuration.
#[derive(Clone)]
pub struct ServiceConfig {
    // ========================================================================
    // Network
    // ========================================================================
    /// Interface to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,

    /// The single origin echoed in `Access-Control-Allow-Origin`.
    pub allowed_origin: String,

    // ========================================================================
    // Artifacts
    // ========================================================================
    /// Public retrieval host for stored artifacts.
    pub asset_base: AssetBase,

    /// Filesystem root of the blob cache.
    pub store_dir: PathBuf,

    /// Blob cache entry holding the subject catalog.
    pub subjects_key: String,

    /// Serialize concurrent ensures of the same key.
    pub single_flight: bool,

    // ========================================================================
    // Synthesis
    // ========================================================================
    /// Deployment-level credential, used when a request carries none.
    pub default_credential: Option<SynthesisCredential>,

    /// Image API base URL.
    pub openai_base_url: String,

    /// Image model name.
    pub image_model: String,

    /// Output image size.
    pub image_size: String,

    /// Maximum synthesis requests per minute.
    pub synth_requests_per_minute: u32,

    /// Bound on each outbound synthesis call.
    pub synth_timeout: Duration,

    // ========================================================================
    // Logging
    // ========================================================================
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            asset_base: AssetBase::new(DEFAULT_ASSET_BASE_URL),
            store_dir: PathBuf::from("./mnemonic-images"),
            subjects_key: DEFAULT_SUBJECTS_KEY.to_string(),
            single_flight: false,
            default_credential: None,
            openai_base_url: mnemo_llm::providers::openai::DEFAULT_BASE_URL.to_string(),
            image_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            synth_requests_per_minute: 5,
            synth_timeout: mnemo_llm::providers::openai::DEFAULT_REQUEST_TIMEOUT,
            log_format: LogFormat::Text,
        }
    }
}

impl ServiceConfig {
    /// Create ServiceConfig from environment variables.
    ///
    /// Environment variables:
    /// - `MNEMO_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT` / `MNEMO_API_PORT`: Listen port (default: 8787)
    /// - `MNEMO_ALLOWED_ORIGIN`: Trusted CORS origin (default: https://www.wanikani.com)
    /// - `MNEMO_ASSET_BASE_URL`: Public artifact host
    /// - `MNEMO_STORE_DIR`: Blob cache root (default: ./mnemonic-images)
    /// - `MNEMO_SUBJECTS_KEY`: Catalog entry (default: subjects.json)
    /// - `MNEMO_SINGLE_FLIGHT`: "true" to serialize same-key ensures (default: false)
    /// - `OPENAI_API_KEY`: Deployment credential (optional)
    /// - `MNEMO_OPENAI_BASE_URL`, `MNEMO_IMAGE_MODEL`, `MNEMO_IMAGE_SIZE`, `MNEMO_SYNTH_RPM`
    /// - `MNEMO_SYNTH_TIMEOUT_SECS`: Per-request synthesis timeout (default: 120)
    /// - `MNEMO_LOG_FORMAT`: "text" or "json" (default: text)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match get("PORT").or_else(|| get("MNEMO_API_PORT")) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let synth_requests_per_minute = match get("MNEMO_SYNTH_RPM") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(rpm) if rpm > 0 => rpm,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "MNEMO_SYNTH_RPM".to_string(),
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    })
                }
            },
            None => defaults.synth_requests_per_minute,
        };

        let synth_timeout = match get("MNEMO_SYNTH_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "MNEMO_SYNTH_TIMEOUT_SECS".to_string(),
                        value: raw,
                        reason: "expected a positive number of seconds".to_string(),
                    })
                }
            },
            None => defaults.synth_timeout,
        };

        let config = Self {
            bind_host: get("MNEMO_API_BIND").unwrap_or(defaults.bind_host),
            port,
            allowed_origin: get("MNEMO_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            asset_base: get("MNEMO_ASSET_BASE_URL")
                .map(AssetBase::new)
                .unwrap_or(defaults.asset_base),
            store_dir: get("MNEMO_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            subjects_key: get("MNEMO_SUBJECTS_KEY").unwrap_or(defaults.subjects_key),
            single_flight: get("MNEMO_SINGLE_FLIGHT")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            default_credential: get("OPENAI_API_KEY").and_then(SynthesisCredential::new),
            openai_base_url: get("MNEMO_OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            image_model: get("MNEMO_IMAGE_MODEL").unwrap_or(defaults.image_model),
            image_size: get("MNEMO_IMAGE_SIZE").unwrap_or(defaults.image_size),
            synth_requests_per_minute,
            synth_timeout,
            log_format: get("MNEMO_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later at bind or header time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if !self.allowed_origin.starts_with("http://") && !self.allowed_origin.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "MNEMO_ALLOWED_ORIGIN".to_string(),
                value: self.allowed_origin.clone(),
                reason: "expected an http(s) origin".to_string(),
            });
        }
        Ok(())
    }

    /// Socket address assembled from host and port.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_host
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                field: "MNEMO_API_BIND".to_string(),
                value: self.bind_host.clone(),
                reason: e.to_string(),
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_host", &self.bind_host)
            .field("port", &self.port)
            .field("allowed_origin", &self.allowed_origin)
            .field("asset_base", &self.asset_base.as_str())
            .field("store_dir", &self.store_dir)
            .field("subjects_key", &self.subjects_key)
            .field("single_flight", &self.single_flight)
            .field("default_credential", &self.default_credential.is_some())
            .field("image_model", &self.image_model)
            .field("synth_requests_per_minute", &self.synth_requests_per_minute)
            .field("synth_timeout", &self.synth_timeout)
            .finish()
    }
}
