//! LLM Types
//!
//! Provider selection, per-provider settings and the error type shared by
//! every provider.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use survey_designer_core::proxy::ProxyConfig;

/// Default cloud model
pub const DEFAULT_CLOUD_MODEL: &str = "gemini-3-flash-preview";

/// Default cloud API endpoint
pub const DEFAULT_CLOUD_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default local model
pub const DEFAULT_LOCAL_MODEL: &str = "gemma2";

/// Default local inference endpoint
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:11434";

/// Bounds for the per-request timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 60;
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Which backend serves a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Cloud,
    Local,
}

impl Default for ProviderMode {
    fn default() -> Self {
        Self::Cloud
    }
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Cloud => write!(f, "cloud"),
            ProviderMode::Local => write!(f, "local"),
        }
    }
}

impl FromStr for ProviderMode {
    type Err = String;

    /// Accepts `online`/`offline` as aliases of `cloud`/`local`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" | "online" => Ok(ProviderMode::Cloud),
            "local" | "offline" => Ok(ProviderMode::Local),
            other => Err(format!(
                "unknown provider mode '{}' (expected cloud, online, local or offline)",
                other
            )),
        }
    }
}

/// Cloud provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudConfig {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Supplied out of band; never serialized.
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_CLOUD_MODEL.to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Local provider settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalConfig {
    pub model: String,
    pub base_url: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LOCAL_MODEL.to_string(),
            base_url: DEFAULT_LOCAL_URL.to_string(),
        }
    }
}

/// Everything needed to build the providers for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Initial mode; can be switched between calls through the gateway.
    pub mode: ProviderMode,
    pub cloud: CloudConfig,
    pub local: LocalConfig,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            cloud: CloudConfig::default(),
            local: LocalConfig::default(),
            timeout_secs: MAX_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

impl ProviderConfig {
    /// Request timeout, clamped to the supported range.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(clamp_timeout(self.timeout_secs))
    }
}

/// Clamp a timeout to `MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS`.
pub fn clamp_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}

/// Error types for LLM operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (missing or invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters, blocked prompt)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Request exceeded the configured timeout
    Timeout { seconds: u64 },
    /// Response parsing error
    ParseError { message: String },
    /// Provider not reachable (e.g., Ollama not running)
    ProviderUnavailable { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// True when the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, LlmError::ProviderUnavailable { .. })
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::ModelNotFound { model } => {
                write!(f, "Model not found: {}", model)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::Timeout { seconds } => {
                write!(f, "Request timed out after {}s", seconds)
            }
            LlmError::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            LlmError::ProviderUnavailable { message } => {
                write!(f, "Provider unavailable: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
