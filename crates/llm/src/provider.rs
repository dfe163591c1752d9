//! LLM Provider Trait
//!
//! Defines the common interface for the cloud and local providers.

use async_trait::async_trait;

use super::types::{LlmError, LlmResult};

/// Trait that all LLM providers must implement.
///
/// A provider turns one prompt into one block of generated text. Transport
/// failures never panic; they come back as `Err(LlmError)` so the caller can
/// tell a missing local service (`ProviderUnavailable`) from a timeout or a
/// generic error.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the model used for generation.
    fn model(&self) -> &str;

    /// Generate text for a single prompt. The returned text is trimmed.
    async fn generate(&self, prompt: &str) -> LlmResult<String>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For the cloud API, this validates the key against the model.
    /// For Ollama, this checks if the server is running.
    async fn health_check(&self) -> LlmResult<()>;

    /// List available models (if supported by provider).
    ///
    /// Returns None if the provider doesn't support model listing.
    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        Ok(None)
    }
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a reqwest transport failure. Connection failures are reported as
/// `unavailable`, timeouts as `Timeout`.
pub fn transport_error(
    err: &reqwest::Error,
    timeout_secs: u64,
    unavailable: impl FnOnce() -> String,
) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            seconds: timeout_secs,
        }
    } else if err.is_connect() {
        LlmError::ProviderUnavailable {
            message: unavailable(),
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}
