//! Ollama Provider
//!
//! Local inference through Ollama's `/api/generate` endpoint. Generation
//! posts `{model, prompt, stream: false}` and returns the `response` field of
//! the reply. Health checks and model listing go through the ollama-rs SDK.

use async_trait::async_trait;
use ollama_rs::Ollama;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::{parse_http_error, transport_error, LlmProvider};
use super::types::{clamp_timeout, LlmError, LlmResult, ProviderConfig, DEFAULT_LOCAL_URL};

/// Default Ollama port when the base URL has none
const OLLAMA_DEFAULT_PORT: u16 = 11434;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

/// Ollama provider for local inference
pub struct OllamaProvider {
    model: String,
    base_url: String,
    timeout_secs: u64,
    http: reqwest::Client,
    sdk: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider from the local settings of `config`.
    pub fn new(config: &ProviderConfig) -> LlmResult<Self> {
        let base_url = config.local.base_url.trim_end_matches('/').to_string();
        let base_url = if base_url.is_empty() {
            DEFAULT_LOCAL_URL.to_string()
        } else {
            base_url
        };

        let proxy = config.proxy.as_ref().filter(|p| !p.bypass_local);
        let http = build_http_client(proxy, config.timeout())?;
        let sdk = Self::create_sdk_client(&base_url, http.clone());

        Ok(Self {
            model: config.local.model.clone(),
            base_url,
            timeout_secs: clamp_timeout(config.timeout_secs),
            http,
            sdk,
        })
    }

    /// Create an Ollama SDK client sharing our HTTP client.
    ///
    /// Parses the URL to extract host and port for `Ollama::new_with_client()`.
    /// Falls back to `Ollama::default()` if parsing fails.
    fn create_sdk_client(base_url: &str, http: reqwest::Client) -> Ollama {
        match url::Url::parse(base_url) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("localhost");
                let port = parsed.port().unwrap_or(OLLAMA_DEFAULT_PORT);
                let host_url = format!("{}://{}", parsed.scheme(), host);
                Ollama::new_with_client(host_url, port, http)
            }
            Err(_) => Ollama::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Rebuild the client with a short request timeout, bypassing the clamp.
    #[cfg(test)]
    fn with_request_timeout(mut self, timeout: std::time::Duration) -> LlmResult<Self> {
        self.http = build_http_client(None, timeout)?;
        self.timeout_secs = timeout.as_secs();
        Ok(self)
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Operator-facing message for a refused connection.
    fn unavailable_message(&self) -> String {
        format!(
            "Cannot connect to Ollama at {}. Please ensure Ollama is running with 'ollama serve' and the model '{}' is installed.",
            self.base_url, self.model
        )
    }

    fn map_sdk_error(&self, err: impl std::fmt::Display) -> LlmError {
        let msg = err.to_string();
        if msg.contains("connect") || msg.contains("Connection refused") {
            LlmError::ProviderUnavailable {
                message: self.unavailable_message(),
            }
        } else {
            LlmError::NetworkError { message: msg }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs, || self.unavailable_message()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                404 => LlmError::ModelNotFound {
                    model: self.model.clone(),
                },
                code => parse_http_error(code, &text, "ollama"),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    LlmError::ParseError {
                        message: format!("invalid Ollama reply: {}", e),
                    }
                }
            })?;

        let text = parsed.response.ok_or_else(|| LlmError::ParseError {
            message: "Ollama reply has no 'response' field".to_string(),
        })?;
        debug!(model = %self.model, chars = text.len(), "ollama generation complete");

        Ok(text.trim().to_string())
    }

    async fn health_check(&self) -> LlmResult<()> {
        // Use the SDK's list_local_models as a health check
        self.sdk
            .list_local_models()
            .await
            .map_err(|e| self.map_sdk_error(e))?;
        Ok(())
    }

    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        let models = self
            .sdk
            .list_local_models()
            .await
            .map_err(|e| self.map_sdk_error(e))?;

        Ok(Some(models.into_iter().map(|m| m.name).collect()))
    }
}
