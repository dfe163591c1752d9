//! Gemini Provider
//!
//! Cloud generation through the Generative Language API
//! (`models/{model}:generateContent`). The API key is sent in the
//! `x-goog-api-key` header and is never logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http_client::build_http_client;
use super::provider::{missing_api_key_error, parse_http_error, transport_error, LlmProvider};
use super::types::{clamp_timeout, LlmError, LlmResult, ProviderConfig, DEFAULT_CLOUD_URL};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

/// Gemini provider for cloud generation
pub struct GeminiProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    http: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider from the cloud settings of `config`.
    pub fn new(config: &ProviderConfig) -> LlmResult<Self> {
        let base_url = config
            .cloud
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_CLOUD_URL)
            .trim_end_matches('/')
            .to_string();
        let http = build_http_client(config.proxy.as_ref(), config.timeout())?;

        Ok(Self {
            model: config.cloud.model.clone(),
            base_url,
            api_key: config.cloud.api_key.clone().filter(|k| !k.trim().is_empty()),
            timeout_secs: clamp_timeout(config.timeout_secs),
            http,
        })
    }

    fn api_key(&self) -> LlmResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| missing_api_key_error("gemini"))
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn unavailable_message(&self) -> String {
        format!("Cannot reach the Gemini API at {}", self.base_url)
    }

    async fn get(&self, url: String) -> LlmResult<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, self.api_key()?)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs, || self.unavailable_message()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "gemini"));
        }
        Ok(response)
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(reply: GenerateContentResponse) -> LlmResult<String> {
    if let Some(reason) = reply.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::InvalidRequest {
            message: format!("prompt blocked: {}", reason),
        });
    }

    let parts = reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| LlmError::ParseError {
            message: "Gemini reply has no candidates".to_string(),
        })?;

    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    Ok(text.trim().to_string())
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let api_key = self.api_key()?;
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.generate_url())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs, || self.unavailable_message()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, "gemini"));
        }

        let reply: GenerateContentResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                LlmError::ParseError {
                    message: format!("invalid Gemini reply: {}", e),
                }
            }
        })?;

        let text = response_text(reply)?;
        debug!(model = %self.model, chars = text.len(), "gemini generation complete");
        Ok(text)
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.get(format!("{}/models/{}", self.base_url, self.model))
            .await?;
        Ok(())
    }

    async fn list_models(&self) -> LlmResult<Option<Vec<String>>> {
        let list: ModelList = self
            .get(format!("{}/models", self.base_url))
            .await?
            .json()
            .await
            .map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;

        Ok(Some(
            list.models
                .into_iter()
                .map(|m| m.name.trim_start_matches("models/").to_string())
                .collect(),
        ))
    }
}
