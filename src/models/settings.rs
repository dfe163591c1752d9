//! Settings Models
//!
//! Application configuration and settings data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use survey_designer_core::ProxyConfig;
use survey_designer_llm::{
    CloudConfig, LocalConfig, ProviderConfig, ProviderMode, DEFAULT_CLOUD_MODEL,
    DEFAULT_LOCAL_MODEL, DEFAULT_LOCAL_URL, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS,
};

/// Upper bound for parallel item synthesis.
pub const MAX_CONCURRENCY: usize = 8;

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Provider used unless overridden: "cloud" or "local"
    pub llm_mode: ProviderMode,
    /// Cloud model identifier
    pub cloud_model: String,
    /// Cloud API base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_base_url: Option<String>,
    /// Local model name
    pub local_model: String,
    /// Local inference endpoint
    pub local_base_url: String,
    /// Per-request timeout in seconds (60..=120)
    pub request_timeout_secs: u64,
    /// Directory for survey artifacts
    pub output_dir: PathBuf,
    /// Directory for the prompt audit log
    pub prompt_log_dir: PathBuf,
    /// Taxonomy file; the built-in taxonomy is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy_path: Option<PathBuf>,
    /// Blank data rows in the CSV template
    #[serde(default = "default_template_blank_rows")]
    pub template_blank_rows: usize,
    /// Parallel LLM calls per synthesis stage; 1 is sequential
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_template_blank_rows() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_mode: ProviderMode::Cloud,
            cloud_model: DEFAULT_CLOUD_MODEL.to_string(),
            cloud_base_url: None,
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            local_base_url: DEFAULT_LOCAL_URL.to_string(),
            request_timeout_secs: MAX_TIMEOUT_SECS,
            output_dir: PathBuf::from("survey_responses"),
            prompt_log_dir: PathBuf::from("prompt_logs"),
            taxonomy_path: None,
            template_blank_rows: default_template_blank_rows(),
            max_concurrency: default_max_concurrency(),
            proxy: None,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub llm_mode: Option<ProviderMode>,
    pub cloud_model: Option<String>,
    pub local_model: Option<String>,
    pub local_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(mode) = update.llm_mode {
            self.llm_mode = mode;
        }
        if let Some(model) = update.cloud_model {
            self.cloud_model = model;
        }
        if let Some(model) = update.local_model {
            self.local_model = model;
        }
        if let Some(url) = update.local_base_url {
            self.local_base_url = url;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(dir) = update.output_dir {
            self.output_dir = dir;
        }
        if let Some(n) = update.max_concurrency {
            self.max_concurrency = n;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.cloud_model.trim().is_empty() {
            return Err("cloud_model must not be empty".to_string());
        }
        if self.local_model.trim().is_empty() {
            return Err("local_model must not be empty".to_string());
        }
        if !self.local_base_url.starts_with("http://") && !self.local_base_url.starts_with("https://") {
            return Err(format!(
                "Invalid local_base_url: {}. Must start with http:// or https://",
                self.local_base_url
            ));
        }
        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            return Err(format!(
                "request_timeout_secs must be between {} and {}",
                MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS
            ));
        }
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "max_concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }
        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }
        Ok(())
    }

    /// Provider settings for one invocation. The API key is passed in rather
    /// than stored.
    pub fn provider_config(&self, api_key: Option<String>) -> ProviderConfig {
        ProviderConfig {
            mode: self.llm_mode,
            cloud: CloudConfig {
                model: self.cloud_model.clone(),
                base_url: self.cloud_base_url.clone(),
                api_key,
            },
            local: LocalConfig {
                model: self.local_model.clone(),
                base_url: self.local_base_url.clone(),
            },
            timeout_secs: self.request_timeout_secs,
            proxy: self.proxy.clone(),
        }
    }
}
