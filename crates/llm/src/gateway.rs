//! LLM Gateway
//!
//! Single entry point for generation. Holds one provider per mode and a
//! shared mode switch; each call reads the mode when it starts, so a switch
//! between calls takes effect on the next call only. Every prompt is written
//! to the audit log before it is dispatched.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use super::gemini::GeminiProvider;
use super::ollama::OllamaProvider;
use super::prompt_log::PromptLog;
use super::provider::LlmProvider;
use super::types::{LlmError, LlmResult, ProviderConfig, ProviderMode};

/// Shared, clonable provider-mode flag.
#[derive(Debug, Clone)]
pub struct ModeSwitch(Arc<AtomicU8>);

impl ModeSwitch {
    pub fn new(mode: ProviderMode) -> Self {
        Self(Arc::new(AtomicU8::new(Self::encode(mode))))
    }

    fn encode(mode: ProviderMode) -> u8 {
        match mode {
            ProviderMode::Cloud => 0,
            ProviderMode::Local => 1,
        }
    }

    pub fn get(&self) -> ProviderMode {
        match self.0.load(Ordering::SeqCst) {
            0 => ProviderMode::Cloud,
            _ => ProviderMode::Local,
        }
    }

    pub fn set(&self, mode: ProviderMode) {
        self.0.store(Self::encode(mode), Ordering::SeqCst);
    }
}

/// Health of one provider, as reported by `doctor`.
#[derive(Debug)]
pub struct ProviderHealth {
    pub mode: ProviderMode,
    pub provider: &'static str,
    pub model: String,
    pub status: LlmResult<()>,
    /// `None` when listing is unsupported or failed.
    pub models: Option<Vec<String>>,
}

impl ProviderHealth {
    /// True when the provider lists models and the configured one is absent.
    /// Ollama lists tagged names (`gemma2:latest`), so a bare name matches any tag.
    pub fn model_missing(&self) -> bool {
        match &self.models {
            Some(models) => !models.iter().any(|m| {
                m == &self.model || m.split(':').next() == Some(self.model.as_str())
            }),
            None => false,
        }
    }
}

/// Mode-switching front for the cloud and local providers.
#[derive(Clone)]
pub struct LlmGateway {
    cloud: Arc<dyn LlmProvider>,
    local: Arc<dyn LlmProvider>,
    mode: ModeSwitch,
    prompt_log: Option<PromptLog>,
}

impl LlmGateway {
    /// Build both providers from an explicit configuration.
    pub fn from_config(config: &ProviderConfig) -> LlmResult<Self> {
        let cloud: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(config)?);
        let local: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::new(config)?);
        info!(
            mode = %config.mode,
            cloud_model = %config.cloud.model,
            local_model = %config.local.model,
            "LLM gateway ready"
        );
        Ok(Self::with_providers(cloud, local, config.mode))
    }

    /// Build from ready-made providers.
    pub fn with_providers(
        cloud: Arc<dyn LlmProvider>,
        local: Arc<dyn LlmProvider>,
        mode: ProviderMode,
    ) -> Self {
        Self {
            cloud,
            local,
            mode: ModeSwitch::new(mode),
            prompt_log: None,
        }
    }

    pub fn with_prompt_log(mut self, log: PromptLog) -> Self {
        self.prompt_log = Some(log);
        self
    }

    /// Handle for switching modes between calls.
    pub fn mode_switch(&self) -> ModeSwitch {
        self.mode.clone()
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode.get()
    }

    pub fn provider(&self, mode: ProviderMode) -> &Arc<dyn LlmProvider> {
        match mode {
            ProviderMode::Cloud => &self.cloud,
            ProviderMode::Local => &self.local,
        }
    }

    /// Model of the currently selected provider.
    pub fn active_model(&self) -> String {
        self.provider(self.mode()).model().to_string()
    }

    /// Generate text for `prompt`. `purpose` tags the audit record.
    pub async fn generate(&self, prompt: &str, purpose: &str) -> LlmResult<String> {
        let mode = self.mode.get();
        let provider = self.provider(mode);

        if let Some(log) = &self.prompt_log {
            log.record_async(provider.model(), purpose, prompt).await;
        }
        debug!(%mode, provider = provider.name(), purpose, "dispatching prompt");

        provider.generate(prompt).await
    }

    /// Probe one provider.
    pub async fn health(&self, mode: ProviderMode) -> ProviderHealth {
        let provider = self.provider(mode);
        let status = provider.health_check().await;
        let models = match &status {
            Ok(()) => provider.list_models().await.ok().flatten(),
            Err(_) => None,
        };
        ProviderHealth {
            mode,
            provider: provider.name(),
            model: provider.model().to_string(),
            status,
            models,
        }
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("cloud", &self.cloud.model())
            .field("local", &self.local.model())
            .field("mode", &self.mode.get())
            .finish()
    }
}

/// Short message for an `LlmError`, with the operator hint kept for
/// unreachable local services.
pub fn describe_error(err: &LlmError) -> String {
    match err {
        LlmError::ProviderUnavailable { message } => message.clone(),
        other => other.to_string(),
    }
}
