//! Application Context
//!
//! Everything one CLI invocation needs, resolved once from the config file,
//! the environment and command-line overrides. Services below this point
//! receive explicit values and never read the environment themselves.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use survey_designer_llm::{LlmGateway, PromptLog, ProviderMode};
use tracing::{debug, info};

use crate::models::settings::AppConfig;
use crate::models::taxonomy::Taxonomy;
use crate::services::pipeline::SurveyPipeline;
use crate::storage::artifacts::ArtifactStore;
use crate::utils::error::{AppError, AppResult};

/// Cloud credential, supplied out of band and never persisted.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Provider mode override: cloud|online|local|offline.
pub const MODE_ENV: &str = "LLM_MODE";

/// Command-line overrides, applied after the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<ProviderMode>,
    pub output_dir: Option<PathBuf>,
}

/// Layer `LLM_MODE` and CLI flags over the stored config.
pub fn resolve_config(
    mut config: AppConfig,
    env_mode: Option<&str>,
    overrides: &Overrides,
) -> AppResult<AppConfig> {
    if let Some(raw) = env_mode.map(str::trim).filter(|s| !s.is_empty()) {
        config.llm_mode = ProviderMode::from_str(raw)
            .map_err(|_| AppError::config(format!("{MODE_ENV}='{raw}' is not one of cloud, online, local, offline")))?;
        debug!(mode = %config.llm_mode, "mode taken from environment");
    }
    if let Some(mode) = overrides.mode {
        config.llm_mode = mode;
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    config.validate().map_err(AppError::validation)?;
    Ok(config)
}

/// Resolved services for one invocation.
pub struct AppContext {
    pub config: AppConfig,
    pub pipeline: SurveyPipeline,
    pub store: ArtifactStore,
}

impl AppContext {
    pub fn init(config: AppConfig, api_key: Option<String>) -> AppResult<Self> {
        let taxonomy = Taxonomy::load_or_builtin(config.taxonomy_path.as_deref())?;
        let gateway = LlmGateway::from_config(&config.provider_config(api_key))?
            .with_prompt_log(PromptLog::new(&config.prompt_log_dir));
        let pipeline = SurveyPipeline::new(Arc::new(gateway), Arc::new(taxonomy))
            .with_max_concurrency(config.max_concurrency);
        let store = ArtifactStore::new(&config.output_dir, config.template_blank_rows);

        info!(
            mode = %config.llm_mode,
            output_dir = %config.output_dir.display(),
            "application context ready"
        );
        Ok(Self {
            config,
            pipeline,
            store,
        })
    }

    pub fn gateway(&self) -> &LlmGateway {
        self.pipeline.gateway()
    }
}
