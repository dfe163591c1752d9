//! CLI Commands
//!
//! Argument parsing for the `survey-designer` binary and the handlers each
//! subcommand dispatches to. Handlers print results to stdout; diagnostics go
//! through `tracing` on stderr.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use survey_designer_llm::ProviderMode;

use crate::services::pipeline::DegradedItem;
use crate::state::{resolve_config, AppContext, Overrides, API_KEY_ENV, MODE_ENV};
use crate::storage::config::ConfigService;
use crate::utils::error::AppResult;

pub mod answer;
pub mod config;
pub mod design;
pub mod doctor;

/// Top-level CLI parser.
#[derive(Debug, Parser)]
#[command(
    name = "survey-designer",
    version,
    about = "Design surveys from a one-line requirement using an LLM"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.survey-designer/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Provider mode: cloud or local
    #[arg(long, global = true)]
    pub mode: Option<ProviderMode>,

    /// Directory for survey artifacts
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify a requirement and generate the description and headings
    Design {
        /// Free-text survey requirement
        query: String,
    },
    /// Generate questions from a survey's reviewed CSV header
    Questions {
        survey_id: String,
    },
    /// Generate the conversational script from a survey's questions
    Script {
        survey_id: String,
    },
    /// Run the whole pipeline without a review pause
    Run {
        query: String,
        /// Also generate the conversational script
        #[arg(long)]
        script: bool,
    },
    /// Extract a concise answer from a respondent's reply
    Answer {
        #[arg(long)]
        question: String,
        #[arg(long)]
        transcript: String,
    },
    /// Check both providers and the local model list
    Doctor,
    /// Show or change stored settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the stored configuration
    Show,
    /// Update stored settings
    Set {
        #[arg(long)]
        mode: Option<ProviderMode>,
        #[arg(long)]
        cloud_model: Option<String>,
        #[arg(long)]
        local_model: Option<String>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            mode: self.mode,
            output_dir: self.output_dir.clone(),
        }
    }

    fn open_config(&self) -> AppResult<ConfigService> {
        match &self.config {
            Some(path) => ConfigService::open(path.clone()),
            None => ConfigService::new(),
        }
    }
}

/// Run the parsed command.
pub async fn dispatch(cli: Cli) -> AppResult<()> {
    let mut config_service = cli.open_config()?;

    if let Commands::Config { action } = &cli.command {
        return config::handle(action, &mut config_service);
    }

    let env_mode = std::env::var(MODE_ENV).ok();
    let config = resolve_config(
        config_service.get_config().clone(),
        env_mode.as_deref(),
        &cli.overrides(),
    )?;
    let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
    let ctx = AppContext::init(config, api_key)?;

    match cli.command {
        Commands::Design { query } => design::design(&ctx, &query).await,
        Commands::Questions { survey_id } => design::questions(&ctx, &survey_id).await,
        Commands::Script { survey_id } => design::script(&ctx, &survey_id).await,
        Commands::Run { query, script } => design::run(&ctx, &query, script).await,
        Commands::Answer {
            question,
            transcript,
        } => answer::handle(&ctx, &question, &transcript).await,
        Commands::Doctor => doctor::handle(&ctx).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// List items that received fallback content so they can be fixed by hand.
pub(crate) fn print_degraded(kind: &str, items: &[DegradedItem]) {
    if items.is_empty() {
        return;
    }
    println!("{} {} used fallback content:", items.len(), kind);
    for item in items {
        println!("  [{}] {} ({})", item.index + 1, item.name, item.reason);
    }
}
