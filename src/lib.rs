//! Survey Designer
//!
//! Turns a one-line survey requirement into a deployable survey:
//! - Classification against a fixed seven-category taxonomy
//! - Survey description and column headings
//! - One question per column, with deterministic fallbacks
//! - An optional conversational script for voice collection
//!
//! The LLM providers live in `survey-designer-llm`; the data model and JSON
//! extraction in `survey-designer-core`.

pub mod commands;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::settings::{AppConfig, SettingsUpdate};
pub use models::taxonomy::Taxonomy;
pub use services::pipeline::{
    AcceptSchema, PipelineArtifacts, PipelineFailure, PipelineStage, RunOptions, SchemaReview,
    SurveyDesign, SurveyPipeline,
};
pub use state::AppContext;
pub use storage::artifacts::ArtifactStore;
pub use utils::error::{AppError, AppResult};
