//! Services
//!
//! Generation stages of the survey pipeline and the orchestrator that
//! sequences them. Commands call `SurveyPipeline`; the individual stages are
//! public for callers that drive a single step.

pub mod answers;
pub mod classifier;
pub mod description;
pub mod headings;
pub mod pipeline;
pub mod questions;
pub mod script;
pub mod synthesis;

#[cfg(test)]
pub(crate) mod test_support;

pub use classifier::{classify, Classification, ClassificationError};
pub use pipeline::{
    AcceptSchema, DegradedItem, PipelineArtifacts, PipelineError, PipelineFailure, PipelineStage,
    QuestionSet, RunOptions, SchemaReview, ScriptSet, SurveyDesign, SurveyPipeline,
};
pub use synthesis::{degrade_to_default, ItemOutcome, SynthesisError};
