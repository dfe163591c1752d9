//! Survey Pipeline Orchestrator
//!
//! Drives one run through its stages:
//! 1. CLASSIFICATION - hard gate, no partial output
//! 2. DESCRIPTION + HEADINGS - independent, run together via `tokio::join!`
//! 3. REVIEW - external schema edit through `SchemaReview`
//! 4. QUESTIONS - one call per column, degraded items do not stop the loop
//! 5. SCRIPT - optional, one call per question
//!
//! Hard stops return a `PipelineFailure` carrying the stage and everything
//! produced before it. Per-item loops keep column order whether they run
//! sequentially or through an order-preserving buffered stream.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use survey_designer_core::survey::dedupe_questions;
use survey_designer_core::{ColumnSchema, ConversationalScript, QuestionSpec, SurveyDefinition};
use survey_designer_llm::LlmGateway;
use thiserror::Error;
use tracing::{error, info, warn};

use super::classifier::{classify, Classification, ClassificationError};
use super::description::{generate_description, DescriptionError};
use super::headings::generate_headings;
use super::questions::question_or_default;
use super::script::script_step_or_default;
use crate::models::taxonomy::Taxonomy;

// ============================================================================
// Stages and errors
// ============================================================================

/// Pipeline stage. A failure names the stage that could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Classification,
    Description,
    Headings,
    Review,
    Questions,
    Script,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Classification => write!(f, "classification"),
            PipelineStage::Description => write!(f, "description"),
            PipelineStage::Headings => write!(f, "headings"),
            PipelineStage::Review => write!(f, "review"),
            PipelineStage::Questions => write!(f, "questions"),
            PipelineStage::Script => write!(f, "script"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

/// Hard-stop causes.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error("heading generation produced no columns")]
    EmptySchema,

    #[error("schema review rejected the headings: {0}")]
    ReviewRejected(String),

    #[error("reviewed schema has no columns")]
    EmptyReviewedSchema,
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Classification(_) => PipelineStage::Classification,
            PipelineError::Description(_) => PipelineStage::Description,
            PipelineError::EmptySchema => PipelineStage::Headings,
            PipelineError::ReviewRejected(_) | PipelineError::EmptyReviewedSchema => PipelineStage::Review,
        }
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// One item that received fallback content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedItem {
    pub index: usize,
    /// Column name or question text.
    pub name: String,
    pub reason: String,
}

/// Output of the design stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyDesign {
    pub query: String,
    pub started_at: DateTime<Local>,
    pub classification: Classification,
    pub description: String,
    pub schema: ColumnSchema,
    pub model_used: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionSet {
    pub definition: SurveyDefinition,
    pub degraded: Vec<DegradedItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptSet {
    pub script: ConversationalScript,
    pub degraded: Vec<DegradedItem>,
}

/// Everything a run produced. On failure, the fields after the failed stage
/// are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineArtifacts {
    pub query: String,
    pub started_at: DateTime<Local>,
    pub model_used: String,
    pub classification: Option<Classification>,
    pub description: Option<String>,
    pub schema: Option<ColumnSchema>,
    pub questions: Option<QuestionSet>,
    pub script: Option<ScriptSet>,
}

impl PipelineArtifacts {
    fn empty(query: &str, started_at: DateTime<Local>, model_used: String) -> Self {
        Self {
            query: query.to_string(),
            started_at,
            model_used,
            classification: None,
            description: None,
            schema: None,
            questions: None,
            script: None,
        }
    }

    fn from_design(design: SurveyDesign) -> Self {
        Self {
            query: design.query,
            started_at: design.started_at,
            model_used: design.model_used,
            classification: Some(design.classification),
            description: Some(design.description),
            schema: Some(design.schema),
            questions: None,
            script: None,
        }
    }
}

/// A hard-stopped run.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("pipeline failed at {stage}: {message}")]
pub struct PipelineFailure {
    pub stage: PipelineStage,
    pub message: String,
    pub partial: PipelineArtifacts,
}

impl PipelineFailure {
    pub fn new(err: PipelineError, partial: PipelineArtifacts) -> Self {
        let failure = Self {
            stage: err.stage(),
            message: err.to_string(),
            partial,
        };
        error!(stage = %failure.stage, message = %failure.message, "pipeline hard stop");
        failure
    }
}

// ============================================================================
// Schema review
// ============================================================================

/// External heading-edit step between design and question synthesis.
pub trait SchemaReview: Send + Sync {
    /// Return the schema to continue with, or a reason to stop.
    fn review(&self, schema: ColumnSchema) -> Result<ColumnSchema, String>;
}

/// Accepts the generated schema unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptSchema;

impl SchemaReview for AcceptSchema {
    fn review(&self, schema: ColumnSchema) -> Result<ColumnSchema, String> {
        Ok(schema)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub generate_script: bool,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct SurveyPipeline {
    gateway: Arc<LlmGateway>,
    taxonomy: Arc<Taxonomy>,
    max_concurrency: usize,
}

impl SurveyPipeline {
    pub fn new(gateway: Arc<LlmGateway>, taxonomy: Arc<Taxonomy>) -> Self {
        Self {
            gateway,
            taxonomy,
            max_concurrency: 1,
        }
    }

    /// Allow up to `n` item calls in flight. 1 keeps the loops sequential.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    /// Classify, then describe and generate headings.
    pub async fn design(&self, query: &str) -> Result<SurveyDesign, PipelineFailure> {
        let started_at = Local::now();
        let model_used = self.gateway.active_model();
        let partial = PipelineArtifacts::empty(query, started_at, model_used.clone());
        info!(query, model = %model_used, "survey design started");

        let classification = match classify(&self.gateway, &self.taxonomy, query).await {
            Ok(c) => c,
            Err(e) => return Err(PipelineFailure::new(e.into(), partial)),
        };
        let partial = PipelineArtifacts {
            classification: Some(classification.clone()),
            ..partial
        };

        let (description, schema) = tokio::join!(
            generate_description(&self.gateway, &self.taxonomy, query, &classification.vector),
            generate_headings(&self.gateway, &self.taxonomy, query, &classification.vector),
        );

        let description = match description {
            Ok(d) => d,
            Err(e) => {
                let partial = PipelineArtifacts {
                    schema: Some(schema),
                    ..partial
                };
                return Err(PipelineFailure::new(e.into(), partial));
            }
        };
        if schema.is_empty() {
            let partial = PipelineArtifacts {
                description: Some(description),
                ..partial
            };
            return Err(PipelineFailure::new(PipelineError::EmptySchema, partial));
        }

        info!(columns = schema.len(), "survey design complete");
        Ok(SurveyDesign {
            query: query.to_string(),
            started_at,
            classification,
            description,
            schema,
            model_used,
        })
    }

    /// One question per column, in column order.
    pub async fn synthesize_questions(&self, schema: &ColumnSchema, description: &str) -> QuestionSet {
        let gateway = &self.gateway;
        let columns: Vec<String> = schema.iter().cloned().collect();
        let outcomes = self
            .ordered(columns, |column| async move {
                let outcome = question_or_default(gateway, &column, description).await;
                (column, outcome)
            })
            .await;

        let mut set = QuestionSet::default();
        let mut names = Vec::with_capacity(outcomes.len());
        for (index, (column, outcome)) in outcomes.into_iter().enumerate() {
            if let Some(reason) = outcome.degraded {
                set.degraded.push(DegradedItem {
                    index,
                    name: column.clone(),
                    reason,
                });
            }
            names.push(column);
            set.definition.push(outcome.value);
        }

        // Script steps key on question text, so texts must be unique.
        for index in dedupe_questions(&mut set.definition, &names) {
            let question = &set.definition[index].question;
            warn!(column = %names[index], question = %question, "repeated question text renamed");
            let note = format!("repeated question text, renamed to '{}'", question);
            match set.degraded.iter_mut().find(|item| item.index == index) {
                Some(item) => item.reason = format!("{}; {}", item.reason, note),
                None => set.degraded.push(DegradedItem {
                    index,
                    name: names[index].clone(),
                    reason: note,
                }),
            }
        }
        set.degraded.sort_by_key(|item| item.index);

        info!(
            questions = set.definition.len(),
            degraded = set.degraded.len(),
            "questions synthesized"
        );
        set
    }

    /// One script step per question, in question order.
    pub async fn synthesize_script(&self, definition: &[QuestionSpec]) -> ScriptSet {
        let gateway = &self.gateway;
        let specs: Vec<&QuestionSpec> = definition.iter().collect();
        let outcomes = self
            .ordered(specs, |spec| async move {
                (spec.question.clone(), script_step_or_default(gateway, spec).await)
            })
            .await;

        let mut set = ScriptSet::default();
        for (index, (question, outcome)) in outcomes.into_iter().enumerate() {
            if let Some(reason) = outcome.degraded {
                set.degraded.push(DegradedItem {
                    index,
                    name: question,
                    reason,
                });
            }
            set.script.push(outcome.value);
        }
        info!(
            steps = set.script.len(),
            degraded = set.degraded.len(),
            "script synthesized"
        );
        set
    }

    /// Full run: design, review, questions and the optional script.
    pub async fn run(
        &self,
        query: &str,
        options: RunOptions,
        review: &dyn SchemaReview,
    ) -> Result<PipelineArtifacts, PipelineFailure> {
        let design = self.design(query).await?;
        let generated = design.schema.clone();
        let mut artifacts = PipelineArtifacts::from_design(design);

        let reviewed = match review.review(generated) {
            Ok(schema) => ColumnSchema::new(schema.into_inner()),
            Err(reason) => {
                return Err(PipelineFailure::new(PipelineError::ReviewRejected(reason), artifacts));
            }
        };
        if reviewed.is_empty() {
            return Err(PipelineFailure::new(PipelineError::EmptyReviewedSchema, artifacts));
        }
        artifacts.schema = Some(reviewed.clone());

        let description = artifacts.description.clone().unwrap_or_default();
        let questions = self.synthesize_questions(&reviewed, &description).await;
        for item in &questions.degraded {
            warn!(column = %item.name, "column received fallback question");
        }

        if options.generate_script {
            artifacts.script = Some(self.synthesize_script(&questions.definition).await);
        }
        artifacts.questions = Some(questions);

        info!(stage = %PipelineStage::Done, "pipeline run complete");
        Ok(artifacts)
    }

    /// Map `items` through `f`, keeping input order.
    async fn ordered<I, T, F, Fut>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
    {
        if self.max_concurrency <= 1 {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(f(item).await);
            }
            return out;
        }
        stream::iter(items)
            .map(f)
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{gateway_with, MockLlmProvider};
    use survey_designer_core::QuestionType;
    use survey_designer_llm::{LlmError, LlmResult};

    const CLASSIFICATION: &str = r#"{"query": "q", "classifications": {
        "level_based": "Urban Local Body",
        "methodology_based": "Sample",
        "purpose_based": "Monitoring & Evaluation",
        "sectoral": "Housing",
        "geographical": "Topographical",
        "frequency_based": "Ad hoc",
        "data_collection_method": "Quantitative"
    }}"#;

    /// Route each prompt by its opening line.
    fn scripted(headings: &'static str) -> impl Fn(&str) -> LlmResult<String> + Send + Sync {
        move |prompt: &str| {
            if prompt.starts_with("Classify this survey query") {
                Ok(CLASSIFICATION.to_string())
            } else if prompt.starts_with("Generate a professional survey description") {
                Ok("Survey Design: housing complex satisfaction.".to_string())
            } else if prompt.starts_with("Generate Excel column headings") {
                Ok(headings.to_string())
            } else if prompt.starts_with("Given a survey about") {
                let column = prompt
                    .split("data field '")
                    .nth(1)
                    .and_then(|rest| rest.split('\'').next())
                    .unwrap_or_default();
                Ok(format!(
                    r#"{{"question": "What is your {}?", "description": "d", "type": "text"}}"#,
                    column
                ))
            } else {
                Ok(r#"{"say": "Tell me", "explain": "e", "question_key": "x"}"#.to_string())
            }
        }
    }

    fn pipeline(provider: MockLlmProvider) -> SurveyPipeline {
        SurveyPipeline::new(
            Arc::new(gateway_with(Arc::new(provider))),
            Arc::new(Taxonomy::builtin().unwrap()),
        )
    }

    struct DropColumns;

    impl SchemaReview for DropColumns {
        fn review(&self, _schema: ColumnSchema) -> Result<ColumnSchema, String> {
            Ok(ColumnSchema::default())
        }
    }

    #[tokio::test]
    async fn test_design_succeeds() {
        let p = pipeline(MockLlmProvider::from_fn(scripted(r#"["Ward Number", "Rooms"]"#)));
        let design = p.design("Resident satisfaction").await.unwrap();
        assert_eq!(design.classification.vector.sectoral, "Housing");
        assert!(design.description.starts_with("Survey Design:"));
        assert_eq!(design.schema.columns(), &["Ward Number", "Rooms"]);
        assert_eq!(design.model_used, "mock-model");
    }

    #[tokio::test]
    async fn test_classification_failure_has_no_partial_output() {
        let p = pipeline(MockLlmProvider::with_text_response("I cannot classify that."));
        let failure = p.design("q").await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Classification);
        assert!(failure.partial.classification.is_none());
        assert!(failure.partial.description.is_none());
    }

    #[tokio::test]
    async fn test_empty_schema_is_failure() {
        let p = pipeline(MockLlmProvider::from_fn(scripted("no columns")));
        let failure = p.design("q").await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Headings);
        assert!(failure.partial.classification.is_some());
        assert!(failure.partial.description.is_some());
    }

    #[tokio::test]
    async fn test_description_failure_aborts() {
        let p = pipeline(MockLlmProvider::from_fn(|prompt: &str| {
            if prompt.starts_with("Generate a professional survey description") {
                Err(LlmError::Timeout { seconds: 60 })
            } else {
                scripted(r#"["A"]"#)(prompt)
            }
        }));
        let failure = p.design("q").await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Description);
        assert!(failure.message.contains("60"));
    }

    #[tokio::test]
    async fn test_run_preserves_column_order_concurrently() {
        let p = pipeline(MockLlmProvider::from_fn(scripted(r#"["A", "B", "C", "D", "E"]"#)))
            .with_max_concurrency(4);
        let artifacts = p
            .run("q", RunOptions { generate_script: true }, &AcceptSchema)
            .await
            .unwrap();

        let questions = artifacts.questions.unwrap();
        let texts: Vec<&str> = questions.definition.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(
            texts,
            vec!["What is your A?", "What is your B?", "What is your C?", "What is your D?", "What is your E?"]
        );

        let script = artifacts.script.unwrap().script;
        assert!(survey_designer_core::survey::script_matches_definition(&script, &questions.definition));
    }

    #[tokio::test]
    async fn test_degraded_questions_do_not_stop_run() {
        let p = pipeline(MockLlmProvider::from_fn(|prompt: &str| {
            if prompt.starts_with("Given a survey about") {
                Ok("not json".to_string())
            } else {
                scripted(r#"["household_income_range", "Age"]"#)(prompt)
            }
        }));
        let artifacts = p.run("q", RunOptions::default(), &AcceptSchema).await.unwrap();

        let questions = artifacts.questions.unwrap();
        assert_eq!(questions.degraded.len(), 2);
        assert_eq!(questions.degraded[0].name, "household_income_range");
        assert_eq!(questions.definition[0].question, "Household Income Range");
        assert_eq!(questions.definition[1].question_type, QuestionType::Text);
        assert!(artifacts.script.is_none());
    }

    #[tokio::test]
    async fn test_colliding_fallback_questions_are_made_unique() {
        let p = pipeline(MockLlmProvider::from_fn(|prompt: &str| {
            if prompt.starts_with("Given a survey about") {
                Err(LlmError::Timeout { seconds: 60 })
            } else {
                scripted(r#"["ward_no", "Ward No", "Rooms"]"#)(prompt)
            }
        }))
        .with_max_concurrency(2);
        let artifacts = p
            .run("q", RunOptions { generate_script: true }, &AcceptSchema)
            .await
            .unwrap();

        let questions = artifacts.questions.unwrap();
        let texts: Vec<&str> = questions.definition.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["Ward No", "Ward No (2)", "Rooms"]);
        assert_eq!(questions.degraded.len(), 3);
        assert!(questions.degraded[1].reason.contains("renamed to 'Ward No (2)'"));
        assert!(!questions.degraded[0].reason.contains("renamed"));

        let script = artifacts.script.unwrap().script;
        assert!(survey_designer_core::survey::script_matches_definition(&script, &questions.definition));
        for step in &script {
            let matches = texts.iter().filter(|t| **t == step.question_key).count();
            assert_eq!(matches, 1);
        }
    }

    #[tokio::test]
    async fn test_model_repeating_a_question_is_renamed_by_column() {
        let p = pipeline(MockLlmProvider::from_fn(|prompt: &str| {
            if prompt.starts_with("Given a survey about") {
                Ok(r#"{"question": "How satisfied are you?", "description": "d", "type": "rating"}"#.to_string())
            } else {
                scripted(r#"["Water Supply", "Maintenance"]"#)(prompt)
            }
        }));
        let set = p
            .synthesize_questions(&ColumnSchema::new(vec!["Water Supply".into(), "Maintenance".into()]), "d")
            .await;

        assert_eq!(set.definition[0].question, "How satisfied are you?");
        assert_eq!(set.definition[1].question, "How satisfied are you? (Maintenance)");
        assert_eq!(set.degraded.len(), 1);
        assert_eq!(set.degraded[0].index, 1);
        assert_eq!(set.degraded[0].name, "Maintenance");
    }

    #[tokio::test]
    async fn test_empty_review_is_failure() {
        let p = pipeline(MockLlmProvider::from_fn(scripted(r#"["A"]"#)));
        let failure = p.run("q", RunOptions::default(), &DropColumns).await.unwrap_err();
        assert_eq!(failure.stage, PipelineStage::Review);
        assert_eq!(failure.partial.schema.unwrap().columns(), &["A"]);
    }
}
