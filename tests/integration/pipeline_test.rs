//! Pipeline Integration Tests
//!
//! Full runs over a scripted cloud provider, including persistence and the
//! prompt audit log.

use std::sync::Arc;

use chrono::Local;
use survey_designer::models::taxonomy::Taxonomy;
use survey_designer::services::pipeline::{
    AcceptSchema, PipelineStage, RunOptions, SchemaReview, SurveyPipeline,
};
use survey_designer::storage::artifacts::{ArtifactKind, ArtifactStore};
use survey_designer_core::survey::script_matches_definition;
use survey_designer_core::{ColumnSchema, MAX_COLUMNS};
use survey_designer_llm::{LlmProvider, PromptLog};

use crate::support::{gateway, ScriptedProvider};

const QUERY: &str = "Design a resident satisfaction survey for a housing complex.";

fn idle_local() -> Arc<dyn LlmProvider> {
    Arc::new(ScriptedProvider::new("[]"))
}

fn pipeline(provider: Arc<ScriptedProvider>) -> SurveyPipeline {
    SurveyPipeline::new(
        Arc::new(gateway(provider, idle_local())),
        Arc::new(Taxonomy::builtin().unwrap()),
    )
}

/// Drops the last column and adds one, as an operator editing the CSV would.
struct EditColumns;

impl SchemaReview for EditColumns {
    fn review(&self, schema: ColumnSchema) -> Result<ColumnSchema, String> {
        let mut columns = schema.into_inner();
        columns.pop();
        columns.push("Preferred Contact Time".to_string());
        Ok(ColumnSchema::new(columns))
    }
}

#[tokio::test]
async fn test_housing_end_to_end() {
    let provider = Arc::new(ScriptedProvider::housing());
    let p = pipeline(provider.clone());

    let artifacts = p
        .run(QUERY, RunOptions { generate_script: true }, &AcceptSchema)
        .await
        .unwrap();

    let classification = artifacts.classification.as_ref().unwrap();
    assert_eq!(classification.vector.sectoral, "Housing");
    assert!(classification.off_taxonomy.is_empty());
    assert!(artifacts.description.as_ref().unwrap().starts_with("Survey Design:"));

    let schema = artifacts.schema.as_ref().unwrap();
    assert!(!schema.is_empty() && schema.len() <= MAX_COLUMNS);

    let questions = artifacts.questions.as_ref().unwrap();
    assert_eq!(questions.definition.len(), schema.len());
    assert!(questions.degraded.is_empty());
    for (column, spec) in schema.iter().zip(&questions.definition) {
        assert!(!spec.question.is_empty());
        assert!(spec.question.contains(column.as_str()));
    }

    let script = &artifacts.script.as_ref().unwrap().script;
    assert!(script_matches_definition(script, &questions.definition));

    // classification + description + headings + one per column + one per step
    assert_eq!(provider.prompts.lock().unwrap().len(), 3 + 2 * schema.len());
}

#[tokio::test]
async fn test_reviewed_schema_drives_questions() {
    let p = pipeline(Arc::new(ScriptedProvider::housing()));
    let artifacts = p.run(QUERY, RunOptions::default(), &EditColumns).await.unwrap();

    let schema = artifacts.schema.unwrap();
    assert_eq!(schema.columns().last().map(String::as_str), Some("Preferred Contact Time"));
    let questions = artifacts.questions.unwrap().definition;
    assert_eq!(questions.last().unwrap().question, "Please tell us your Preferred Contact Time.");
}

#[tokio::test]
async fn test_oversized_heading_list_is_capped() {
    let headings: Vec<String> = (1..=20).map(|i| format!("\"Field {i}\"")).collect();
    let p = pipeline(Arc::new(ScriptedProvider::new(&format!("[{}]", headings.join(",")))))
        .with_max_concurrency(3);

    let design = p.design(QUERY).await.unwrap();
    assert_eq!(design.schema.len(), MAX_COLUMNS);

    let set = p.synthesize_questions(&design.schema, &design.description).await;
    assert_eq!(set.definition.len(), MAX_COLUMNS);
    assert_eq!(set.definition[14].question, "Please tell us your Field 15.");
}

#[tokio::test]
async fn test_empty_headings_write_error_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path(), 5);
    let p = pipeline(Arc::new(ScriptedProvider::new("I could not think of any columns.")));

    let failure = p.run(QUERY, RunOptions::default(), &AcceptSchema).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Headings);

    let id = ArtifactStore::survey_id(QUERY, failure.partial.started_at);
    assert!(id.starts_with("Design_"));
    let path = store.save_error(&id, &failure).unwrap();

    let record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(record["stage"], "headings");
    assert_eq!(record["partial"]["classification"]["vector"]["sectoral"], "Housing");
    assert!(!store.path_for(&id, ArtifactKind::Template).exists());
}

#[tokio::test]
async fn test_design_then_questions_across_invocations() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path(), 5);
    let p = pipeline(Arc::new(ScriptedProvider::housing()));

    let design = p.design(QUERY).await.unwrap();
    let id = ArtifactStore::survey_id(QUERY, design.started_at);
    store.save_design(&id, &design).unwrap();

    // Operator trims the header to two columns.
    std::fs::write(
        store.path_for(&id, ArtifactKind::Template),
        "Ward Number,\"Rent, monthly\"\r\n,\r\n",
    )
    .unwrap();

    let schema = store.load_schema(&id).unwrap();
    let description = store.load_description(&id).unwrap();
    let set = p.synthesize_questions(&schema, &description).await;
    store.save_questions(&id, &set.definition).unwrap();

    let loaded = store.load_questions(&id).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].question, "Please tell us your Rent, monthly.");

    let script = p.synthesize_script(&loaded).await;
    store.save_script(&id, &script.script).unwrap();
    assert!(script_matches_definition(&store.load_script(&id).unwrap(), &loaded));
}

#[tokio::test]
async fn test_prompts_are_logged_before_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let log = PromptLog::new(dir.path());
    let gateway = gateway(Arc::new(ScriptedProvider::housing()), idle_local()).with_prompt_log(log.clone());
    let p = SurveyPipeline::new(Arc::new(gateway), Arc::new(Taxonomy::builtin().unwrap()));

    let started = Local::now();
    let design = p.design(QUERY).await.unwrap();

    let records = log.read_day(started).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].purpose, "classification");
    let mut later: Vec<&str> = records[1..].iter().map(|r| r.purpose.as_str()).collect();
    later.sort();
    assert_eq!(later, vec!["description", "headings"]);
    assert!(records.iter().all(|r| r.model == "scripted-model"));
    let headings = records.iter().find(|r| r.purpose == "headings").unwrap();
    assert!(headings.prompt.contains(&design.classification.vector.sectoral));
}
