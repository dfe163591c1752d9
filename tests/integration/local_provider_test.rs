//! Local Provider Tests
//!
//! The local inference service is stopped: every call must come back as
//! `ProviderUnavailable` within the timeout, and per-item stages must still
//! complete on fallbacks.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use survey_designer::models::settings::AppConfig;
use survey_designer::models::taxonomy::Taxonomy;
use survey_designer::services::pipeline::{AcceptSchema, PipelineStage, RunOptions, SurveyPipeline};
use survey_designer_core::survey::{FALLBACK_QUESTION_DESCRIPTION, script_matches_definition};
use survey_designer_core::QuestionType;
use survey_designer_llm::{LlmError, LlmGateway, LlmProvider, OllamaProvider, ProviderMode};

use crate::support::ScriptedProvider;

/// Base URL of a port nothing is listening on.
fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn stopped_ollama() -> Arc<OllamaProvider> {
    let config = AppConfig {
        llm_mode: ProviderMode::Local,
        local_base_url: refused_url(),
        request_timeout_secs: 60,
        ..Default::default()
    };
    Arc::new(OllamaProvider::new(&config.provider_config(None)).unwrap())
}

#[tokio::test]
async fn test_connection_refused_is_unavailable() {
    let provider = stopped_ollama();

    let started = Instant::now();
    let err = provider.generate("hello").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(60));

    match err {
        LlmError::ProviderUnavailable { message } => {
            assert!(message.contains("ollama serve"));
            assert!(message.contains("gemma2"));
        }
        other => panic!("expected ProviderUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_run_stops_at_classification() {
    let gateway = LlmGateway::with_providers(
        Arc::new(ScriptedProvider::housing()),
        stopped_ollama(),
        ProviderMode::Local,
    );
    let p = SurveyPipeline::new(Arc::new(gateway), Arc::new(Taxonomy::builtin().unwrap()));

    let failure = p.run("Housing survey", RunOptions::default(), &AcceptSchema).await.unwrap_err();
    assert_eq!(failure.stage, PipelineStage::Classification);
    assert!(failure.message.contains("ollama serve"));
    assert!(failure.partial.classification.is_none());
}

#[tokio::test]
async fn test_items_fall_back_when_local_service_stops() {
    let gateway = LlmGateway::with_providers(
        Arc::new(ScriptedProvider::housing()),
        stopped_ollama(),
        ProviderMode::Cloud,
    );
    let switch = gateway.mode_switch();
    let p = SurveyPipeline::new(Arc::new(gateway), Arc::new(Taxonomy::builtin().unwrap()))
        .with_max_concurrency(4);

    let design = p.design("Design a resident satisfaction survey").await.unwrap();
    switch.set(ProviderMode::Local);

    let questions = p.synthesize_questions(&design.schema, &design.description).await;
    assert_eq!(questions.definition.len(), design.schema.len());
    assert_eq!(questions.degraded.len(), design.schema.len());
    for spec in &questions.definition {
        assert_eq!(spec.question_type, QuestionType::Text);
        assert_eq!(spec.description, FALLBACK_QUESTION_DESCRIPTION);
    }
    assert_eq!(questions.definition[0].question, "Ward Number");
    assert!(questions.degraded[0].reason.contains("ollama serve"));

    let script = p.synthesize_script(&questions.definition).await;
    assert_eq!(script.degraded.len(), questions.definition.len());
    assert!(script_matches_definition(&script.script, &questions.definition));
    assert_eq!(script.script[0].say, "Ward Number");
}
