//! Conversational Script Synthesizer
//!
//! Rephrases each question for spoken delivery as `{say, explain,
//! question_key}`. The key always equals the source question text.

use survey_designer_core::{extract_json_object, QuestionSpec, ScriptStep};
use survey_designer_llm::LlmGateway;
use tracing::{debug, warn};

use super::synthesis::{degrade_to_default, required_string, ItemOutcome, SynthesisError};

pub const PURPOSE: &str = "script";

pub fn build_script_prompt(spec: &QuestionSpec) -> String {
    format!(
        r#"You are a friendly survey assistant speaking to a respondent.
Rephrase the following survey question so it sounds natural when spoken aloud.

Question: "{question}"
Details: "{description}"
Answer type: {question_type}

Return ONLY a JSON object with exactly these keys:
- "say": the conversational question to ask
- "explain": a short explanation to give if the respondent asks for clarification
- "question_key": the original question text, unchanged
"#,
        question = spec.question,
        description = spec.description,
        question_type = spec.question_type,
    )
}

/// Parse a script payload. The key is tied to `spec.question` whatever the
/// model returned.
pub fn parse_script_step(raw: &str, spec: &QuestionSpec) -> Result<ScriptStep, SynthesisError> {
    let map = extract_json_object(raw)?;
    let say = required_string(&map, "say")?;
    let explain = required_string(&map, "explain")?;

    if let Some(key) = map.get("question_key").and_then(|v| v.as_str()) {
        if key.trim() != spec.question {
            debug!(returned = key, expected = %spec.question, "question_key replaced");
        }
    }

    Ok(ScriptStep {
        say,
        explain,
        question_key: spec.question.clone(),
    })
}

pub async fn synthesize_script_step(
    gateway: &LlmGateway,
    spec: &QuestionSpec,
) -> Result<ScriptStep, SynthesisError> {
    let prompt = build_script_prompt(spec);
    let response = gateway.generate(&prompt, PURPOSE).await?;
    parse_script_step(&response, spec)
}

pub async fn script_step_or_default(gateway: &LlmGateway, spec: &QuestionSpec) -> ItemOutcome<ScriptStep> {
    let outcome = degrade_to_default(synthesize_script_step(gateway, spec).await, || {
        ScriptStep::fallback(spec)
    });
    if let Some(reason) = &outcome.degraded {
        warn!(question = %spec.question, reason = %reason, "script step fell back to default");
    }
    outcome
}
