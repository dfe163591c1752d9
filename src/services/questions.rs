//! Per-Question Synthesizer
//!
//! One LLM call per schema column, producing `{question, description, type}`.
//! `question_or_default` applies the deterministic fallback so callers never
//! see an error, only a possibly degraded item.

use survey_designer_core::{extract_json_object, QuestionSpec, QuestionType};
use survey_designer_llm::LlmGateway;
use tracing::warn;

use super::synthesis::{degrade_to_default, required_string, ItemOutcome, SynthesisError};

pub const PURPOSE: &str = "question";

pub fn build_question_prompt(column: &str, description: &str) -> String {
    format!(
        "Given a survey about '{description}', generate a JSON object for a single survey question \
         based on the data field '{column}'. The JSON object must have ONLY three keys: \
         \"question\", \"description\", and \"type\" (choose from 'text', 'yes/no', or 'rating_1_10')."
    )
}

/// Parse and validate a question payload.
pub fn parse_question(raw: &str) -> Result<QuestionSpec, SynthesisError> {
    let map = extract_json_object(raw)?;
    let question = required_string(&map, "question")?;
    let description = required_string(&map, "description")?;
    let type_name = required_string(&map, "type")?;
    let question_type =
        QuestionType::parse_lenient(&type_name).ok_or(SynthesisError::InvalidType(type_name))?;

    Ok(QuestionSpec {
        question,
        description,
        question_type,
    })
}

/// Generate the question for one column.
pub async fn synthesize_question(
    gateway: &LlmGateway,
    column: &str,
    survey_description: &str,
) -> Result<QuestionSpec, SynthesisError> {
    let prompt = build_question_prompt(column, survey_description);
    let response = gateway.generate(&prompt, PURPOSE).await?;
    parse_question(&response)
}

/// Generate the question for one column, falling back to the default.
pub async fn question_or_default(
    gateway: &LlmGateway,
    column: &str,
    survey_description: &str,
) -> ItemOutcome<QuestionSpec> {
    let outcome = degrade_to_default(
        synthesize_question(gateway, column, survey_description).await,
        || QuestionSpec::fallback(column),
    );
    if let Some(reason) = &outcome.degraded {
        warn!(column, reason = %reason, "question fell back to default");
    }
    outcome
}
