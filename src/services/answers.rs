//! Answer Extraction
//!
//! Turns a respondent's free-text reply into a concise answer for storage.
//! Falls back to the raw reply when the model is unavailable or returns
//! nothing.

use survey_designer_llm::LlmGateway;
use tracing::warn;

use super::synthesis::{degrade_to_default, ItemOutcome, SynthesisError};

pub const PURPOSE: &str = "answer_extraction";

pub fn build_answer_prompt(question: &str, transcript: &str) -> String {
    format!(
        r#"Extract the answer to the survey question from the respondent's reply.

Question: "{question}"
Reply: "{transcript}"

Rules:
- For ratings, return only the number.
- For yes/no questions, return only "Yes" or "No".
- For open-ended questions, return a concise summary of the answer.

Return ONLY the extracted answer, with no extra text."#
    )
}

/// Strip quotes and trailing periods the model tends to add.
fn clean_answer(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches('.')
        .trim()
        .to_string()
}

pub async fn extract_answer(gateway: &LlmGateway, question: &str, transcript: &str) -> ItemOutcome<String> {
    let attempt = async {
        let response = gateway
            .generate(&build_answer_prompt(question, transcript), PURPOSE)
            .await?;
        let answer = clean_answer(&response);
        if answer.is_empty() {
            return Err(SynthesisError::EmptyField("answer"));
        }
        Ok(answer)
    };

    let outcome = degrade_to_default(attempt.await, || transcript.trim().to_string());
    if let Some(reason) = &outcome.degraded {
        warn!(question, reason = %reason, "answer extraction fell back to raw reply");
    }
    outcome
}
