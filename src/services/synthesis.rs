//! Item-Level Synthesis Outcomes
//!
//! Per-item generation (one question per column, one script step per
//! question) never fails outward. Each attempt yields a
//! `Result<T, SynthesisError>`; `degrade_to_default` turns that into an
//! `ItemOutcome<T>` holding either the generated value or the deterministic
//! fallback together with the reason it was used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use survey_designer_core::ExtractionError;
use survey_designer_llm::{describe_error, LlmError};
use thiserror::Error;

/// Why a single item could not be generated.
#[derive(Error, Debug, Clone)]
pub enum SynthesisError {
    #[error("{}", describe_error(.0))]
    Llm(#[from] LlmError),

    #[error("could not extract JSON: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("unsupported question type '{0}'")]
    InvalidType(String),
}

/// Result of generating one item, after fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome<T> {
    pub value: T,
    /// Set when `value` is the fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl<T> ItemOutcome<T> {
    pub fn generated(value: T) -> Self {
        Self {
            value,
            degraded: None,
        }
    }

    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Self {
            value,
            degraded: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Replace a failed attempt with `fallback()`, recording the reason.
pub fn degrade_to_default<T>(
    attempt: Result<T, SynthesisError>,
    fallback: impl FnOnce() -> T,
) -> ItemOutcome<T> {
    match attempt {
        Ok(value) => ItemOutcome::generated(value),
        Err(err) => ItemOutcome::fallback(fallback(), err.to_string()),
    }
}

/// A required, non-empty string field of a model payload.
pub fn required_string(map: &Map<String, Value>, key: &'static str) -> Result<String, SynthesisError> {
    let text = map
        .get(key)
        .and_then(Value::as_str)
        .ok_or(SynthesisError::MissingField(key))?
        .trim();

    if text.is_empty() {
        return Err(SynthesisError::EmptyField(key));
    }
    Ok(text.to_string())
}
