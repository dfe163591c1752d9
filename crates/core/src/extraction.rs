//! Structured Extraction
//!
//! Pulls a JSON value out of free-form model output. Models wrap JSON in
//! markdown fences, prefix it with a `json` label, or surround it with prose;
//! extraction tries a fixed sequence of candidate locators and parses the
//! first candidate found:
//!
//! 1. a fence opened with a JSON tag (```` ```json ````)
//! 2. any fence (```` ``` ````)
//! 3. the raw, trimmed text
//!
//! Each locator is a pure `&str -> Option<&str>` function. Extraction is
//! deterministic: the same input always yields the same value.

use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

/// Longest candidate excerpt carried in an error.
const EXCERPT_CHARS: usize = 200;

/// Extraction failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    /// Nothing resembling JSON was found.
    #[error("no JSON found in response")]
    Empty,

    /// A candidate was located but did not parse.
    #[error("malformed JSON ({message}) in: {candidate}")]
    Malformed { candidate: String, message: String },

    /// The JSON parsed but has the wrong shape.
    #[error("expected a JSON {expected}, got: {candidate}")]
    WrongShape {
        expected: &'static str,
        candidate: String,
    },
}

/// Candidate locator: returns the slice to parse, if it applies.
type Locator = fn(&str) -> Option<&str>;

const LOCATORS: [Locator; 3] = [fenced_json, fenced_any, raw];

/// Body of the first fence opened with a `json` tag.
pub fn fenced_json(text: &str) -> Option<&str> {
    let lower = text.to_ascii_lowercase();
    let open = lower.find("```json")?;
    let body_start = open + "```json".len();
    let close = text[body_start..].find(FENCE)?;
    Some(text[body_start..body_start + close].trim())
}

/// Body of the first fenced block, whatever its tag.
pub fn fenced_any(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    let body_start = open + FENCE.len();
    let close = text[body_start..].find(FENCE)?;
    Some(text[body_start..body_start + close].trim())
}

/// The whole text, trimmed.
pub fn raw(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Remove a leading case-insensitive `json` label (e.g. `json\n{...}`).
fn strip_json_label(candidate: &str) -> &str {
    let trimmed = candidate.trim_start();
    if let Some(label) = trimmed.get(..4) {
        if label.eq_ignore_ascii_case("json") {
            let rest = &trimmed[4..];
            // Only a label when followed by a separator or the value itself.
            if rest.is_empty()
                || rest.starts_with(|c: char| c.is_whitespace() || matches!(c, ':' | '{' | '['))
            {
                return rest.trim_start_matches(':').trim();
            }
        }
    }
    trimmed.trim()
}

/// Pick the candidate substring to parse.
fn candidate(text: &str) -> Option<&str> {
    LOCATORS
        .iter()
        .find_map(|locate| locate(text))
        .map(strip_json_label)
        .filter(|c| !c.is_empty())
}

fn excerpt(s: &str) -> String {
    s.chars().take(EXCERPT_CHARS).collect()
}

fn malformed(candidate: &str, err: serde_json::Error) -> ExtractionError {
    ExtractionError::Malformed {
        candidate: excerpt(candidate),
        message: err.to_string(),
    }
}

/// Find the span from the first `open` to its balanced `close`, skipping
/// delimiters inside JSON strings.
pub fn balanced_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract any JSON value from model output.
pub fn extract_json(raw_text: &str) -> Result<Value, ExtractionError> {
    let candidate = candidate(raw_text).ok_or(ExtractionError::Empty)?;
    serde_json::from_str(candidate).map_err(|e| malformed(candidate, e))
}

/// Extract a JSON object. Falls back to the first balanced `{...}` span when
/// the candidate is wrapped in prose.
pub fn extract_json_object(raw_text: &str) -> Result<serde_json::Map<String, Value>, ExtractionError> {
    let candidate = candidate(raw_text).ok_or(ExtractionError::Empty)?;
    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(err) => match balanced_span(candidate, '{', '}') {
            Some(span) => serde_json::from_str(span).map_err(|e| malformed(span, e))?,
            None => return Err(malformed(candidate, err)),
        },
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractionError::WrongShape {
            expected: "object",
            candidate: excerpt(&other.to_string()),
        }),
    }
}

/// Extract a JSON array. When the candidate is not already `[`...`]`
/// delimited, the first `[` and its matching `]` are used.
pub fn extract_json_array(raw_text: &str) -> Result<Vec<Value>, ExtractionError> {
    let candidate = candidate(raw_text).ok_or(ExtractionError::Empty)?;
    let slice = if candidate.starts_with('[') && candidate.ends_with(']') {
        candidate
    } else {
        balanced_span(candidate, '[', ']').ok_or_else(|| ExtractionError::WrongShape {
            expected: "array",
            candidate: excerpt(candidate),
        })?
    };

    match serde_json::from_str::<Value>(slice).map_err(|e| malformed(slice, e))? {
        Value::Array(items) => Ok(items),
        other => Err(ExtractionError::WrongShape {
            expected: "array",
            candidate: excerpt(&other.to_string()),
        }),
    }
}
