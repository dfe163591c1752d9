//! Description Generator
//!
//! Produces the plain-text survey description from the query and its
//! classification. The 100-150 word length is requested in the prompt and
//! not enforced.

use survey_designer_core::ClassificationVector;
use survey_designer_llm::{describe_error, LlmError, LlmGateway};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::taxonomy::Taxonomy;

pub const PURPOSE: &str = "description";

/// Required opening of every description.
pub const DESCRIPTION_PREFIX: &str = "Survey Design:";

#[derive(Error, Debug, Clone)]
pub enum DescriptionError {
    #[error("{}", describe_error(.0))]
    Llm(#[from] LlmError),

    #[error("model returned an empty description")]
    Empty,
}

pub fn build_description_prompt(taxonomy: &Taxonomy, query: &str, vector: &ClassificationVector) -> String {
    let details: Vec<String> = vector
        .iter()
        .filter_map(|(category, value)| {
            taxonomy.description_of(category, value).map(|desc| {
                format!(
                    "- {} ({}): {}",
                    value,
                    survey_designer_core::humanize(category.key()),
                    desc
                )
            })
        })
        .collect();
    let classifications = serde_json::to_string_pretty(vector).unwrap_or_default();

    format!(
        r#"Generate a professional survey description based on:

User Query: "{query}"
Classifications: {classifications}

Description Requirements:
1. Start with "{DESCRIPTION_PREFIX} {query}"
2. Incorporate all classification categories naturally
3. Explain the survey's purpose and methodology
4. Mention sector-specific considerations
5. Keep it concise (100-150 words)
6. Use professional government survey terminology

Classification Details:
{details}

Do NOT include:
- State/district specific examples unless mentioned in query
- Markdown formatting
- Any JSON structures

Output ONLY the description text.
"#,
        details = details.join("\n")
    )
}

/// Generate the survey description. An empty reply is an error.
pub async fn generate_description(
    gateway: &LlmGateway,
    taxonomy: &Taxonomy,
    query: &str,
    vector: &ClassificationVector,
) -> Result<String, DescriptionError> {
    let prompt = build_description_prompt(taxonomy, query, vector);
    let text = gateway.generate(&prompt, PURPOSE).await?.trim().to_string();

    if text.is_empty() {
        return Err(DescriptionError::Empty);
    }
    if !text.starts_with(DESCRIPTION_PREFIX) {
        debug!("description does not open with the requested prefix");
    }
    info!(words = text.split_whitespace().count(), "description generated");
    Ok(text)
}
