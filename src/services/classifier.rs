//! Query Classifier
//!
//! Maps a free-text survey requirement onto the seven taxonomy categories
//! with one LLM call. The result is all-or-nothing: a vector is returned only
//! when every category is present as a string.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use survey_designer_core::{extract_json_object, ClassificationVector, ExtractionError, TaxonomyCategory};
use survey_designer_llm::{describe_error, LlmError, LlmGateway};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::taxonomy::Taxonomy;

pub const PURPOSE: &str = "classification";

/// Classification failure. Always fatal for a pipeline run.
#[derive(Error, Debug, Clone)]
pub enum ClassificationError {
    #[error("{}", describe_error(.0))]
    Llm(#[from] LlmError),

    #[error("could not extract classification JSON: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("response has no 'classifications' object")]
    MissingClassifications,

    #[error("classification for '{0}' is missing or not a string")]
    MissingCategory(TaxonomyCategory),
}

/// A classification vector plus the categories whose value is outside the
/// taxonomy. Off-taxonomy values are kept and reported, not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub vector: ClassificationVector,
    pub off_taxonomy: Vec<TaxonomyCategory>,
}

/// Build the classification prompt from the taxonomy's option lists.
pub fn build_classification_prompt(taxonomy: &Taxonomy, query: &str) -> String {
    let categories: String = TaxonomyCategory::ALL
        .iter()
        .map(|c| format!("- {}: {}\n", c, taxonomy.option_names(*c).join(", ")))
        .collect();
    let template: String = TaxonomyCategory::ALL
        .iter()
        .map(|c| format!("    \"{}\": \"Selected_Option\"", c))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"Classify this survey query: "{query}"

You MUST choose exactly one option from each category based on the query content. Pay attention to:
- Mentioned administrative levels
- Sector-specific keywords
- Explicit purposes

Categories and Options:
{categories}
Output JSON format:
{{
  "query": "{query}",
  "classifications": {{
{template}
  }}
}}

RULES:
1. Only select options that are explicitly listed in the categories
2. Output MUST be valid JSON with no additional text
"#
    )
}

/// Read the seven categories out of the `classifications` object.
pub fn parse_classification(map: &Map<String, Value>) -> Result<ClassificationVector, ClassificationError> {
    let classes = map
        .get("classifications")
        .and_then(Value::as_object)
        .ok_or(ClassificationError::MissingClassifications)?;

    let field = |category: TaxonomyCategory| -> Result<String, ClassificationError> {
        classes
            .get(category.key())
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ClassificationError::MissingCategory(category))
    };

    Ok(ClassificationVector {
        level_based: field(TaxonomyCategory::LevelBased)?,
        methodology_based: field(TaxonomyCategory::MethodologyBased)?,
        purpose_based: field(TaxonomyCategory::PurposeBased)?,
        sectoral: field(TaxonomyCategory::Sectoral)?,
        geographical: field(TaxonomyCategory::Geographical)?,
        frequency_based: field(TaxonomyCategory::FrequencyBased)?,
        data_collection_method: field(TaxonomyCategory::DataCollectionMethod)?,
    })
}

/// Classify a survey requirement. No retry at this layer.
pub async fn classify(
    gateway: &LlmGateway,
    taxonomy: &Taxonomy,
    query: &str,
) -> Result<Classification, ClassificationError> {
    let prompt = build_classification_prompt(taxonomy, query);
    let response = gateway.generate(&prompt, PURPOSE).await?;
    debug!(chars = response.len(), "classification response received");

    let map = extract_json_object(&response)?;
    let vector = parse_classification(&map)?;

    let off_taxonomy = taxonomy.off_taxonomy(&vector);
    for category in &off_taxonomy {
        warn!(
            category = %category,
            value = vector.get(*category),
            "classification value is not in the taxonomy; examples for it will be skipped"
        );
    }
    info!(sectoral = %vector.sectoral, level = %vector.level_based, "query classified");

    Ok(Classification {
        vector,
        off_taxonomy,
    })
}
