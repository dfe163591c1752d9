//! Heading Generator
//!
//! Produces the ordered column schema from the query and classification.
//! Never fails outward: any provider or extraction failure yields an empty
//! schema, which the orchestrator treats as a failed run.

use std::collections::HashSet;

use serde_json::Value;
use survey_designer_core::{extract_json_array, ClassificationVector, ColumnSchema, TaxonomyCategory, MAX_COLUMNS};
use survey_designer_llm::{describe_error, LlmGateway};
use tracing::{info, warn};

use crate::models::taxonomy::Taxonomy;

pub const PURPOSE: &str = "headings";

pub fn build_headings_prompt(taxonomy: &Taxonomy, query: &str, vector: &ClassificationVector) -> String {
    let examples = taxonomy.variable_examples(vector);
    let purpose_desc = taxonomy
        .description_of(TaxonomyCategory::PurposeBased, &vector.purpose_based)
        .unwrap_or_default();
    let method_desc = taxonomy
        .description_of(TaxonomyCategory::MethodologyBased, &vector.methodology_based)
        .unwrap_or_default();
    let classifications = serde_json::to_string_pretty(vector).unwrap_or_default();

    format!(
        r#"Generate Excel column headings for: "{query}"

Classification Context:
{classifications}

Survey Purpose: {purpose_desc}
Methodology: {method_desc}

RELEVANT VARIABLE EXAMPLES:
{examples}

REQUIREMENTS:
1. Output MUST be a flat JSON array of strings
2. Maximum {MAX_COLUMNS} columns total
3. Structure:
   - Location Identifiers (2-4 columns)
   - Household Identifiers (2-4 columns)
   - Core Subject Columns (5-8 columns)
   - Metadata (1-2 columns)

GUIDELINES:
- Include demographic columns (Age, Gender) when relevant
- Add scheme-specific columns for government programs
- Use India-specific terms: Aadhaar, Ward, Panchayat
- Prefer measurable quantitative fields
- Omit location levels higher than the survey scope
- Include variables that support the survey purpose

Your output: ONLY a JSON array of strings.
"#,
        examples = examples.join(", ")
    )
}

/// Keep non-empty, distinct string entries in order, capped at 15.
pub fn parse_headings(items: Vec<Value>) -> ColumnSchema {
    let mut seen = HashSet::new();
    let columns: Vec<String> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .take(MAX_COLUMNS)
        .collect();
    ColumnSchema::new(columns)
}

/// Generate the column schema. Failures produce an empty schema.
pub async fn generate_headings(
    gateway: &LlmGateway,
    taxonomy: &Taxonomy,
    query: &str,
    vector: &ClassificationVector,
) -> ColumnSchema {
    let prompt = build_headings_prompt(taxonomy, query, vector);

    let response = match gateway.generate(&prompt, PURPOSE).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %describe_error(&e), "heading generation failed");
            return ColumnSchema::default();
        }
    };

    match extract_json_array(&response) {
        Ok(items) => {
            let returned = items.len();
            let schema = parse_headings(items);
            if returned > schema.len() {
                info!(returned, kept = schema.len(), "heading list trimmed");
            }
            schema
        }
        Err(e) => {
            warn!(error = %e, "no heading array in response");
            ColumnSchema::default()
        }
    }
}
