//! Survey Data Model
//!
//! Types that flow through the design pipeline: the classification vector,
//! the column schema, question specs and the conversational script.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Hard cap on the number of columns in a schema.
pub const MAX_COLUMNS: usize = 15;

/// Description used by the fallback question.
pub const FALLBACK_QUESTION_DESCRIPTION: &str = "Please provide your input for this question.";

/// Explanation used by the fallback script step when the question has none.
pub const FALLBACK_EXPLAIN: &str = "No further details.";

// ============================================================================
// Classification
// ============================================================================

/// The seven fixed taxonomy categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyCategory {
    LevelBased,
    MethodologyBased,
    PurposeBased,
    Sectoral,
    Geographical,
    FrequencyBased,
    DataCollectionMethod,
}

impl TaxonomyCategory {
    /// All categories, in prompt order.
    pub const ALL: [TaxonomyCategory; 7] = [
        TaxonomyCategory::LevelBased,
        TaxonomyCategory::MethodologyBased,
        TaxonomyCategory::PurposeBased,
        TaxonomyCategory::Sectoral,
        TaxonomyCategory::Geographical,
        TaxonomyCategory::FrequencyBased,
        TaxonomyCategory::DataCollectionMethod,
    ];

    /// Key used in taxonomy files and model payloads.
    pub fn key(&self) -> &'static str {
        match self {
            TaxonomyCategory::LevelBased => "level_based",
            TaxonomyCategory::MethodologyBased => "methodology_based",
            TaxonomyCategory::PurposeBased => "purpose_based",
            TaxonomyCategory::Sectoral => "sectoral",
            TaxonomyCategory::Geographical => "geographical",
            TaxonomyCategory::FrequencyBased => "frequency_based",
            TaxonomyCategory::DataCollectionMethod => "data_collection_method",
        }
    }
}

impl fmt::Display for TaxonomyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TaxonomyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| format!("unknown taxonomy category: {}", s))
    }
}

/// One option per taxonomy category. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationVector {
    pub level_based: String,
    pub methodology_based: String,
    pub purpose_based: String,
    pub sectoral: String,
    pub geographical: String,
    pub frequency_based: String,
    pub data_collection_method: String,
}

impl ClassificationVector {
    pub fn get(&self, category: TaxonomyCategory) -> &str {
        match category {
            TaxonomyCategory::LevelBased => &self.level_based,
            TaxonomyCategory::MethodologyBased => &self.methodology_based,
            TaxonomyCategory::PurposeBased => &self.purpose_based,
            TaxonomyCategory::Sectoral => &self.sectoral,
            TaxonomyCategory::Geographical => &self.geographical,
            TaxonomyCategory::FrequencyBased => &self.frequency_based,
            TaxonomyCategory::DataCollectionMethod => &self.data_collection_method,
        }
    }

    /// `(category, value)` pairs in category order.
    pub fn iter(&self) -> impl Iterator<Item = (TaxonomyCategory, &str)> {
        TaxonomyCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

// ============================================================================
// Schema and questions
// ============================================================================

/// Ordered column names. Order drives question and script order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSchema(Vec<String>);

impl ColumnSchema {
    /// Build a schema, keeping at most [`MAX_COLUMNS`] entries.
    pub fn new(columns: Vec<String>) -> Self {
        let mut columns = columns;
        columns.truncate(MAX_COLUMNS);
        Self(columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

/// Answer type of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "yes/no")]
    YesNo,
    #[serde(rename = "rating_1_10")]
    Rating1To10,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::YesNo => "yes/no",
            QuestionType::Rating1To10 => "rating_1_10",
        }
    }

    /// Lenient parse of a model-supplied type name.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(QuestionType::Text),
            "yes/no" | "yes_no" => Some(QuestionType::YesNo),
            "rating_1_10" | "rating" => Some(QuestionType::Rating1To10),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub question: String,
    pub description: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
}

impl QuestionSpec {
    /// Deterministic default for a column.
    pub fn fallback(column: &str) -> Self {
        Self {
            question: humanize(column),
            description: FALLBACK_QUESTION_DESCRIPTION.to_string(),
            question_type: QuestionType::Text,
        }
    }
}

/// Ordered question specs, one per schema column.
pub type SurveyDefinition = Vec<QuestionSpec>;

/// Conversational phrasing of one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub say: String,
    pub explain: String,
    pub question_key: String,
}

impl ScriptStep {
    /// Deterministic default for a question.
    pub fn fallback(spec: &QuestionSpec) -> Self {
        let explain = if spec.description.trim().is_empty() {
            FALLBACK_EXPLAIN.to_string()
        } else {
            spec.description.clone()
        };
        Self {
            say: spec.question.clone(),
            explain,
            question_key: spec.question.clone(),
        }
    }
}

/// Ordered script steps, one per question.
pub type ConversationalScript = Vec<ScriptStep>;

/// Check that step `i` keys question `i` and that every key names exactly
/// one question of the definition.
pub fn script_matches_definition(script: &[ScriptStep], definition: &[QuestionSpec]) -> bool {
    script.len() == definition.len()
        && script.iter().zip(definition).all(|(step, spec)| {
            step.question_key == spec.question
                && definition
                    .iter()
                    .filter(|q| q.question == step.question_key)
                    .count()
                    == 1
        })
}

/// First question text that appears more than once.
pub fn first_duplicate_question(definition: &[QuestionSpec]) -> Option<&str> {
    let mut seen = HashSet::new();
    definition
        .iter()
        .map(|q| q.question.as_str())
        .find(|q| !seen.insert(*q))
}

/// Make question texts unique so each can serve as a script key.
///
/// A repeated text gets its column name appended, or a counter when the
/// column adds nothing. Returns the indices that were renamed.
pub fn dedupe_questions(definition: &mut [QuestionSpec], columns: &[String]) -> Vec<usize> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut renamed = Vec::new();

    for (index, spec) in definition.iter_mut().enumerate() {
        if seen.insert(spec.question.clone()) {
            continue;
        }
        let column = columns
            .get(index)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case(spec.question.trim()));
        let mut candidate = match column {
            Some(c) => format!("{} ({})", spec.question, c),
            None => spec.question.clone(),
        };
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{} ({})", spec.question, n);
            n += 1;
        }
        seen.insert(candidate.clone());
        spec.question = candidate;
        renamed.push(index);
    }
    renamed
}

// ============================================================================
// Humanize
// ============================================================================

/// Turn a column name into a readable title:
/// `household_income_range` becomes `Household Income Range`.
pub fn humanize(column: &str) -> String {
    let words: Vec<String> = column
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_word)
        .collect();

    if words.is_empty() {
        "Untitled Question".to_string()
    } else {
        words.join(" ")
    }
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
