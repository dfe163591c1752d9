//! Taxonomy Models
//!
//! Read-only reference table of the seven classification categories. Each
//! option carries a description and example data variables; the sectoral
//! category groups its variables one level deep.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use survey_designer_core::{ClassificationVector, CoreError, TaxonomyCategory, MAX_COLUMNS};

use crate::utils::error::AppResult;

const BUILTIN_TAXONOMY: &str = include_str!("../../resources/taxonomy.json");

/// Examples taken per option for level, methodology and purpose.
const EXAMPLES_PER_FACET: usize = 3;
/// Examples taken per group of a grouped sector.
const EXAMPLES_PER_SECTOR_GROUP: usize = 2;
/// Examples taken from a flat sector list.
const EXAMPLES_FLAT_SECTOR: usize = 5;

/// Example variables of an option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DataVariables {
    Flat(Vec<String>),
    /// Named groups, in file order.
    Grouped(IndexMap<String, Vec<String>>),
}

impl Default for DataVariables {
    fn default() -> Self {
        DataVariables::Flat(Vec::new())
    }
}

impl DataVariables {
    /// Every variable, groups flattened in order.
    pub fn all(&self) -> Vec<&str> {
        match self {
            DataVariables::Flat(vars) => vars.iter().map(String::as_str).collect(),
            DataVariables::Grouped(groups) => groups
                .values()
                .flat_map(|vars| vars.iter().map(String::as_str))
                .collect(),
        }
    }
}

/// One option of a category. `name` is the option's key in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaxonomyOption {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub data_variables: DataVariables,
}

/// The full taxonomy, options kept in file order.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: HashMap<TaxonomyCategory, Vec<TaxonomyOption>>,
}

impl Taxonomy {
    /// The taxonomy shipped with the binary.
    pub fn builtin() -> AppResult<Self> {
        Self::from_json(BUILTIN_TAXONOMY)
    }

    /// Load a taxonomy file.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load `path` when given, otherwise the built-in taxonomy.
    pub fn load_or_builtin(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn from_json(content: &str) -> AppResult<Self> {
        let mut root: HashMap<String, Value> = serde_json::from_str(content)?;
        let mut categories = HashMap::new();

        for category in TaxonomyCategory::ALL {
            let raw = root.remove(category.key()).ok_or_else(|| {
                CoreError::parse(format!("taxonomy is missing category '{}'", category))
            })?;
            let options: IndexMap<String, TaxonomyOption> = serde_json::from_value(raw)
                .map_err(|e| CoreError::parse(format!("taxonomy category '{}': {}", category, e)))?;

            if options.is_empty() {
                return Err(CoreError::parse(format!("taxonomy category '{}' has no options", category)).into());
            }
            let parsed = options
                .into_iter()
                .map(|(name, option)| TaxonomyOption { name, ..option })
                .collect();
            categories.insert(category, parsed);
        }

        Ok(Self { categories })
    }

    pub fn options(&self, category: TaxonomyCategory) -> &[TaxonomyOption] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn option(&self, category: TaxonomyCategory, name: &str) -> Option<&TaxonomyOption> {
        self.options(category).iter().find(|o| o.name == name)
    }

    pub fn option_names(&self, category: TaxonomyCategory) -> Vec<&str> {
        self.options(category).iter().map(|o| o.name.as_str()).collect()
    }

    pub fn contains(&self, category: TaxonomyCategory, name: &str) -> bool {
        self.option(category, name).is_some()
    }

    pub fn description_of(&self, category: TaxonomyCategory, name: &str) -> Option<&str> {
        self.option(category, name).map(|o| o.description.as_str())
    }

    /// Categories whose value is not one of the category's options.
    pub fn off_taxonomy(&self, vector: &ClassificationVector) -> Vec<TaxonomyCategory> {
        vector
            .iter()
            .filter(|(category, value)| !self.contains(*category, value))
            .map(|(category, _)| category)
            .collect()
    }

    /// Example variable names for the heading prompt: level, methodology,
    /// sector, then purpose, capped at 15. Unknown values contribute nothing.
    pub fn variable_examples(&self, vector: &ClassificationVector) -> Vec<String> {
        let mut examples: Vec<String> = Vec::new();

        let take = |category: TaxonomyCategory, n: usize, examples: &mut Vec<String>| {
            if let Some(option) = self.option(category, vector.get(category)) {
                examples.extend(option.data_variables.all().into_iter().take(n).map(String::from));
            }
        };

        take(TaxonomyCategory::LevelBased, EXAMPLES_PER_FACET, &mut examples);
        take(TaxonomyCategory::MethodologyBased, EXAMPLES_PER_FACET, &mut examples);

        if let Some(sector) = self.option(TaxonomyCategory::Sectoral, &vector.sectoral) {
            match &sector.data_variables {
                DataVariables::Grouped(groups) => {
                    for vars in groups.values() {
                        examples.extend(vars.iter().take(EXAMPLES_PER_SECTOR_GROUP).cloned());
                    }
                }
                DataVariables::Flat(vars) => {
                    examples.extend(vars.iter().take(EXAMPLES_FLAT_SECTOR).cloned());
                }
            }
        }

        take(TaxonomyCategory::PurposeBased, EXAMPLES_PER_FACET, &mut examples);

        examples.truncate(MAX_COLUMNS);
        examples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn housing_vector() -> ClassificationVector {
        ClassificationVector {
            level_based: "Urban Local Body".to_string(),
            methodology_based: "Sample".to_string(),
            purpose_based: "Monitoring & Evaluation".to_string(),
            sectoral: "Housing".to_string(),
            geographical: "Topographical".to_string(),
            frequency_based: "Ad hoc".to_string(),
            data_collection_method: "Quantitative".to_string(),
        }
    }

    #[test]
    fn test_builtin_has_all_categories() {
        let taxonomy = Taxonomy::builtin().unwrap();
        for category in TaxonomyCategory::ALL {
            assert!(!taxonomy.options(category).is_empty(), "{} empty", category);
        }
        assert_eq!(
            taxonomy.option_names(TaxonomyCategory::DataCollectionMethod),
            vec!["Quantitative", "Qualitative", "Mixed Methods"]
        );
        assert!(taxonomy.contains(TaxonomyCategory::Sectoral, "Housing"));
    }

    #[test]
    fn test_missing_category_fails() {
        let err = Taxonomy::from_json(r#"{"level_based": {"Central": {"description": "", "data_variables": []}}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("methodology_based"));
    }

    #[test]
    fn test_variable_examples_grouped_sector() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let examples = taxonomy.variable_examples(&housing_vector());

        // 3 level + 3 methodology + 2 per housing group (3 groups) + 3 purpose = 15
        assert_eq!(examples.len(), 15);
        assert_eq!(examples[0], "Ward Number");
        assert_eq!(examples[3], "Sample Household ID");
        assert_eq!(&examples[6..8], &["Dwelling Type".to_string(), "Number of Rooms".to_string()]);
        assert_eq!(examples[12], "Scheme Enrolled (Yes/No)");
    }

    #[test]
    fn test_variable_examples_flat_sector_and_unknown_values() {
        let json = BUILTIN_TAXONOMY.replace(
            r#""Housing": {
      "description": "Covers dwelling condition, tenure, amenities and satisfaction with housing.",
      "data_variables": {"#,
            r#""Housing": {
      "description": "flat",
      "data_variables": ["A", "B", "C", "D", "E", "F"], "unused": {"#,
        );
        let taxonomy = Taxonomy::from_json(&json).unwrap();
        let vector = ClassificationVector {
            level_based: "Galactic".to_string(),
            methodology_based: "Guesswork".to_string(),
            purpose_based: "Curiosity".to_string(),
            ..housing_vector()
        };
        assert_eq!(taxonomy.variable_examples(&vector), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_non_string_variable_fails() {
        let json = BUILTIN_TAXONOMY.replacen(r#""Ward Number""#, "42", 1);
        let err = Taxonomy::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("level_based"));
    }

    #[test]
    fn test_option_names_keep_file_order() {
        let taxonomy = Taxonomy::builtin().unwrap();
        let housing = taxonomy.option(TaxonomyCategory::Sectoral, "Housing").unwrap();
        assert_eq!(housing.name, "Housing");
        match &housing.data_variables {
            DataVariables::Grouped(groups) => assert_eq!(groups.len(), 3),
            other => panic!("expected grouped variables, got {:?}", other),
        }
    }

    #[test]
    fn test_off_taxonomy() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(taxonomy.off_taxonomy(&housing_vector()).is_empty());

        let vector = ClassificationVector {
            sectoral: "Tourism".to_string(),
            ..housing_vector()
        };
        assert_eq!(taxonomy.off_taxonomy(&vector), vec![TaxonomyCategory::Sectoral]);
    }

    #[test]
    fn test_description_of() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert!(taxonomy
            .description_of(TaxonomyCategory::MethodologyBased, "Census")
            .unwrap()
            .contains("Complete enumeration"));
        assert!(taxonomy.description_of(TaxonomyCategory::MethodologyBased, "Poll").is_none());
    }
}
