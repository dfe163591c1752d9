//! Scripted provider that answers each pipeline prompt by its opening line.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use survey_designer_llm::{LlmError, LlmGateway, LlmProvider, LlmResult, ProviderMode};

pub const HOUSING_CLASSIFICATION: &str = r#"```json
{
  "query": "Design a resident satisfaction survey for a housing complex.",
  "classifications": {
    "level_based": "Urban Local Body",
    "methodology_based": "Sample",
    "purpose_based": "Monitoring & Evaluation",
    "sectoral": "Housing",
    "geographical": "Topographical",
    "frequency_based": "Ad hoc",
    "data_collection_method": "Mixed Methods"
  }
}
```"#;

pub const HOUSING_HEADINGS: &str = r#"Here you go:
["Ward Number", "Locality", "Household ID", "Head of Household", "Dwelling Type",
 "Monthly Rent (INR)", "Maintenance Satisfaction", "Water Supply Rating", "Survey Date"]"#;

pub struct ScriptedProvider {
    headings: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(headings: &str) -> Self {
        Self {
            headings: headings.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn housing() -> Self {
        Self::new(HOUSING_HEADINGS)
    }

    fn respond(&self, prompt: &str) -> LlmResult<String> {
        if prompt.starts_with("Classify this survey query") {
            Ok(HOUSING_CLASSIFICATION.to_string())
        } else if prompt.starts_with("Generate a professional survey description") {
            Ok("Survey Design: Design a resident satisfaction survey for a housing complex. \
                This sample survey at the urban local body level monitors resident satisfaction."
                .to_string())
        } else if prompt.starts_with("Generate Excel column headings") {
            Ok(self.headings.clone())
        } else if prompt.starts_with("Given a survey about") {
            let column = between(prompt, "data field '", "'");
            Ok(format!(
                r#"{{"question": "Please tell us your {column}.", "description": "About {column}", "type": "text"}}"#
            ))
        } else if prompt.starts_with("You are a friendly survey assistant") {
            let question = between(prompt, "Question: \"", "\"");
            Ok(format!(
                r#"{{"say": "So, {question}", "explain": "We ask this to plan services.", "question_key": "{question}"}}"#
            ))
        } else {
            Err(LlmError::InvalidRequest {
                message: "unexpected prompt".to_string(),
            })
        }
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    text.split(start)
        .nth(1)
        .and_then(|rest| rest.split(end).next())
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.respond(prompt)
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// Gateway in cloud mode over `cloud`, with `local` on the other side.
pub fn gateway(cloud: Arc<ScriptedProvider>, local: Arc<dyn LlmProvider>) -> LlmGateway {
    LlmGateway::with_providers(cloud, local, ProviderMode::Cloud)
}
