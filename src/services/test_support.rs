//! Scripted LLM provider for service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use survey_designer_llm::{LlmError, LlmGateway, LlmProvider, LlmResult, ProviderMode};

type Responder = Box<dyn Fn(&str) -> LlmResult<String> + Send + Sync>;

/// Provider that replies from a queue or a prompt-matching function and
/// records every prompt it receives.
pub struct MockLlmProvider {
    /// Responses to return in sequence; each call pops the first response.
    responses: Mutex<Vec<LlmResult<String>>>,
    responder: Option<Responder>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<LlmResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            responder: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_text_response(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// Answer every prompt with `f(prompt)`.
    pub fn from_fn(f: impl Fn(&str) -> LlmResult<String> + Send + Sync + 'static) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            responder: Some(Box::new(f)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self::from_fn(|_| {
            Err(LlmError::ProviderUnavailable {
                message: "Cannot connect to Ollama. Please ensure Ollama is running with 'ollama serve' and the model 'gemma2' is installed.".to_string(),
            })
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(f) = &self.responder {
            return f(prompt);
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(LlmError::Other {
                message: "No more mock responses".to_string(),
            })
        } else {
            responses.remove(0)
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }
}

/// Gateway whose cloud side is `provider` (local side unreachable).
pub fn gateway_with(provider: Arc<MockLlmProvider>) -> LlmGateway {
    LlmGateway::with_providers(provider, Arc::new(MockLlmProvider::unavailable()), ProviderMode::Cloud)
}
