//! Survey Designer LLM
//!
//! Provides a uniform text-generation interface over two backends:
//! - Gemini (cloud, `generateContent`)
//! - Ollama (local inference, `/api/generate`)
//!
//! Also includes the HTTP client factory, the prompt audit log and the
//! mode-switching gateway that the pipeline calls.

pub mod gateway;
pub mod gemini;
pub mod http_client;
pub mod ollama;
pub mod prompt_log;
pub mod provider;
pub mod types;

#[cfg(test)]
mod test_server;

// Re-export main types
pub use gateway::{describe_error, LlmGateway, ModeSwitch, ProviderHealth};
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use ollama::OllamaProvider;
pub use prompt_log::{PromptLog, PromptRecord};
pub use provider::LlmProvider;
pub use types::*;
