//! Survey Designer Core
//!
//! Foundational types for the Survey Designer workspace: error types, the
//! survey data model, structured JSON extraction from model output, and proxy
//! settings. This crate has no dependency on the LLM providers or on the
//! application crate.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `survey` - Classification vector, column schema, question specs, script steps
//! - `extraction` - JSON extraction from fenced or prose-wrapped responses
//! - `proxy` - Proxy configuration shared by the HTTP clients

pub mod error;
pub mod extraction;
pub mod proxy;
pub mod survey;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Extraction ─────────────────────────────────────────────────────────
pub use extraction::{extract_json, extract_json_array, extract_json_object, ExtractionError};

// ── Survey Model ───────────────────────────────────────────────────────
pub use survey::{
    humanize, ClassificationVector, ColumnSchema, ConversationalScript, QuestionSpec,
    QuestionType, ScriptStep, SurveyDefinition, TaxonomyCategory, MAX_COLUMNS,
};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
