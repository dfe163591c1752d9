//! Survey Artifact Store
//!
//! Writes and reads the files of one survey under the output directory,
//! all named by the survey id:
//!
//! - `<id>.txt` - description
//! - `<id>.csv` - header row plus blank template rows
//! - `<id>.design.json` - design metadata
//! - `<id>.questions.json` - survey definition
//! - `<id>.script.json` - conversational script
//! - `error_<id>.json` - failed run with its partial state
//!
//! Every write goes to a temp file in the same directory and is then
//! renamed over the target.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use survey_designer_core::{
    ClassificationVector, ColumnSchema, ConversationalScript, SurveyDefinition, TaxonomyCategory,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::services::pipeline::{PipelineArtifacts, PipelineFailure, PipelineStage, SurveyDesign};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::ensure_dir;

/// Longest query token kept in a survey id.
pub const MAX_ID_TOKEN_CHARS: usize = 50;

/// File kinds of one survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Description,
    Template,
    Design,
    Questions,
    Script,
    Error,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Description,
        ArtifactKind::Template,
        ArtifactKind::Design,
        ArtifactKind::Questions,
        ArtifactKind::Script,
        ArtifactKind::Error,
    ];

    pub fn file_name(&self, id: &str) -> String {
        match self {
            ArtifactKind::Description => format!("{id}.txt"),
            ArtifactKind::Template => format!("{id}.csv"),
            ArtifactKind::Design => format!("{id}.design.json"),
            ArtifactKind::Questions => format!("{id}.questions.json"),
            ArtifactKind::Script => format!("{id}.script.json"),
            ArtifactKind::Error => format!("error_{id}.json"),
        }
    }
}

/// Contents of `<id>.design.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    pub timestamp: String,
    pub query: String,
    pub classifications: ClassificationVector,
    pub off_taxonomy: Vec<TaxonomyCategory>,
    pub description: String,
    pub headings: ColumnSchema,
    pub model_used: String,
    pub files: Vec<String>,
}

/// Contents of `error_<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: String,
    pub survey_id: String,
    pub stage: PipelineStage,
    pub error: String,
    pub partial: PipelineArtifacts,
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    blank_rows: usize,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, blank_rows: usize) -> Self {
        Self {
            dir: dir.into(),
            blank_rows,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<token>_<YYYYMMDD_HHMMSS_mmm>` from the first word of the query.
    pub fn survey_id(query: &str, started_at: DateTime<Local>) -> String {
        let token: String = query
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .chars()
            .take(MAX_ID_TOKEN_CHARS)
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let token = if token.is_empty() { "survey".to_string() } else { token };
        format!("{}_{}", token, started_at.format("%Y%m%d_%H%M%S_%3f"))
    }

    /// [`Self::survey_id`] for a new survey. When files already exist under
    /// that id, `_2`, `_3`, ... is appended until one is free.
    pub fn allocate_id(&self, query: &str, started_at: DateTime<Local>) -> String {
        let base = Self::survey_id(query, started_at);
        let mut id = base.clone();
        let mut n = 2;
        while self.is_taken(&id) {
            id = format!("{base}_{n}");
            n += 1;
        }
        if id != base {
            debug!(survey_id = %id, "survey id already in use, suffixed");
        }
        id
    }

    fn is_taken(&self, id: &str) -> bool {
        ArtifactKind::ALL
            .iter()
            .any(|kind| self.path_for(id, *kind).exists())
    }

    pub fn path_for(&self, id: &str, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name(id))
    }

    // ── Writers ─────────────────────────────────────────────────────────

    /// Write description, CSV template and design metadata.
    pub fn save_design(&self, id: &str, design: &SurveyDesign) -> AppResult<Vec<PathBuf>> {
        let txt = self.path_for(id, ArtifactKind::Description);
        let csv = self.path_for(id, ArtifactKind::Template);
        let meta = self.path_for(id, ArtifactKind::Design);

        self.write_atomic(&txt, design.description.as_bytes())?;
        self.write_atomic(&csv, csv_template(&design.schema, self.blank_rows).as_bytes())?;

        let record = DesignRecord {
            timestamp: design.started_at.to_rfc3339(),
            query: design.query.clone(),
            classifications: design.classification.vector.clone(),
            off_taxonomy: design.classification.off_taxonomy.clone(),
            description: design.description.clone(),
            headings: design.schema.clone(),
            model_used: design.model_used.clone(),
            files: [&txt, &csv, &meta].iter().filter_map(|p| file_name(p)).collect(),
        };
        self.write_json(&meta, &record)?;

        info!(survey_id = id, dir = %self.dir.display(), "design saved");
        Ok(vec![txt, csv, meta])
    }

    pub fn save_questions(&self, id: &str, definition: &SurveyDefinition) -> AppResult<PathBuf> {
        let path = self.path_for(id, ArtifactKind::Questions);
        self.write_json(&path, definition)?;
        info!(survey_id = id, questions = definition.len(), "questions saved");
        Ok(path)
    }

    pub fn save_script(&self, id: &str, script: &ConversationalScript) -> AppResult<PathBuf> {
        let path = self.path_for(id, ArtifactKind::Script);
        self.write_json(&path, script)?;
        info!(survey_id = id, steps = script.len(), "script saved");
        Ok(path)
    }

    /// Write whatever a completed run produced.
    pub fn save_run(&self, id: &str, artifacts: &PipelineArtifacts) -> AppResult<Vec<PathBuf>> {
        let mut written = Vec::new();

        if let (Some(classification), Some(description), Some(schema)) = (
            &artifacts.classification,
            &artifacts.description,
            &artifacts.schema,
        ) {
            let design = SurveyDesign {
                query: artifacts.query.clone(),
                started_at: artifacts.started_at,
                classification: classification.clone(),
                description: description.clone(),
                schema: schema.clone(),
                model_used: artifacts.model_used.clone(),
            };
            written.extend(self.save_design(id, &design)?);
        }
        if let Some(questions) = &artifacts.questions {
            written.push(self.save_questions(id, &questions.definition)?);
        }
        if let Some(script) = &artifacts.script {
            written.push(self.save_script(id, &script.script)?);
        }
        Ok(written)
    }

    pub fn save_error(&self, id: &str, failure: &PipelineFailure) -> AppResult<PathBuf> {
        let path = self.path_for(id, ArtifactKind::Error);
        let record = ErrorRecord {
            timestamp: Local::now().to_rfc3339(),
            survey_id: id.to_string(),
            stage: failure.stage,
            error: failure.message.clone(),
            partial: failure.partial.clone(),
        };
        self.write_json(&path, &record)?;
        info!(survey_id = id, stage = %failure.stage, "error artifact saved");
        Ok(path)
    }

    // ── Readers ─────────────────────────────────────────────────────────

    /// Header row of the (possibly hand-edited) CSV template.
    pub fn load_schema(&self, id: &str) -> AppResult<ColumnSchema> {
        let content = self.read(id, ArtifactKind::Template)?;
        let columns: Vec<String> = parse_csv_header(&content)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if columns.is_empty() {
            return Err(AppError::validation(format!("CSV header for survey '{id}' has no columns")));
        }
        debug!(survey_id = id, columns = columns.len(), "schema loaded from CSV header");
        Ok(ColumnSchema::new(columns))
    }

    pub fn load_description(&self, id: &str) -> AppResult<String> {
        Ok(self.read(id, ArtifactKind::Description)?.trim().to_string())
    }

    pub fn load_design(&self, id: &str) -> AppResult<DesignRecord> {
        self.read_json(id, ArtifactKind::Design)
    }

    pub fn load_questions(&self, id: &str) -> AppResult<SurveyDefinition> {
        self.read_json(id, ArtifactKind::Questions)
    }

    pub fn load_script(&self, id: &str) -> AppResult<ConversationalScript> {
        self.read_json(id, ArtifactKind::Script)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> AppResult<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_atomic(path, content.as_bytes())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> AppResult<()> {
        ensure_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }

    fn read(&self, id: &str, kind: ArtifactKind) -> AppResult<String> {
        validate_id(id)?;
        let path = self.path_for(id, kind);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::not_found(format!("{} does not exist", path.display())),
            _ => AppError::Io(e),
        })
    }

    fn read_json<T: DeserializeOwned>(&self, id: &str, kind: ArtifactKind) -> AppResult<T> {
        let content = self.read(id, kind)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Ids are generated from `[A-Za-z0-9_]`; anything else is not ours.
fn validate_id(id: &str) -> AppResult<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::validation(format!("invalid survey id '{id}'")));
    }
    Ok(())
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

// ── CSV ─────────────────────────────────────────────────────────────────

fn csv_field(field: &str) -> String {
    if field.contains(&[',', '"', '\r', '\n'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Header row followed by `blank_rows` empty records.
pub fn csv_template(schema: &ColumnSchema, blank_rows: usize) -> String {
    let header: Vec<String> = schema.iter().map(|c| csv_field(c)).collect();
    let blank = ",".repeat(schema.len().saturating_sub(1));

    let mut out = header.join(",");
    out.push_str("\r\n");
    for _ in 0..blank_rows {
        out.push_str(&blank);
        out.push_str("\r\n");
    }
    out
}

/// Fields of the first record, honouring quoted fields.
pub fn parse_csv_header(content: &str) -> Vec<String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' | '\n' if !in_quotes => break,
            other => field.push(other),
        }
    }
    fields.push(field);
    fields
}
