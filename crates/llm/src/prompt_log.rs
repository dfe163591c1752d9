//! Prompt Audit Log
//!
//! Append-only JSON Lines record of every prompt sent to a provider, one file
//! per day: `prompts_YYYYMMDD.jsonl`. Records are written before dispatch.
//! A failed write is reported and otherwise ignored.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Serializes appends across every log instance in the process.
static APPEND_LOCK: Mutex<()> = Mutex::new(());

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptRecord {
    /// RFC 3339 local time
    pub timestamp: String,
    pub model: String,
    pub purpose: String,
    pub prompt: String,
}

/// Daily JSON Lines prompt log rooted at a directory.
#[derive(Debug, Clone)]
pub struct PromptLog {
    dir: PathBuf,
}

impl PromptLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log file for a given instant.
    pub fn file_for(&self, at: DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("prompts_{}.jsonl", at.format("%Y%m%d")))
    }

    /// Append a record. Never fails outward.
    pub fn record(&self, model: &str, purpose: &str, prompt: &str) {
        let now = Local::now();
        let record = PromptRecord {
            timestamp: now.to_rfc3339(),
            model: model.to_string(),
            purpose: purpose.to_string(),
            prompt: prompt.to_string(),
        };

        if let Err(e) = self.append(&self.file_for(now), &record) {
            warn!(dir = %self.dir.display(), error = %e, "failed to write prompt log");
        }
    }

    /// [`Self::record`] on the blocking pool. The record is on disk when
    /// this returns.
    pub async fn record_async(&self, model: &str, purpose: &str, prompt: &str) {
        let log = self.clone();
        let (model, purpose, prompt) = (model.to_string(), purpose.to_string(), prompt.to_string());
        if let Err(e) = tokio::task::spawn_blocking(move || log.record(&model, &purpose, &prompt)).await {
            warn!(error = %e, "prompt log task failed");
        }
    }

    fn append(&self, path: &Path, record: &PromptRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // A poisoned lock only means another append panicked; the file is still usable.
        let _guard = APPEND_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())
    }

    /// Read back all records of a day's file.
    pub fn read_day(&self, at: DateTime<Local>) -> std::io::Result<Vec<PromptRecord>> {
        let content = std::fs::read_to_string(self.file_for(at))?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(std::io::Error::from))
            .collect()
    }
}
