//! Bounded, most-recent-first history of finished jobs, mirrored to a JSON file.
//!
//! The in-memory list is authoritative for the running process. Disk writes
//! are best-effort: failures are logged and never surface to callers.

mod persist;


use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::job::{JobId, JobStatus};

pub use persist::{HistoryWriter, PendingWrite};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Snapshot of a job at its terminal transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub download_id: JobId,
    pub url: String,
    pub output_path: PathBuf,
    pub format_id: String,
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default)]
    pub embed_subtitles: bool,
    #[serde(default)]
    pub subtitle_lang: Option<String>,
    #[serde(default)]
    pub playlist: bool,
    pub status: JobStatus,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub completed_time: Option<i64>,
    #[serde(default)]
    pub file_size: u64,
}

pub struct HistoryStore {
    records: Vec<HistoryRecord>,
    limit: usize,
    generation: u64,
    writer: Option<Arc<HistoryWriter>>,
}

impl HistoryStore {
    /// Read the log at `path`. A missing or unreadable file yields an empty history.
    pub fn load(path: impl Into<PathBuf>, limit: usize) -> Self {
        let writer = Arc::new(HistoryWriter::new(path.into()));
        let mut records = writer.read();
        let limit = limit.max(1);
        records.truncate(limit);
        tracing::debug!(
            path = %writer.path().display(),
            records = records.len(),
            "loaded download history"
        );
        Self {
            records,
            limit,
            generation: 0,
            writer: Some(writer),
        }
    }

    /// History that is never written to disk.
    pub fn in_memory(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit: limit.max(1),
            generation: 0,
            writer: None,
        }
    }

    /// Default path: `~/.local/state/mediaq/history.json`.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(crate::logging::state_dir()?.join("history.json"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.writer.as_deref().map(HistoryWriter::path)
    }

    /// Newest first.
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Insert at head, drop anything past the limit, and write the log.
    pub fn commit(&mut self, record: HistoryRecord) {
        self.push(record);
        self.flush();
    }

    /// Empty the log and write the empty state.
    pub fn clear(&mut self) {
        self.clear_records();
        self.flush();
    }

    /// Remove one entry and write the log if it changed.
    pub fn forget(&mut self, id: JobId) -> bool {
        let removed = self.remove(id);
        if removed {
            self.flush();
        }
        removed
    }

    /// In-memory insert; pair with `pending_write` to persist off the caller's path.
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(self.limit);
        self.generation += 1;
    }

    pub fn clear_records(&mut self) {
        self.records.clear();
        self.generation += 1;
    }

    /// Forget one entry. Returns false if no record has that id.
    pub fn remove(&mut self, id: JobId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.download_id != id);
        if self.records.len() == before {
            return false;
        }
        self.generation += 1;
        true
    }

    /// Snapshot of the current state for writing. None for in-memory stores.
    pub fn pending_write(&self) -> Option<PendingWrite> {
        let writer = self.writer.as_ref()?;
        Some(PendingWrite::new(
            Arc::clone(writer),
            self.generation,
            self.records.clone(),
        ))
    }

    fn flush(&self) {
        if let Some(pending) = self.pending_write() {
            pending.write();
        }
    }
}
