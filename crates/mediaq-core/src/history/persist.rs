//! History file I/O: tolerant read, durable atomic replace on write.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::HistoryRecord;

/// Owns the history file path and serializes writes to it.
///
/// Each write carries the store generation it was taken from; a write older
/// than the last one on disk is skipped, so writes finishing out of order
/// never roll the file back.
#[derive(Debug)]
pub struct HistoryWriter {
    path: PathBuf,
    written: Mutex<Option<u64>>,
}

impl HistoryWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            written: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records. Missing or corrupt files read as empty.
    pub fn read(&self) -> Vec<HistoryRecord> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "read history: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<HistoryRecord>>(&bytes) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "history file unreadable, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    fn write_records(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(records).context("serialize history")?;
        let tmp = tmp_path(&self.path);
        {
            let mut file = std::fs::File::create(&tmp)
                .with_context(|| format!("create history: {}", tmp.display()))?;
            file.write_all(json.as_bytes())
                .with_context(|| format!("write history: {}", tmp.display()))?;
            // Data must be on disk before the rename can expose it.
            file.sync_all()
                .with_context(|| format!("sync history: {}", tmp.display()))?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace history: {}", self.path.display()))?;
        sync_parent(&self.path)?;
        Ok(())
    }
}

/// Persist the directory entry created by the rename.
#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::File::open(parent)
        .and_then(|dir| dir.sync_all())
        .with_context(|| format!("sync dir: {}", parent.display()))
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// A history snapshot waiting to be written. Cheap to move to a blocking thread.
#[derive(Debug)]
pub struct PendingWrite {
    writer: Arc<HistoryWriter>,
    generation: u64,
    records: Vec<HistoryRecord>,
}

impl PendingWrite {
    pub(super) fn new(writer: Arc<HistoryWriter>, generation: u64, records: Vec<HistoryRecord>) -> Self {
        Self {
            writer,
            generation,
            records,
        }
    }

    /// Write the snapshot unless a newer one already reached disk. Errors are logged.
    pub fn write(self) {
        let mut written = self
            .writer
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if matches!(*written, Some(g) if g > self.generation) {
            return;
        }
        match self.writer.write_records(&self.records) {
            Ok(()) => *written = Some(self.generation),
            Err(e) => tracing::warn!("history not saved: {:#}", e),
        }
    }
}
