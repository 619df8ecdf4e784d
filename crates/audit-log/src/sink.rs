//! Audit sinks.

use crate::{AuditEntry, AuditRecord, AuditResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only destination for audit records.
///
/// Implementations must tolerate concurrent callers.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord) -> AuditResult<()>;
}

/// Audit sink writing JSONL to a file.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditLog {
    /// Open `path` for appending, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, record: AuditRecord) -> AuditResult<()> {
        let mut line = serde_json::to_string(&AuditEntry::new(record))?;
        line.push('\n');

        // Single write per line so concurrent appends never interleave.
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// In-memory sink, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Records with the given `msg` kind, in arrival order.
    pub fn of_kind(&self, kind: &str) -> Vec<AuditRecord> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.record.kind() == kind)
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, record: AuditRecord) -> AuditResult<()> {
        self.entries.lock().push(AuditEntry::new(record));
        Ok(())
    }
}
