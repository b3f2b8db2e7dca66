//! Access Audit Logging
//!
//! - Every released volume run is recorded with the content names it released
//! - The audit log is append-only and durable
//! - One JSON record per line; appends are serialised so records never interleave

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// Content was released to a requester.
    #[serde(rename = "ACCESSED")]
    Accessed,
}

impl AuditAction {
    /// Returns the action name string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Accessed => "ACCESSED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID.
    pub id: Uuid,

    /// When the record was produced.
    pub timestamp: DateTime<Utc>,

    /// The action that occurred.
    pub action: AuditAction,

    /// Volume the content belongs to.
    pub volume_id: String,

    /// Content names released in one contiguous run of this volume.
    pub content_names: Vec<String>,
}

impl AuditRecord {
    /// Create a record for content released from one volume.
    pub fn accessed(volume_id: impl Into<String>, content_names: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action: AuditAction::Accessed,
            volume_id: volume_id.into(),
            content_names,
        }
    }

    /// Serialize to a JSON line (without the trailing newline).
    pub fn to_json(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(io::Error::from)
    }
}

/// Append-only sink for access records, shared across concurrent requests.
pub trait Auditor: Send + Sync {
    /// Append a record. The record MUST be complete and visible after this returns.
    fn audit(&self, record: &AuditRecord) -> io::Result<()>;
}

/// File-based auditor.
///
/// - Append-only file format
/// - fsync after each write for durability
/// - One JSON record per line
pub struct FileAuditor {
    path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
}

impl FileAuditor {
    /// Open or create an audit log file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Get the audit log path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Auditor for FileAuditor {
    fn audit(&self, record: &AuditRecord) -> io::Result<()> {
        let json = record.to_json()?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

/// In-memory auditor for testing.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditor {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditor {
    /// Create a new in-memory auditor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Auditor for MemoryAuditor {
    fn audit(&self, record: &AuditRecord) -> io::Result<()> {
        self.records
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "audit log lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
