//! Durable storage for audit records.
//!
//! ## File Layout
//!
//! ```text
//! <log_dir>/
//!   initial-asins-{run_key}.json   RunSnapshot (JSON array)
//!   summary-{run_key}.json         Ledger (five sequences)
//! ```

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use crate::audit::AuditRecord;
use crate::audit::RunKey;
use crate::audit::RunSnapshot;
use crate::ledger::Ledger;

const SNAPSHOT_PREFIX: &str = "initial-asins-";
const SUMMARY_PREFIX: &str = "summary-";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("run not found: {run_key}")]
    NotFound { run_key: String },
}

/// Where a record ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLocation {
    pub snapshot: PathBuf,
    pub summary: PathBuf,
}

impl fmt::Display for AuditLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}", self.snapshot.display(), self.summary.display())
    }
}

/// Durable destination for audit records. Storage format is the sink's
/// concern.
pub trait PersistenceSink {
    fn persist(&self, record: &AuditRecord) -> Result<AuditLocation, PersistenceError>;
}

/// Writes pretty-printed JSON files into one directory.
pub struct JsonFileSink {
    base_dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn snapshot_path(&self, run_key: &RunKey) -> PathBuf {
        self.base_dir.join(format!("{SNAPSHOT_PREFIX}{run_key}.json"))
    }

    fn summary_path(&self, run_key: &RunKey) -> PathBuf {
        self.base_dir.join(format!("{SUMMARY_PREFIX}{run_key}.json"))
    }

    /// Atomically write `data` to `path` via a `.tmp` sibling.
    fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<(), PersistenceError> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reads back a persisted record.
    pub fn read_record(&self, run_key: &RunKey) -> Result<AuditRecord, PersistenceError> {
        let summary_path = self.summary_path(run_key);
        if !summary_path.exists() {
            return Err(PersistenceError::NotFound {
                run_key: run_key.to_string(),
            });
        }
        let ledger: Ledger = serde_json::from_str(&std::fs::read_to_string(&summary_path)?)?;

        let snapshot_path = self.snapshot_path(run_key);
        let snapshot: RunSnapshot = if snapshot_path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&snapshot_path)?)?
        } else {
            RunSnapshot::default()
        };

        Ok(AuditRecord {
            run_key: run_key.clone(),
            snapshot,
            ledger,
        })
    }

    /// Keys of every run with a summary file, oldest first.
    pub fn list_run_keys(&self) -> Result<Vec<RunKey>, PersistenceError> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(rest) = name.strip_prefix(SUMMARY_PREFIX)
                && let Some(raw) = rest.strip_suffix(".json")
                && let Some(key) = RunKey::parse(raw)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn latest_run_key(&self) -> Result<Option<RunKey>, PersistenceError> {
        Ok(self.list_run_keys()?.pop())
    }
}

impl PersistenceSink for JsonFileSink {
    fn persist(&self, record: &AuditRecord) -> Result<AuditLocation, PersistenceError> {
        let snapshot = self.snapshot_path(&record.run_key);
        let summary = self.summary_path(&record.run_key);

        let snapshot_json = serde_json::to_string_pretty(&record.snapshot)?;
        self.atomic_write(&snapshot, snapshot_json.as_bytes())?;

        let summary_json = serde_json::to_string_pretty(&record.ledger)?;
        self.atomic_write(&summary, summary_json.as_bytes())?;

        Ok(AuditLocation { snapshot, summary })
    }
}
