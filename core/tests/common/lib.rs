#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Test doubles for `listmover-core`: a scripted document surface and
//! in-memory persistence sinks.

use std::sync::Mutex;

use listmover_core::Identifier;
use listmover_core::MigrationConfig;
use listmover_core::audit::AuditRecord;
use listmover_core::persistence::AuditLocation;
use listmover_core::persistence::PersistenceError;
use listmover_core::persistence::PersistenceSink;

pub mod fake_document;

pub use fake_document::FakeDocument;

pub const TARGET: &str = "Cart and Save For Later";

pub fn id(raw: &str) -> Identifier {
    Identifier::new(raw).expect("non-empty identifier")
}

pub fn ids(raw: &[&str]) -> Vec<Identifier> {
    raw.iter().map(|s| id(s)).collect()
}

/// Default selectors, no pauses, short popup timeout.
pub fn fast_config() -> MigrationConfig {
    MigrationConfig {
        settle_pause_ms: 0,
        scroll_pause_ms: 0,
        delete_retry_pause_ms: 0,
        popup_timeout_ms: 50,
        ..MigrationConfig::default()
    }
}

/// Keeps every persisted record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&self, record: &AuditRecord) -> Result<AuditLocation, PersistenceError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(AuditLocation {
            snapshot: format!("memory://initial-asins-{}", record.run_key).into(),
            summary: format!("memory://summary-{}", record.run_key).into(),
        })
    }
}

/// Rejects every write.
pub struct FailingSink;

impl PersistenceSink for FailingSink {
    fn persist(&self, _record: &AuditRecord) -> Result<AuditLocation, PersistenceError> {
        Err(PersistenceError::Io(std::io::Error::other("disk full")))
    }
}
