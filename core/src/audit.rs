//! Audit artifacts: the run key, the initial snapshot, and the exporter that
//! hands both to a [`PersistenceSink`] together with the final ledger.

use std::collections::HashSet;
use std::fmt;

use chrono::Local;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::identifier::Identifier;
use crate::ledger::Ledger;
use crate::persistence::AuditLocation;
use crate::persistence::PersistenceError;
use crate::persistence::PersistenceSink;

/// Timestamp key shared by every artifact of one run (`yyyyMMdd-HHmmss`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunKey(String);

impl RunKey {
    pub const FORMAT: &'static str = "%Y%m%d-%H%M%S";

    pub fn now() -> Self {
        Self(Local::now().format(Self::FORMAT).to_string())
    }

    /// Accepts only keys in the run-key format.
    pub fn parse(raw: &str) -> Option<Self> {
        chrono::NaiveDateTime::parse_from_str(raw, Self::FORMAT)
            .ok()
            .map(|_| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiers visible when the run started. Captured once and only ever
/// compared against, never iterated for control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunSnapshot(Vec<Identifier>);

impl RunSnapshot {
    /// De-duplicates `ids`, keeping first-seen order.
    pub fn capture(ids: Vec<Identifier>) -> Self {
        let mut seen = HashSet::new();
        Self(ids.into_iter().filter(|id| seen.insert(id.clone())).collect())
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything persisted for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub run_key: RunKey,
    pub snapshot: RunSnapshot,
    pub ledger: Ledger,
}

pub struct AuditExporter<'a, P: PersistenceSink + ?Sized> {
    sink: &'a P,
}

impl<'a, P: PersistenceSink + ?Sized> AuditExporter<'a, P> {
    pub fn new(sink: &'a P) -> Self {
        Self { sink }
    }

    /// Writes `record` once. Ledger invariant violations are logged, not
    /// fatal: the record is the evidence either way.
    pub fn export(&self, record: &AuditRecord) -> Result<AuditLocation, PersistenceError> {
        for violation in record.ledger.check_invariants() {
            warn!("Ledger invariant violated: {violation}");
        }
        let location = self.sink.persist(record)?;
        info!("Audit record for run {} written to {location}", record.run_key);
        Ok(location)
    }
}

/// Snapshot identifiers classified by what the ledger says happened to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditComparison {
    /// Present at start, never recorded by any stage.
    pub untouched: Vec<Identifier>,
    /// Committed to the target list but still in saved-for-later.
    pub promoted_not_deleted: Vec<Identifier>,
    /// Recorded by a stage but never committed to the target list.
    pub not_promoted: Vec<Identifier>,
    pub deleted: Vec<Identifier>,
    /// Recorded by a stage without being in the snapshot.
    pub appeared_during_run: Vec<Identifier>,
}

impl AuditComparison {
    pub fn compare(snapshot: &RunSnapshot, ledger: &Ledger) -> Self {
        let deleted: HashSet<&Identifier> = ledger.deleted_asins().iter().collect();
        let added: HashSet<&Identifier> = ledger.added_asins().iter().collect();
        let touched: HashSet<&Identifier> = ledger
            .cart_asins()
            .iter()
            .chain(ledger.saved_asins())
            .collect();
        let in_snapshot: HashSet<&Identifier> = snapshot.identifiers().iter().collect();

        let mut comparison = Self::default();
        for id in snapshot.identifiers() {
            if deleted.contains(id) {
                comparison.deleted.push(id.clone());
            } else if added.contains(id) {
                comparison.promoted_not_deleted.push(id.clone());
            } else if touched.contains(id) {
                comparison.not_promoted.push(id.clone());
            } else {
                comparison.untouched.push(id.clone());
            }
        }

        let mut reported = HashSet::new();
        for id in ledger.cart_asins().iter().chain(ledger.saved_asins()) {
            if !in_snapshot.contains(id) && reported.insert(id) {
                comparison.appeared_during_run.push(id.clone());
            }
        }
        comparison
    }
}
