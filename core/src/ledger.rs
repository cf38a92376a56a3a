//! Append-only record of every identifier a run touches.
//!
//! ## Buckets
//!
//! ```text
//! cartAsins      discovered by the cart-to-saved stage
//! savedAsins     discovered by the list-promotion stage
//! addedAsins     committed to the target list
//! deletedAsins   removed from saved-for-later after promotion
//! failedRetries  item anomalies with their reason
//! ```
//!
//! Ordering between buckets is enforced by tokens: only [`Ledger::record_saved`]
//! mints a [`Discovered`], only [`Ledger::record_added`] turns one into a
//! [`Promoted`], and only a `Promoted` can be recorded as deleted.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::identifier::Identifier;

/// Why an item ended up in `failedRetries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FailureReason {
    PopupDidNotAppear,
    NoMatchingList,
    CouldNotDelete,
    /// Error caught at the per-item boundary.
    Interaction(String),
}

const INTERACTION_PREFIX: &str = "interaction error: ";

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PopupDidNotAppear => f.write_str("popup did not appear"),
            FailureReason::NoMatchingList => f.write_str("no matching list"),
            FailureReason::CouldNotDelete => f.write_str("could not delete"),
            FailureReason::Interaction(detail) => write!(f, "{INTERACTION_PREFIX}{detail}"),
        }
    }
}

impl From<FailureReason> for String {
    fn from(reason: FailureReason) -> Self {
        reason.to_string()
    }
}

impl From<String> for FailureReason {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "popup did not appear" => FailureReason::PopupDidNotAppear,
            "no matching list" => FailureReason::NoMatchingList,
            "could not delete" => FailureReason::CouldNotDelete,
            other => FailureReason::Interaction(
                other
                    .strip_prefix(INTERACTION_PREFIX)
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRetry {
    pub asin: Identifier,
    pub reason: FailureReason,
}

/// Proof that an identifier was recorded in `savedAsins`.
#[derive(Debug)]
pub struct Discovered(Identifier);

impl Discovered {
    pub fn identifier(&self) -> &Identifier {
        &self.0
    }
}

/// Proof that an identifier was recorded in `addedAsins`.
#[derive(Debug)]
pub struct Promoted(Identifier);

impl Promoted {
    pub fn identifier(&self) -> &Identifier {
        &self.0
    }
}

/// The five audit sequences of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    cart_asins: Vec<Identifier>,
    saved_asins: Vec<Identifier>,
    added_asins: Vec<Identifier>,
    deleted_asins: Vec<Identifier>,
    failed_retries: Vec<FailedRetry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cart(&mut self, id: &Identifier) {
        self.cart_asins.push(id.clone());
    }

    pub fn record_saved(&mut self, id: &Identifier) -> Discovered {
        self.saved_asins.push(id.clone());
        Discovered(id.clone())
    }

    pub fn record_added(&mut self, discovered: Discovered) -> Promoted {
        self.added_asins.push(discovered.0.clone());
        Promoted(discovered.0)
    }

    pub fn record_deleted(&mut self, promoted: Promoted) {
        self.deleted_asins.push(promoted.0);
    }

    pub fn record_failure(&mut self, id: &Identifier, reason: FailureReason) {
        self.failed_retries.push(FailedRetry {
            asin: id.clone(),
            reason,
        });
    }

    pub fn cart_asins(&self) -> &[Identifier] {
        &self.cart_asins
    }

    pub fn saved_asins(&self) -> &[Identifier] {
        &self.saved_asins
    }

    pub fn added_asins(&self) -> &[Identifier] {
        &self.added_asins
    }

    pub fn deleted_asins(&self) -> &[Identifier] {
        &self.deleted_asins
    }

    pub fn failed_retries(&self) -> &[FailedRetry] {
        &self.failed_retries
    }

    pub fn is_empty(&self) -> bool {
        self.cart_asins.is_empty()
            && self.saved_asins.is_empty()
            && self.added_asins.is_empty()
            && self.deleted_asins.is_empty()
            && self.failed_retries.is_empty()
    }

    /// Re-checks the cross-bucket invariants.
    ///
    /// The recording API makes these unbreakable for a ledger built in
    /// process; this exists for ledgers read back from disk.
    pub fn check_invariants(&self) -> Vec<LedgerViolation> {
        let saved: HashSet<&Identifier> = self.saved_asins.iter().collect();
        let added: HashSet<&Identifier> = self.added_asins.iter().collect();
        let deleted: HashSet<&Identifier> = self.deleted_asins.iter().collect();

        let mut violations = Vec::new();
        for id in &self.added_asins {
            if !saved.contains(id) {
                violations.push(LedgerViolation::AddedWithoutDiscovery(id.clone()));
            }
        }
        for id in &self.deleted_asins {
            if !added.contains(id) {
                violations.push(LedgerViolation::DeletedWithoutPromotion(id.clone()));
            }
        }
        for failure in &self.failed_retries {
            if deleted.contains(&failure.asin) {
                violations.push(LedgerViolation::DeletedAndFailed(failure.asin.clone()));
            }
        }
        violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerViolation {
    #[error("{0} was added to the target list without being discovered")]
    AddedWithoutDiscovery(Identifier),

    #[error("{0} was deleted without being added to the target list")]
    DeletedWithoutPromotion(Identifier),

    #[error("{0} is recorded as both deleted and failed")]
    DeletedAndFailed(Identifier),
}
