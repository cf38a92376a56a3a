use serde::Serialize;

use crate::identifier::Identifier;
use crate::ledger::FailureReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CartToSaved,
    ListPromotion,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::CartToSaved => f.write_str("cart-to-saved"),
            Stage::ListPromotion => f.write_str("list-promotion"),
        }
    }
}

/// Terminal classification of one identifier within one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Moved from the cart to saved-for-later.
    Moved,
    /// Committed to the target list but never confirmed deleted.
    Added,
    /// Committed to the target list and deleted from its source.
    Deleted,
    Failed(FailureReason),
}

/// A failure that stopped a whole stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageAbort {
    /// Item being processed when the stage stopped, when one was resolved.
    pub identifier: Option<Identifier>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub outcomes: Vec<(Identifier, MigrationOutcome)>,
    pub aborted: Option<StageAbort>,
    /// Controls left in place because their item could not be resolved.
    pub unresolved: usize,
}

impl StageReport {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            outcomes: Vec::new(),
            aborted: None,
            unresolved: 0,
        }
    }

    pub fn push(&mut self, id: Identifier, outcome: MigrationOutcome) {
        self.outcomes.push((id, outcome));
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty() && self.aborted.is_none() && self.unresolved == 0
    }

    pub fn moved(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Moved))
    }

    /// Items committed to the target list, deleted or not.
    pub fn promoted(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Added | MigrationOutcome::Deleted))
            + self.count(|o| matches!(o, MigrationOutcome::Failed(FailureReason::CouldNotDelete)))
    }

    pub fn deleted(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Deleted))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&MigrationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}
