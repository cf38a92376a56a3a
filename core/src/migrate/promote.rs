//! Saved-for-later to target list, one item at a time.
//!
//! ```text
//! Discovered -> PopupRequested -> PopupVisible? -> MatchedTarget | NoMatch
//!   MatchedTarget -> CommitSelection -> DeleteAttempt(1..=n) -> Deleted | DeleteFailed
//! ```

use tracing::error;
use tracing::info;
use tracing::warn;

use crate::config::MigrationConfig;
use crate::drain::DiscoveredItem;
use crate::drain::DrainCursor;
use crate::identifier::Identifier;
use crate::ledger::FailureReason;
use crate::ledger::Ledger;
use crate::outcome::MigrationOutcome;
use crate::outcome::StageAbort;
use crate::outcome::StageReport;
use crate::surface::InteractiveSurface;
use crate::surface::SurfaceError;

/// Whether a popup entry label names the target list.
///
/// The label is trimmed, the target is not; comparison is case-sensitive.
pub fn label_matches(label: &str, target: &str) -> bool {
    label.trim() == target
}

enum Selection {
    Committed,
    PopupMissing,
    NoMatch,
}

enum Deletion {
    Deleted { attempts: u32 },
    Exhausted,
}

pub struct ListPromotionMigrator<'a> {
    config: &'a MigrationConfig,
}

impl<'a> ListPromotionMigrator<'a> {
    pub fn new(config: &'a MigrationConfig) -> Self {
        Self { config }
    }

    /// Promotes every saved item into `report`. One item's anomaly never
    /// stops the stage, including a control whose item cannot be resolved;
    /// only a failed query for saved items does.
    pub async fn run<S: InteractiveSurface>(
        &self,
        surface: &S,
        ledger: &mut Ledger,
        report: &mut StageReport,
    ) -> Result<(), SurfaceError> {
        let selectors = &self.config.selectors;
        let mut cursor = DrainCursor::new(
            surface,
            &selectors.add_to_list,
            &selectors.saved_item_container,
            self.config.settle_pause(),
        )
        .skip_unresolved();

        loop {
            // Only the query itself can fail here; unresolvable controls are skipped.
            let item = match cursor.next().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err @ SurfaceError::Engine(_)) => return Err(err),
                Err(err) => {
                    warn!("Failed to query saved items: {err}");
                    report.aborted = Some(StageAbort {
                        identifier: None,
                        detail: err.to_string(),
                    });
                    break;
                }
            };

            let identifier = item.identifier.clone();
            let outcome = self.promote(surface, ledger, item).await;
            report.push(identifier, outcome);
            cursor.settle().await;
        }

        report.unresolved = cursor.unresolved();
        if report.unresolved > 0 {
            warn!(
                "{} saved item(s) left in place: owning item could not be resolved",
                report.unresolved
            );
        }
        info!(
            "Done. {} item(s) moved to \"{}\", {} deleted from Saved for Later",
            report.promoted(),
            self.config.target_collection_name,
            report.deleted()
        );
        Ok(())
    }

    /// Runs one item through the state machine. Every error is absorbed
    /// here and recorded against the item.
    async fn promote<S: InteractiveSurface>(
        &self,
        surface: &S,
        ledger: &mut Ledger,
        item: DiscoveredItem<S>,
    ) -> MigrationOutcome {
        let DiscoveredItem {
            control,
            container,
            identifier,
        } = item;
        let discovered = ledger.record_saved(&identifier);

        let selection = self.select_target(surface, control).await;
        match selection {
            Ok(Selection::Committed) => {}
            Ok(Selection::PopupMissing) => {
                warn!("List popup did not appear for {identifier}");
                return fail(ledger, &identifier, FailureReason::PopupDidNotAppear);
            }
            Ok(Selection::NoMatch) => {
                warn!(
                    "List \"{}\" not found in popup for {identifier}",
                    self.config.target_collection_name
                );
                return fail(ledger, &identifier, FailureReason::NoMatchingList);
            }
            Err(err) => {
                error!("Error processing item {identifier}: {err}");
                return fail(ledger, &identifier, FailureReason::Interaction(err.to_string()));
            }
        }

        let promoted = ledger.record_added(discovered);
        info!(
            "Added {identifier} to \"{}\"",
            self.config.target_collection_name
        );

        match self.delete_source(surface, &container).await {
            Ok(Deletion::Deleted { attempts }) => {
                ledger.record_deleted(promoted);
                info!("Deleted item after adding to list: {identifier} (attempt {attempts})");
                MigrationOutcome::Deleted
            }
            Ok(Deletion::Exhausted) => {
                warn!(
                    "Failed to delete {identifier} after {} attempts",
                    self.config.max_delete_retries
                );
                ledger.record_failure(&identifier, FailureReason::CouldNotDelete);
                MigrationOutcome::Failed(FailureReason::CouldNotDelete)
            }
            Err(err) => {
                error!("Error deleting item {identifier}: {err}");
                ledger.record_failure(&identifier, FailureReason::Interaction(err.to_string()));
                MigrationOutcome::Added
            }
        }
    }

    /// Opens the list popup for `control` and commits the target entry.
    /// Consumes the control: the popup re-renders the item.
    async fn select_target<S: InteractiveSurface>(
        &self,
        surface: &S,
        control: S::Control,
    ) -> Result<Selection, SurfaceError> {
        let selectors = &self.config.selectors;
        surface.scroll_into_view(&control).await?;
        surface.activate(&control).await?;
        drop(control);

        let marker = surface
            .wait_for_visible(&selectors.popup_marker, self.config.popup_timeout())
            .await?;
        if marker.is_none() {
            return Ok(Selection::PopupMissing);
        }

        for entry in surface.find_all(&selectors.popup_entry).await? {
            let Some(label) = surface
                .text_within(&entry, &selectors.popup_entry_label)
                .await?
            else {
                continue;
            };
            if label_matches(&label, &self.config.target_collection_name) {
                surface.commit_selection(&entry).await?;
                return Ok(Selection::Committed);
            }
        }
        Ok(Selection::NoMatch)
    }

    /// Deletes the saved item from the container captured at discovery,
    /// re-resolving the delete control on each attempt. Success is declared
    /// on activating a present control.
    async fn delete_source<S: InteractiveSurface>(
        &self,
        surface: &S,
        container: &S::Container,
    ) -> Result<Deletion, SurfaceError> {
        let max = self.config.max_delete_retries;
        for attempt in 1..=max {
            if let Some(button) = surface
                .find_within(container, &self.config.selectors.delete_saved)
                .await?
            {
                surface.scroll_into_view(&button).await?;
                surface.activate(&button).await?;
                return Ok(Deletion::Deleted { attempts: attempt });
            }
            if attempt < max {
                tokio::time::sleep(self.config.delete_retry_pause()).await;
            }
        }
        Ok(Deletion::Exhausted)
    }
}

fn fail(ledger: &mut Ledger, identifier: &Identifier, reason: FailureReason) -> MigrationOutcome {
    ledger.record_failure(identifier, reason.clone());
    MigrationOutcome::Failed(reason)
}
