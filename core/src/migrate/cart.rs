use tracing::info;
use tracing::warn;

use crate::config::MigrationConfig;
use crate::drain::DiscoveredItem;
use crate::drain::DrainCursor;
use crate::ledger::Ledger;
use crate::outcome::MigrationOutcome;
use crate::outcome::StageAbort;
use crate::outcome::StageReport;
use crate::surface::InteractiveSurface;
use crate::surface::SurfaceError;

/// Moves every cart item to saved-for-later.
pub struct CartToSavedMigrator<'a> {
    config: &'a MigrationConfig,
}

impl<'a> CartToSavedMigrator<'a> {
    pub fn new(config: &'a MigrationConfig) -> Self {
        Self { config }
    }

    /// Drains the cart into `report`. A failed move stops this stage only;
    /// items left behind are picked up by a later run.
    pub async fn run<S: InteractiveSurface>(
        &self,
        surface: &S,
        ledger: &mut Ledger,
        report: &mut StageReport,
    ) -> Result<(), SurfaceError> {
        let selectors = &self.config.selectors;
        let mut cursor = DrainCursor::new(
            surface,
            &selectors.save_for_later,
            &selectors.cart_item_container,
            self.config.settle_pause(),
        );

        loop {
            let item = match cursor.next().await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(err @ SurfaceError::Engine(_)) => return Err(err),
                Err(err) => {
                    warn!("Failed to resolve next cart item: {err}");
                    report.aborted = Some(StageAbort {
                        identifier: None,
                        detail: err.to_string(),
                    });
                    break;
                }
            };

            ledger.record_cart(&item.identifier);
            if let Err(err) = self.move_item(surface, &item).await {
                warn!("Failed to move cart item {}: {err}", item.identifier);
                report.aborted = Some(StageAbort {
                    identifier: Some(item.identifier),
                    detail: err.to_string(),
                });
                break;
            }

            info!("Moved cart item to Saved for Later: {}", item.identifier);
            report.push(item.identifier, MigrationOutcome::Moved);
            cursor.settle().await;
        }

        info!("Cart drained: {} item(s) moved", report.moved());
        Ok(())
    }

    async fn move_item<S: InteractiveSurface>(
        &self,
        surface: &S,
        item: &DiscoveredItem<S>,
    ) -> Result<(), SurfaceError> {
        surface.scroll_into_view(&item.control).await?;
        tokio::time::sleep(self.config.scroll_pause()).await;
        surface.activate(&item.control).await
    }
}
