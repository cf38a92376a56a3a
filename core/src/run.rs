//! One migration run: snapshot, cart stage, promotion stage, audit export.
//!
//! The run owns its [`Ledger`] and lends it to one stage at a time. Stages
//! race a [`CancellationToken`]; whichever way they end, the ledger gathered
//! so far is exported before [`MigrationRun::execute`] returns.

use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::audit::AuditExporter;
use crate::audit::AuditRecord;
use crate::audit::RunKey;
use crate::audit::RunSnapshot;
use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::ledger::Ledger;
use crate::migrate::CartToSavedMigrator;
use crate::migrate::ListPromotionMigrator;
use crate::outcome::Stage;
use crate::outcome::StageReport;
use crate::persistence::AuditLocation;
use crate::persistence::PersistenceSink;
use crate::surface::InteractiveSurface;

/// What a run did, however it ended.
#[derive(Debug)]
pub struct RunSummary {
    pub run_key: RunKey,
    pub snapshot: RunSnapshot,
    pub ledger: Ledger,
    pub cart: StageReport,
    /// `None` when the promotion stage never started.
    pub promotion: Option<StageReport>,
    /// `None` when the audit export failed.
    pub audit: Option<AuditLocation>,
    /// `Ok` when both stages ran to exhaustion and the audit was written.
    pub result: Result<(), MigrationError>,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(()) => 0,
            Err(err) => err.exit_code(),
        }
    }
}

struct Progress {
    ledger: Ledger,
    cart: StageReport,
    promotion: Option<StageReport>,
}

pub struct MigrationRun {
    config: MigrationConfig,
    run_key: RunKey,
}

impl MigrationRun {
    pub fn new(config: MigrationConfig) -> Self {
        Self {
            config,
            run_key: RunKey::now(),
        }
    }

    pub fn with_run_key(mut self, run_key: RunKey) -> Self {
        self.run_key = run_key;
        self
    }

    pub fn run_key(&self) -> &RunKey {
        &self.run_key
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub async fn execute<S, P>(
        &self,
        surface: &S,
        sink: &P,
        cancel: &CancellationToken,
    ) -> RunSummary
    where
        S: InteractiveSurface,
        P: PersistenceSink + ?Sized,
    {
        info!("Run {} starting", self.run_key);
        let mut progress = Progress {
            ledger: Ledger::new(),
            cart: StageReport::new(Stage::CartToSaved),
            promotion: None,
        };

        let (snapshot, mut result) = match surface.all_visible_identifiers().await {
            Ok(ids) => {
                let snapshot = RunSnapshot::capture(ids);
                info!("Captured {} identifier(s) at start", snapshot.len());
                let stages = self.run_stages(surface, &mut progress);
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(MigrationError::Cancelled),
                    res = stages => res,
                };
                (snapshot, result)
            }
            Err(err) => (RunSnapshot::default(), Err(MigrationError::EngineFailure(err))),
        };

        match &result {
            Ok(()) => {}
            Err(MigrationError::Cancelled) => warn!("Run {} interrupted", self.run_key),
            Err(err) => error!("Run {} failed: {err}", self.run_key),
        }

        let record = AuditRecord {
            run_key: self.run_key.clone(),
            snapshot,
            ledger: progress.ledger,
        };
        let audit = match AuditExporter::new(sink).export(&record) {
            Ok(location) => Some(location),
            Err(err) => {
                error!("Failed to write audit record for run {}: {err}", self.run_key);
                if result.is_ok() {
                    result = Err(MigrationError::Persistence(err));
                }
                None
            }
        };

        RunSummary {
            run_key: record.run_key,
            snapshot: record.snapshot,
            ledger: record.ledger,
            cart: progress.cart,
            promotion: progress.promotion,
            audit,
            result,
        }
    }

    async fn run_stages<S: InteractiveSurface>(
        &self,
        surface: &S,
        progress: &mut Progress,
    ) -> Result<(), MigrationError> {
        CartToSavedMigrator::new(&self.config)
            .run(surface, &mut progress.ledger, &mut progress.cart)
            .await
            .map_err(MigrationError::EngineFailure)?;

        if let Some(abort) = &progress.cart.aborted {
            warn!("Cart stage aborted: {}", abort.detail);
            if self.config.stop_after_cart_abort {
                warn!("Skipping list promotion after cart abort");
                return Ok(());
            }
        }

        let promotion = progress
            .promotion
            .insert(StageReport::new(Stage::ListPromotion));
        ListPromotionMigrator::new(&self.config)
            .run(surface, &mut progress.ledger, promotion)
            .await
            .map_err(MigrationError::EngineFailure)?;

        if let Some(abort) = &promotion.aborted {
            warn!("List promotion stage aborted: {}", abort.detail);
        }
        Ok(())
    }
}
