use crate::persistence::PersistenceError;
use crate::surface::SurfaceError;

/// Failures that end a run early or lose its audit record.
///
/// Stage aborts and item anomalies are not errors: they are recorded in
/// [`crate::outcome::StageReport`] and the ledger, and the run carries on.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The document engine failed outside any per-item boundary.
    #[error("engine failure: {0}")]
    EngineFailure(#[source] SurfaceError),

    #[error("run cancelled before completion")]
    Cancelled,

    #[error("audit export failed: {0}")]
    Persistence(#[from] PersistenceError),
}

impl MigrationError {
    /// Process exit code the CLI reports for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::Cancelled => 130,
            MigrationError::EngineFailure(_) | MigrationError::Persistence(_) => 1,
        }
    }
}
