//! Core migration workflow for `listmover`.
//!
//! Drains a cart into saved-for-later, then promotes every saved item into a
//! single named list and deletes it from its source, recording each
//! identifier it touches in an append-only [`ledger::Ledger`].
//!
//! The live document is reached only through [`surface::InteractiveSurface`];
//! audit artifacts leave only through [`persistence::PersistenceSink`].

pub mod audit;
pub mod config;
pub mod drain;
pub mod error;
pub mod identifier;
pub mod ledger;
pub mod migrate;
pub mod outcome;
pub mod persistence;
pub mod run;
pub mod surface;

pub use config::MigrationConfig;
pub use error::MigrationError;
pub use identifier::Identifier;
pub use ledger::Ledger;
pub use run::MigrationRun;
pub use run::RunSummary;
pub use surface::InteractiveSurface;
