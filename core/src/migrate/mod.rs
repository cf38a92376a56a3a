//! The two drain stages.
//!
//! Both return their counters in a [`StageReport`](crate::outcome::StageReport)
//! and report an `Err` only for engine failures, which halt the run.
//! Everything else is absorbed: the cart stage stops on its first failed
//! action, the promotion stage records per-item anomalies and moves on.

mod cart;
mod promote;

pub use cart::CartToSavedMigrator;
pub use promote::ListPromotionMigrator;
pub use promote::label_matches;
