//! sm-engine - Migration engine for Schemata
//!
//! Applies and reverts catalog migrations against a database, one
//! transaction per migration, under a named advisory lock. Applied
//! migrations are tracked in a ledger table alongside their checksums so
//! edits to already-applied migrations are caught as drift.

pub mod error;
pub mod ledger;
pub mod lock;
pub mod runner;
pub mod status;

pub use error::{EngineError, EngineResult};
pub use ledger::{Ledger, LedgerEntry};
pub use lock::LockGuard;
pub use runner::{
    Direction, ExecutedMigration, PlannedMigration, RunReport, Runner, RunnerOptions,
};
pub use status::{MigrationState, MigrationStatus, StatusReport};
