//! Error types for the migration engine.

use crate::runner::Direction;
use sm_core::CoreError;
use sm_db::DbError;
use std::time::Duration;
use thiserror::Error;

/// Migration engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// The ledger already records this migration (G001).
    #[error("[G001] Migration {id} is already applied")]
    AlreadyApplied { id: String },

    /// The ledger has no record of this migration (G002).
    #[error("[G002] Migration {id} is not applied")]
    NotApplied { id: String },

    /// The recorded checksum disagrees with the current definition (G003).
    #[error("[G003] Migration {id} has drifted: recorded checksum {recorded}, current {current}")]
    Drift {
        id: String,
        recorded: String,
        current: String,
    },

    /// The advisory lock could not be taken in time (G004).
    #[error("[G004] Timed out after {timeout:?} waiting for migration lock '{name}'")]
    LockTimeout { name: String, timeout: Duration },

    /// A DDL statement failed; the migration's transaction was rolled back (G005).
    #[error("[G005] Migration {id} failed at {direction} operation {index} ({operation})")]
    OperationExecution {
        id: String,
        direction: Direction,
        index: usize,
        operation: String,
        #[source]
        source: DbError,
    },

    /// The ledger table holds data that cannot be read back (G006).
    #[error("[G006] Ledger error: {0}")]
    Ledger(String),

    /// Catalog or configuration error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database driver error outside of a migration's operations
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Result type alias for [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Migration id the error is about, when there is one.
    pub fn migration_id(&self) -> Option<&str> {
        match self {
            EngineError::AlreadyApplied { id }
            | EngineError::NotApplied { id }
            | EngineError::Drift { id, .. }
            | EngineError::OperationExecution { id, .. } => Some(id),
            EngineError::Core(CoreError::NotFound { id }) => Some(id),
            _ => None,
        }
    }
}
