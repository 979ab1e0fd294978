//! Per-migration status as seen by the ledger.

use crate::ledger::LedgerEntry;
use chrono::NaiveDateTime;
use serde::Serialize;
use sm_core::MigrationId;
use std::fmt;

/// Where a known migration stands relative to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Applied,
    Pending,
    /// Recorded, but the recorded checksum differs from the current one
    Drifted,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationState::Applied => write!(f, "applied"),
            MigrationState::Pending => write!(f, "pending"),
            MigrationState::Drifted => write!(f, "drifted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub id: MigrationId,
    pub name: String,
    pub state: MigrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<NaiveDateTime>,
}

/// Status of every known migration, plus ledger entries with no descriptor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub migrations: Vec<MigrationStatus>,
    pub orphaned: Vec<LedgerEntry>,
}

impl StatusReport {
    fn count(&self, state: MigrationState) -> usize {
        self.migrations.iter().filter(|m| m.state == state).count()
    }

    pub fn applied_count(&self) -> usize {
        self.count(MigrationState::Applied)
    }

    pub fn pending_count(&self) -> usize {
        self.count(MigrationState::Pending)
    }

    pub fn drifted_count(&self) -> usize {
        self.count(MigrationState::Drifted)
    }

    /// True if any migration has drifted.
    pub fn has_drift(&self) -> bool {
        self.drifted_count() > 0
    }

    /// Status of a single migration.
    pub fn get(&self, id: &MigrationId) -> Option<&MigrationStatus> {
        self.migrations.iter().find(|m| &m.id == id)
    }
}
