//! Durable record of applied migrations.
//!
//! The ledger lives in a table of the migrated database itself, so ledger
//! writes share the transaction of the migration they record.

use crate::error::{EngineError, EngineResult};
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sm_core::sql_utils::{is_plain_identifier, quote_ident, quote_literal};
use sm_core::{CoreError, MigrationId};
use sm_db::Database;
use std::collections::BTreeSet;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub migration_id: MigrationId,
    pub name: String,
    pub applied_at: NaiveDateTime,
    pub checksum: String,
}

/// Ledger table accessor over a borrowed database handle.
pub struct Ledger<'a> {
    db: &'a dyn Database,
    table: String,
}

impl<'a> Ledger<'a> {
    /// Bind to `table`, which must be a plain identifier.
    pub fn new(db: &'a dyn Database, table: &str) -> EngineResult<Self> {
        if !is_plain_identifier(table) {
            return Err(CoreError::ConfigInvalid {
                message: format!("ledger table '{table}' must be a plain identifier"),
            }
            .into());
        }
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    /// Name of the ledger table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist.
    pub async fn bootstrap(&self) -> EngineResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 migration_id VARCHAR PRIMARY KEY,
                 name         VARCHAR NOT NULL,
                 applied_at   TIMESTAMP NOT NULL,
                 checksum     VARCHAR NOT NULL
             )",
            quote_ident(&self.table)
        );
        self.db.execute_batch(&sql).await?;
        Ok(())
    }

    /// All entries, ordered by migration id.
    pub async fn entries(&self) -> EngineResult<Vec<LedgerEntry>> {
        self.select_entries(None).await
    }

    /// Ids of every applied migration, as of the last committed transaction.
    pub async fn applied_ids(&self) -> EngineResult<BTreeSet<MigrationId>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .map(|e| e.migration_id)
            .collect())
    }

    /// The entry for `id`, if recorded.
    pub async fn find(&self, id: &MigrationId) -> EngineResult<Option<LedgerEntry>> {
        Ok(self.select_entries(Some(id)).await?.into_iter().next())
    }

    /// Record `id` as applied now.
    ///
    /// Fails with [`EngineError::AlreadyApplied`] if `id` is already recorded.
    pub async fn record_applied(
        &self,
        id: &MigrationId,
        name: &str,
        checksum: &str,
    ) -> EngineResult<()> {
        if self.find(id).await?.is_some() {
            return Err(EngineError::AlreadyApplied { id: id.to_string() });
        }
        let applied_at = Utc::now().naive_utc().format("%Y-%m-%d %H:%M:%S%.6f");
        let sql = format!(
            "INSERT INTO {} (migration_id, name, applied_at, checksum) VALUES ({}, {}, TIMESTAMP '{}', {})",
            quote_ident(&self.table),
            quote_literal(id.as_str()),
            quote_literal(name),
            applied_at,
            quote_literal(checksum)
        );
        self.db.execute(&sql).await?;
        Ok(())
    }

    /// Remove the record for `id`.
    ///
    /// Fails with [`EngineError::NotApplied`] if `id` is not recorded.
    pub async fn record_rolled_back(&self, id: &MigrationId) -> EngineResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE migration_id = {}",
            quote_ident(&self.table),
            quote_literal(id.as_str())
        );
        let deleted = self.db.execute(&sql).await?;
        if deleted == 0 {
            return Err(EngineError::NotApplied { id: id.to_string() });
        }
        Ok(())
    }

    /// Compare the recorded checksum of `id` against `expected`.
    pub async fn verify_checksum(&self, id: &MigrationId, expected: &str) -> EngineResult<()> {
        let entry = self
            .find(id)
            .await?
            .ok_or_else(|| EngineError::NotApplied { id: id.to_string() })?;
        if entry.checksum != expected {
            return Err(EngineError::Drift {
                id: id.to_string(),
                recorded: entry.checksum,
                current: expected.to_string(),
            });
        }
        Ok(())
    }

    async fn select_entries(&self, id: Option<&MigrationId>) -> EngineResult<Vec<LedgerEntry>> {
        let mut sql = format!(
            "SELECT migration_id, name, CAST(applied_at AS VARCHAR), checksum FROM {}",
            quote_ident(&self.table)
        );
        if let Some(id) = id {
            sql.push_str(&format!(" WHERE migration_id = {}", quote_literal(id.as_str())));
        }

        let mut entries = self
            .db
            .query_rows(&sql)
            .await?
            .into_iter()
            .map(parse_entry)
            .collect::<EngineResult<Vec<_>>>()?;
        entries.sort_by(|a, b| a.migration_id.cmp(&b.migration_id));
        Ok(entries)
    }
}

fn parse_entry(row: sm_db::Row) -> EngineResult<LedgerEntry> {
    let mut cells = row.into_iter();
    let mut next = |column: &str| {
        cells
            .next()
            .flatten()
            .ok_or_else(|| EngineError::Ledger(format!("ledger row is missing {column}")))
    };
    let raw_id = next("migration_id")?;
    let name = next("name")?;
    let raw_applied_at = next("applied_at")?;
    let checksum = next("checksum")?;

    let migration_id = MigrationId::parse(raw_id)?;
    let applied_at = NaiveDateTime::parse_from_str(&raw_applied_at, TIMESTAMP_FORMAT)
        .map_err(|e| {
            EngineError::Ledger(format!(
                "invalid applied_at '{raw_applied_at}' for {migration_id}: {e}"
            ))
        })?;

    Ok(LedgerEntry {
        migration_id,
        name,
        applied_at,
        checksum,
    })
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
