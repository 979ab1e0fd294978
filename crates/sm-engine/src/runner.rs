//! Applies and reverts migrations against a database.
//!
//! Every run takes the advisory lock, bootstraps the ledger, checks applied
//! migrations for drift, then executes one transaction per migration. A
//! failed migration is rolled back and ends the run; earlier migrations in
//! the same run stay committed.

use crate::error::{EngineError, EngineResult};
use crate::ledger::{Ledger, LedgerEntry};
use crate::lock::LockGuard;
use crate::status::{MigrationState, MigrationStatus, StatusReport};
use serde::Serialize;
use sm_core::{Catalog, Config, MigrationDescriptor, MigrationId, Operation};
use sm_db::{Database, DatabaseLock};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Direction of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl Direction {
    fn operations(self, desc: &MigrationDescriptor) -> &[Operation] {
        match self {
            Direction::Up => &desc.up,
            Direction::Down => &desc.down,
        }
    }
}

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub ledger_table: String,
    pub lock_name: String,
    pub lock_timeout: Duration,
    /// Proceed (with a warning) when applied migrations have drifted
    pub allow_drift: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunnerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ledger_table: config.ledger_table.clone(),
            lock_name: config.lock.name.clone(),
            lock_timeout: config.lock.timeout(),
            allow_drift: config.allow_drift,
        }
    }
}

/// One migration executed by a run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedMigration {
    pub id: MigrationId,
    pub name: String,
    pub operations: usize,
    pub elapsed: Duration,
}

/// Outcome of a successful `up_to` or `down_to`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    pub migrations: Vec<ExecutedMigration>,
}

impl RunReport {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            migrations: Vec::new(),
        }
    }

    /// Total operations executed across all migrations.
    pub fn operations_executed(&self) -> usize {
        self.migrations.iter().map(|m| m.operations).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Ids of the executed migrations, in execution order.
    pub fn ids(&self) -> Vec<&MigrationId> {
        self.migrations.iter().map(|m| &m.id).collect()
    }
}

/// A migration a run would execute, with its rendered statements.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedMigration {
    pub id: MigrationId,
    pub name: String,
    pub direction: Direction,
    pub statements: Vec<String>,
}

impl PlannedMigration {
    fn new(desc: &MigrationDescriptor, direction: Direction) -> Self {
        Self {
            id: desc.id.clone(),
            name: desc.name.clone(),
            direction,
            statements: direction
                .operations(desc)
                .iter()
                .map(Operation::to_sql)
                .collect(),
        }
    }
}

/// Migration runner over a catalog and a database.
pub struct Runner<'a, D: Database + DatabaseLock> {
    db: &'a D,
    catalog: &'a Catalog,
    options: RunnerOptions,
}

impl<'a, D: Database + DatabaseLock> Runner<'a, D> {
    pub fn new(db: &'a D, catalog: &'a Catalog, options: RunnerOptions) -> Self {
        Self {
            db,
            catalog,
            options,
        }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Apply pending migrations up to and including `target`.
    ///
    /// `None` targets the latest known migration. A target at or below the
    /// highest applied id applies nothing.
    pub async fn up_to(&self, target: Option<&MigrationId>) -> EngineResult<RunReport> {
        let guard =
            LockGuard::acquire(self.db, &self.options.lock_name, self.options.lock_timeout).await?;
        let outcome = self.run(Direction::Up, target).await;
        guard.release_after(outcome).await
    }

    /// Revert applied migrations with ids above `target`, newest first.
    ///
    /// `None` reverts every applied migration.
    pub async fn down_to(&self, target: Option<&MigrationId>) -> EngineResult<RunReport> {
        let guard =
            LockGuard::acquire(self.db, &self.options.lock_name, self.options.lock_timeout).await?;
        let outcome = self.run(Direction::Down, target).await;
        guard.release_after(outcome).await
    }

    /// Migrations `up_to(target)` would apply, without applying them.
    pub async fn plan_up(
        &self,
        target: Option<&MigrationId>,
    ) -> EngineResult<Vec<PlannedMigration>> {
        self.plan(Direction::Up, target).await
    }

    /// Migrations `down_to(target)` would revert, without reverting them.
    pub async fn plan_down(
        &self,
        target: Option<&MigrationId>,
    ) -> EngineResult<Vec<PlannedMigration>> {
        self.plan(Direction::Down, target).await
    }

    /// Applied, pending and drifted migrations, plus orphaned ledger entries.
    pub async fn status(&self) -> EngineResult<StatusReport> {
        let ledger = self.ledger()?;
        ledger.bootstrap().await?;

        let mut recorded: BTreeMap<MigrationId, LedgerEntry> = ledger
            .entries()
            .await?
            .into_iter()
            .map(|e| (e.migration_id.clone(), e))
            .collect();

        let mut report = StatusReport::default();
        for desc in self.catalog.list() {
            let status = match recorded.remove(&desc.id) {
                None => MigrationStatus {
                    id: desc.id.clone(),
                    name: desc.name.clone(),
                    state: MigrationState::Pending,
                    applied_at: None,
                },
                Some(entry) => {
                    let state = if entry.checksum == desc.checksum() {
                        MigrationState::Applied
                    } else {
                        MigrationState::Drifted
                    };
                    MigrationStatus {
                        id: desc.id.clone(),
                        name: desc.name.clone(),
                        state,
                        applied_at: Some(entry.applied_at),
                    }
                }
            };
            report.migrations.push(status);
        }
        report.orphaned = recorded.into_values().collect();
        Ok(report)
    }

    fn ledger(&self) -> EngineResult<Ledger<'a>> {
        Ledger::new(self.db, &self.options.ledger_table)
    }

    async fn plan(
        &self,
        direction: Direction,
        target: Option<&MigrationId>,
    ) -> EngineResult<Vec<PlannedMigration>> {
        let ledger = self.ledger()?;
        ledger.bootstrap().await?;
        self.check_drift(&ledger).await?;

        let selected = self.select(&ledger, direction, target).await?;
        Ok(selected
            .into_iter()
            .map(|desc| PlannedMigration::new(desc, direction))
            .collect())
    }

    async fn run(
        &self,
        direction: Direction,
        target: Option<&MigrationId>,
    ) -> EngineResult<RunReport> {
        let ledger = self.ledger()?;
        ledger.bootstrap().await?;
        self.check_drift(&ledger).await?;

        let selected = self.select(&ledger, direction, target).await?;
        log::debug!(
            "{} migration(s) to run {} on {} (ledger {})",
            selected.len(),
            direction,
            self.db.db_type(),
            ledger.table()
        );
        let mut report = RunReport::new(direction);
        for desc in selected {
            report
                .migrations
                .push(self.execute(&ledger, desc, direction).await?);
        }

        if report.is_empty() {
            log::info!("No migrations to run ({})", direction);
        } else {
            log::info!(
                "Ran {} migration(s) {}, {} operation(s)",
                report.migrations.len(),
                direction,
                report.operations_executed()
            );
        }
        Ok(report)
    }

    /// Fail on drift among applied migrations that still have descriptors.
    async fn check_drift(&self, ledger: &Ledger<'_>) -> EngineResult<()> {
        for id in ledger.applied_ids().await? {
            let Ok(desc) = self.catalog.find(&id) else {
                log::debug!("Ledger entry {} has no descriptor", id);
                continue;
            };
            match ledger.verify_checksum(&id, &desc.checksum()).await {
                Err(err @ EngineError::Drift { .. }) if self.options.allow_drift => {
                    log::warn!("Ignoring drift: {}", err);
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Descriptors to execute, in execution order.
    async fn select(
        &self,
        ledger: &Ledger<'_>,
        direction: Direction,
        target: Option<&MigrationId>,
    ) -> EngineResult<Vec<&'a MigrationDescriptor>> {
        let target = match target {
            Some(id) => Some(&self.catalog.find(id)?.id),
            None => None,
        };
        let applied = ledger.applied_ids().await?;
        match direction {
            Direction::Up => Ok(self.pending(&applied, target.or(self.catalog.latest()))),
            Direction::Down => self.to_revert(&applied, target),
        }
    }

    fn pending(
        &self,
        applied: &BTreeSet<MigrationId>,
        target: Option<&MigrationId>,
    ) -> Vec<&'a MigrationDescriptor> {
        let Some(target) = target else {
            return Vec::new();
        };
        let high_water = applied.iter().next_back();
        let catalog: &'a Catalog = self.catalog;

        let mut pending = Vec::new();
        for desc in catalog.list() {
            if &desc.id > target {
                break;
            }
            if applied.contains(&desc.id) {
                continue;
            }
            if let Some(max) = high_water {
                if &desc.id < max {
                    log::warn!(
                        "Skipping out-of-order migration {} ({}): {} is already applied",
                        desc.id,
                        desc.name,
                        max
                    );
                    continue;
                }
            }
            pending.push(desc);
        }
        pending
    }

    fn to_revert(
        &self,
        applied: &BTreeSet<MigrationId>,
        target: Option<&MigrationId>,
    ) -> EngineResult<Vec<&'a MigrationDescriptor>> {
        let catalog: &'a Catalog = self.catalog;
        applied
            .iter()
            .rev()
            .filter(|id| target.map_or(true, |t| *id > t))
            .map(|id| catalog.find(id).map_err(EngineError::from))
            .collect()
    }

    /// Run one migration in its own transaction.
    async fn execute(
        &self,
        ledger: &Ledger<'_>,
        desc: &MigrationDescriptor,
        direction: Direction,
    ) -> EngineResult<ExecutedMigration> {
        let started = Instant::now();
        log::debug!("Migrating {} {} ({})", direction, desc.id, desc.name);

        self.db.begin().await?;
        let outcome = self.execute_in_transaction(ledger, desc, direction).await;
        match outcome {
            Ok(()) => {
                if let Err(err) = self.db.commit().await {
                    self.rollback(desc).await;
                    return Err(err.into());
                }
            }
            Err(err) => {
                self.rollback(desc).await;
                return Err(err);
            }
        }

        let elapsed = started.elapsed();
        log::debug!(
            "Migrated {} {} in {:.1}ms",
            direction,
            desc.id,
            elapsed.as_secs_f64() * 1000.0
        );
        Ok(ExecutedMigration {
            id: desc.id.clone(),
            name: desc.name.clone(),
            operations: direction.operations(desc).len(),
            elapsed,
        })
    }

    async fn execute_in_transaction(
        &self,
        ledger: &Ledger<'_>,
        desc: &MigrationDescriptor,
        direction: Direction,
    ) -> EngineResult<()> {
        for (index, op) in direction.operations(desc).iter().enumerate() {
            let sql = op.to_sql();
            log::debug!("  [{}] {}", index, sql);
            self.db
                .execute_batch(&sql)
                .await
                .map_err(|source| EngineError::OperationExecution {
                    id: desc.id.to_string(),
                    direction,
                    index,
                    operation: op.to_string(),
                    source,
                })?;
        }

        let checksum = desc.checksum();
        match direction {
            Direction::Up => ledger.record_applied(&desc.id, &desc.name, &checksum).await,
            Direction::Down => ledger.record_rolled_back(&desc.id).await,
        }
    }

    async fn rollback(&self, desc: &MigrationDescriptor) {
        if let Err(err) = self.db.rollback().await {
            log::warn!("Rollback of migration {} failed: {}", desc.id, err);
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
