//! Database trait definitions

use crate::error::DbResult;
use async_trait::async_trait;

/// One result row; every value rendered as text, `None` for NULL.
pub type Row = Vec<Option<String>>;

/// Transactional execution capability consumed by the migration runner.
///
/// Implementations must be Send + Sync for async operation. Transaction
/// control is explicit: statements between [`begin`](Database::begin) and
/// [`commit`](Database::commit) / [`rollback`](Database::rollback) run in one
/// transaction on the same connection.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute a single statement, returns affected rows
    async fn execute(&self, sql: &str) -> DbResult<usize>;

    /// Execute multiple `;`-separated statements
    async fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Run a query and return all rows as text
    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Start a transaction
    async fn begin(&self) -> DbResult<()>;

    /// Commit the open transaction
    async fn commit(&self) -> DbResult<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> DbResult<()>;

    /// Check if a table or view exists (optionally schema-qualified)
    async fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Check if `table` has a column named `column`
    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}

/// Named advisory lock capability.
///
/// Locks are owned by the handle that took them: a second handle on the same
/// database cannot take a lock the first one holds.
#[async_trait]
pub trait DatabaseLock: Send + Sync {
    /// Try to take `name` once without waiting; `false` if another holder has it
    async fn try_acquire_lock(&self, name: &str) -> DbResult<bool>;

    /// Release `name` if this handle holds it
    async fn release_lock(&self, name: &str) -> DbResult<()>;
}
