//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, DatabaseLock, Row};
use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::Connection;
use sm_core::sql_utils::{is_plain_identifier, quote_ident, quote_literal, split_qualified_name};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Default name of the advisory lock table.
pub const DEFAULT_LOCK_TABLE: &str = "_schema_migrations_lock";

/// DuckDB database backend
///
/// Each backend handle has its own lock identity; [`try_clone`](Self::try_clone)
/// opens a second handle on the same database that contends for locks.
///
/// Lock holders are recorded as `<instance>/<handle>`. All handles cloned
/// from one opened database share the instance part. A read-write DuckDB
/// file is open in at most one instance at a time, so a lock row written by
/// any other instance belongs to a process that is gone and is reclaimed.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    instance: String,
    holder: String,
    lock_table: String,
}

impl DuckDbBackend {
    fn from_connection(conn: Connection, instance: String) -> Self {
        let holder = format!("{}/{}", instance, Uuid::new_v4());
        Self {
            conn: Mutex::new(conn),
            instance,
            holder,
            lock_table: DEFAULT_LOCK_TABLE.to_string(),
        }
    }

    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(conn, Uuid::new_v4().to_string()))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::from_connection(conn, Uuid::new_v4().to_string()))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Use `table` for advisory locks instead of the default.
    pub fn with_lock_table(mut self, table: &str) -> DbResult<Self> {
        if !is_plain_identifier(table) {
            return Err(DbError::LockError {
                name: table.to_string(),
                message: "lock table must be a plain identifier".to_string(),
            });
        }
        self.lock_table = table.to_string();
        Ok(self)
    }

    /// Open a second handle on the same database with a fresh lock identity.
    pub fn try_clone(&self) -> DbResult<Self> {
        let conn = self
            .lock_conn()?
            .try_clone()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        let mut clone = Self::from_connection(conn, self.instance.clone());
        clone.lock_table = self.lock_table.clone();
        Ok(clone)
    }

    /// Identity recorded in the lock table while this handle holds a lock.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    fn lock_conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str) -> DbResult<usize> {
        let conn = self.lock_conn()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }

    /// Execute batch SQL synchronously
    fn execute_batch_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    /// Run a transaction-control statement synchronously
    fn transaction_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::TransactionError(format!("{sql} failed: {e}")))
    }

    /// Query rows synchronously
    fn query_rows_sync(&self, sql: &str) -> DbResult<Vec<Row>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let width = row.as_ref().column_count();
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value: Value = row.get(idx)?;
                values.push(value_to_text(value));
            }
            out.push(values);
        }
        Ok(out)
    }

    fn count_sync(&self, sql: &str) -> DbResult<i64> {
        let conn = self.lock_conn()?;
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(|e| DbError::ExecutionError(e.to_string()))
    }

    fn ensure_lock_table(&self) -> DbResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 name        VARCHAR PRIMARY KEY,
                 holder      VARCHAR NOT NULL,
                 acquired_at TIMESTAMP NOT NULL DEFAULT now()
             )",
            quote_ident(&self.lock_table)
        );
        self.execute_batch_sync(&sql)
    }

    /// Delete `name` if its row was written by another database instance.
    fn reclaim_stale_lock(&self, name: &str) -> DbResult<()> {
        let sql = format!(
            "SELECT holder, CAST(acquired_at AS VARCHAR) FROM {} WHERE name = {}",
            quote_ident(&self.lock_table),
            quote_literal(name)
        );
        let rows = self.query_rows_sync(&sql)?;
        let Some(row) = rows.first() else {
            return Ok(());
        };
        let holder = row.first().cloned().flatten().unwrap_or_default();
        if holder.starts_with(&format!("{}/", self.instance)) {
            return Ok(());
        }

        let sql = format!(
            "DELETE FROM {} WHERE name = {} AND holder = {}",
            quote_ident(&self.lock_table),
            quote_literal(name),
            quote_literal(&holder)
        );
        if self.execute_sync(&sql)? > 0 {
            let acquired_at = row.get(1).cloned().flatten().unwrap_or_default();
            log::warn!(
                "Reclaimed stale lock '{}' left by {} at {}",
                name,
                holder,
                acquired_at
            );
        }
        Ok(())
    }
}

/// Render a DuckDB value as text.
fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Boolean(b) => Some(b.to_string()),
        Value::TinyInt(n) => Some(n.to_string()),
        Value::SmallInt(n) => Some(n.to_string()),
        Value::Int(n) => Some(n.to_string()),
        Value::BigInt(n) => Some(n.to_string()),
        Value::HugeInt(n) => Some(n.to_string()),
        Value::UTinyInt(n) => Some(n.to_string()),
        Value::USmallInt(n) => Some(n.to_string()),
        Value::UInt(n) => Some(n.to_string()),
        Value::UBigInt(n) => Some(n.to_string()),
        Value::Float(n) => Some(n.to_string()),
        Value::Double(n) => Some(n.to_string()),
        other => Some(format!("{other:?}")),
    }
}

#[async_trait]
impl Database for DuckDbBackend {
    async fn execute(&self, sql: &str) -> DbResult<usize> {
        self.execute_sync(sql)
    }

    async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.execute_batch_sync(sql)
    }

    async fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>> {
        self.query_rows_sync(sql)
    }

    async fn begin(&self) -> DbResult<()> {
        self.transaction_sync("BEGIN TRANSACTION")
    }

    async fn commit(&self) -> DbResult<()> {
        self.transaction_sync("COMMIT")
    }

    async fn rollback(&self) -> DbResult<()> {
        self.transaction_sync("ROLLBACK")
    }

    async fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified_name(name);
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
            quote_literal(schema),
            quote_literal(table)
        );
        Ok(self.count_sync(&sql)? > 0)
    }

    async fn column_exists(&self, table: &str, column: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified_name(table);
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.columns WHERE table_schema = {} AND table_name = {} AND column_name = {}",
            quote_literal(schema),
            quote_literal(table),
            quote_literal(column)
        );
        Ok(self.count_sync(&sql)? > 0)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl DatabaseLock for DuckDbBackend {
    async fn try_acquire_lock(&self, name: &str) -> DbResult<bool> {
        let lock_err = |e: DbError| DbError::LockError {
            name: name.to_string(),
            message: e.to_string(),
        };
        self.ensure_lock_table().map_err(lock_err)?;
        self.reclaim_stale_lock(name).map_err(lock_err)?;

        let sql = format!(
            "INSERT INTO {} (name, holder) VALUES ({}, {}) ON CONFLICT DO NOTHING",
            quote_ident(&self.lock_table),
            quote_literal(name),
            quote_literal(&self.holder)
        );
        let inserted = self.execute_sync(&sql).map_err(lock_err)?;
        if inserted == 1 {
            log::debug!("Acquired lock '{}' as {}", name, self.holder);
        }
        Ok(inserted == 1)
    }

    async fn release_lock(&self, name: &str) -> DbResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE name = {} AND holder = {}",
            quote_ident(&self.lock_table),
            quote_literal(name),
            quote_literal(&self.holder)
        );
        let deleted = self.execute_sync(&sql).map_err(|e| DbError::LockError {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        if deleted == 0 {
            log::warn!("Lock '{}' was not held by {}", name, self.holder);
        } else {
            log::debug!("Released lock '{}'", name);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
