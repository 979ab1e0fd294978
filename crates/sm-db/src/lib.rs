//! sm-db - Database boundary for Schemata
//!
//! This crate provides the `Database` (transactional execution) and
//! `DatabaseLock` (named advisory locks) traits consumed by the migration
//! engine, and their DuckDB implementation.

pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, DatabaseLock, Row};
