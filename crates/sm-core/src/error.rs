//! Error types for sm-core

use thiserror::Error;

/// Core error type for Schemata
#[derive(Error, Debug)]
pub enum CoreError {
    /// S001: Two descriptors share the same migration id
    #[error("[S001] Duplicate migration id '{id}' ({first} and {second})")]
    DuplicateId {
        id: String,
        first: String,
        second: String,
    },

    /// S002: Migration id not present in the catalog
    #[error("[S002] Migration not found: {id}")]
    NotFound { id: String },

    /// S003: Migration id is empty or malformed
    #[error("[S003] Invalid migration id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// S004: Descriptor file could not be parsed
    #[error("[S004] Failed to parse migration {path}: {message}")]
    DescriptorParseError { path: String, message: String },

    /// S005: Descriptor references a column template that does not exist
    #[error("[S005] Unknown column template '{template}' in migration {id}")]
    UnknownTemplate { id: String, template: String },

    /// S006: A table definition lists the same column twice
    #[error("[S006] Duplicate column '{column}' in table '{table}' (migration {id})")]
    DuplicateColumn {
        id: String,
        table: String,
        column: String,
    },

    /// S007: `down` omitted but an `up` operation has no structural inverse
    #[error("[S007] Migration {id} has no down operations and operation {index} ({kind}) cannot be inverted")]
    IrreversibleMigration {
        id: String,
        index: usize,
        kind: String,
    },

    /// S008: An operation is malformed (empty names, bad key references)
    #[error("[S008] Invalid operation {direction}[{index}] in migration {id}: {message}")]
    InvalidOperation {
        id: String,
        direction: String,
        index: usize,
        message: String,
    },

    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Failed to parse configuration file
    #[error("[C002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// C003: Invalid configuration value
    #[error("[C003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// IO error with file path context
    #[error("IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
