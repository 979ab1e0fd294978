//! sm-core - Core library for Schemata
//!
//! This crate provides migration ids, schema operations, migration
//! descriptors, the descriptor catalog, column templates, checksums, and
//! configuration parsing shared by the engine and the CLI.

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod loading;
pub mod migration_id;
pub mod operation;
pub(crate) mod serde_helpers;
pub mod sql_utils;
pub mod template;

pub use catalog::Catalog;
pub use checksum::compute_checksum;
pub use config::{Config, LockConfig};
pub use descriptor::{Asymmetry, MigrationDescriptor};
pub use error::{CoreError, CoreResult};
pub use migration_id::MigrationId;
pub use operation::{ColumnDef, Operation};
pub use template::TemplateSet;
