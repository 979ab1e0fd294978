//! Configuration types and parsing for schemata.yml

use crate::error::{CoreError, CoreResult};
use crate::operation::ColumnDef;
use crate::sql_utils::is_plain_identifier;
use crate::template::TemplateSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configured database path.
pub const DATABASE_ENV_VAR: &str = "SCHEMATA_DATABASE";

/// Project configuration from schemata.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database path (DuckDB file or `:memory:`)
    #[serde(default = "default_database")]
    pub database: String,

    /// Directory holding migration descriptor files
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Name of the ledger table
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Advisory lock settings
    #[serde(default)]
    pub lock: LockConfig,

    /// Run even when applied migrations have drifted
    #[serde(default)]
    pub allow_drift: bool,

    /// Extra column templates, keyed by name
    #[serde(default)]
    pub templates: HashMap<String, Vec<ColumnDef>>,
}

/// Advisory lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Lock name shared by every runner targeting the same database
    #[serde(default = "default_lock_name")]
    pub name: String,

    /// Maximum time to wait for the lock, in seconds
    #[serde(default = "default_lock_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: default_lock_name(),
            timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl LockConfig {
    /// Lock wait as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            migrations_dir: default_migrations_dir(),
            ledger_table: default_ledger_table(),
            lock: LockConfig::default(),
            allow_drift: false,
            templates: HashMap::new(),
        }
    }
}

fn default_database() -> String {
    "schemata.duckdb".to_string()
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_ledger_table() -> String {
    "_schema_migrations".to_string()
}

fn default_lock_name() -> String {
    "schemata".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `schemata.yml` (or `.yaml`) from a directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("schemata.yml");
        let yaml_path = dir.join("schemata.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Like [`load_from_dir`](Self::load_from_dir), but falls back to
    /// defaults when no config file exists.
    pub fn load_or_default(dir: &Path) -> CoreResult<Self> {
        match Self::load_from_dir(dir) {
            Err(CoreError::ConfigNotFound { .. }) => {
                log::debug!("No schemata.yml in {}, using defaults", dir.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.database.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database cannot be empty".to_string(),
            });
        }
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }
        if !is_plain_identifier(&self.ledger_table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger_table '{}' must be a plain identifier (letters, digits, underscore)",
                    self.ledger_table
                ),
            });
        }
        if self.lock.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lock.name cannot be empty".to_string(),
            });
        }
        for (name, columns) in &self.templates {
            if columns.is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("template '{name}' has no columns"),
                });
            }
        }
        Ok(())
    }

    /// Migrations directory resolved against the project root
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_dir)
    }

    /// Database path resolved against the project root.
    ///
    /// `:memory:` is passed through unchanged.
    pub fn database_path(&self, root: &Path) -> String {
        if self.database == ":memory:" {
            return self.database.clone();
        }
        root.join(&self.database).display().to_string()
    }

    /// Built-in column templates plus those declared here
    pub fn template_set(&self) -> TemplateSet {
        TemplateSet::with_overrides(&self.templates)
    }

    /// Pick the database: CLI flag, then `SCHEMATA_DATABASE`, then config.
    pub fn resolve_database(cli_database: Option<&str>) -> Option<String> {
        cli_database
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV_VAR).ok())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
