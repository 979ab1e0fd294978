//! Descriptor discovery from a migrations directory.
//!
//! Each `*.yml` / `*.yaml` file holds one descriptor:
//!
//! ```yaml
//! id: "20260206142412"
//! name: AddAuditoriaLogsAndNotificacoes
//! up:
//!   - create_table:
//!       table: Notificacoes
//!       columns:
//!         - { name: Id, type: uuid, nullable: false }
//!       templates: [audit]
//!       primary_key: [Id]
//! ```
//!
//! `id` and `name` default to the file stem split at the first `_`
//! (`20260206142412_AddAuditoriaLogs.yml`). An omitted `down` list is derived
//! from `up`.

use crate::catalog::Catalog;
use crate::descriptor::MigrationDescriptor;
use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use crate::operation::{ColumnDef, Operation};
use crate::serde_helpers::default_true;
use crate::template::TemplateSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk form of a descriptor, before templates are resolved.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DescriptorFile {
    #[serde(default)]
    id: Option<MigrationId>,

    #[serde(default)]
    name: Option<String>,

    up: Vec<RawOperation>,

    #[serde(default)]
    down: Option<Vec<RawOperation>>,
}

/// On-disk operation; `create_table` may name column templates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
enum RawOperation {
    AddColumn {
        table: String,
        column: String,
        #[serde(rename = "type")]
        data_type: String,
        #[serde(default = "default_true")]
        nullable: bool,
        #[serde(default)]
        default: Option<String>,
    },
    DropColumn {
        table: String,
        column: String,
    },
    CreateTable {
        table: String,
        #[serde(default)]
        columns: Vec<ColumnDef>,
        #[serde(default)]
        templates: Vec<String>,
        #[serde(default)]
        primary_key: Vec<String>,
    },
    DropTable {
        table: String,
    },
}

impl RawOperation {
    fn resolve(self, id: &str, templates: &TemplateSet) -> CoreResult<Operation> {
        Ok(match self {
            RawOperation::AddColumn {
                table,
                column,
                data_type,
                nullable,
                default,
            } => Operation::AddColumn {
                table,
                column,
                data_type,
                nullable,
                default,
            },
            RawOperation::DropColumn { table, column } => Operation::DropColumn { table, column },
            RawOperation::CreateTable {
                table,
                columns,
                templates: names,
                primary_key,
            } => {
                let columns = templates.splice(id, &table, columns, &names)?;
                Operation::CreateTable {
                    table,
                    columns,
                    primary_key,
                }
            }
            RawOperation::DropTable { table } => Operation::DropTable { table },
        })
    }
}

/// Split `20260206003331_AddColumns` into (`20260206003331`, `AddColumns`).
fn split_stem(stem: &str) -> (&str, &str) {
    match stem.split_once('_') {
        Some((id, name)) => (id, name),
        None => (stem, stem),
    }
}

/// Parse one descriptor from YAML text.
///
/// `stem` is the file stem used for a missing `id` or `name`.
pub fn parse_descriptor(
    content: &str,
    stem: &str,
    templates: &TemplateSet,
) -> CoreResult<MigrationDescriptor> {
    let file: DescriptorFile =
        serde_yaml::from_str(content).map_err(|e| CoreError::DescriptorParseError {
            path: stem.to_string(),
            message: e.to_string(),
        })?;

    let (stem_id, stem_name) = split_stem(stem);
    let id = match file.id {
        Some(id) => id,
        None => MigrationId::parse(stem_id)?,
    };
    let name = file.name.unwrap_or_else(|| stem_name.to_string());

    let up = file
        .up
        .into_iter()
        .map(|op| op.resolve(id.as_str(), templates))
        .collect::<CoreResult<Vec<_>>>()?;

    match file.down {
        Some(down) => {
            let down = down
                .into_iter()
                .map(|op| op.resolve(id.as_str(), templates))
                .collect::<CoreResult<Vec<_>>>()?;
            Ok(MigrationDescriptor::new(id, name, up, down))
        }
        None => MigrationDescriptor::reversible(id, name, up),
    }
}

/// Load one descriptor file.
pub fn load_descriptor(path: &Path, templates: &TemplateSet) -> CoreResult<MigrationDescriptor> {
    let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    parse_descriptor(&content, stem, templates).map_err(|e| match e {
        CoreError::DescriptorParseError { message, .. } => CoreError::DescriptorParseError {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}

/// List descriptor files in `dir` (non-recursive), sorted by file name.
pub fn discover_descriptor_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl Catalog {
    /// Load every descriptor file in `dir`.
    ///
    /// A missing directory yields an empty catalog.
    pub fn load_dir(dir: &Path, templates: &TemplateSet) -> CoreResult<Self> {
        if !dir.exists() {
            log::warn!("Migrations directory not found: {}", dir.display());
            return Ok(Catalog::default());
        }

        let mut descriptors = Vec::new();
        for path in discover_descriptor_files(dir)? {
            log::debug!("Loading migration {}", path.display());
            descriptors.push(load_descriptor(&path, templates)?);
        }
        Catalog::new(descriptors)
    }
}

#[cfg(test)]
#[path = "loading_test.rs"]
mod tests;
