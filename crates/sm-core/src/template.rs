//! Reusable column sets spliced into `create_table` definitions.
//!
//! Tables in a schema often share bookkeeping columns (creation and update
//! stamps, soft-delete flags). Descriptor files name a template instead of
//! repeating the columns; the loader appends the template's columns after the
//! table's own columns, in the order the templates are listed.

use crate::error::{CoreError, CoreResult};
use crate::operation::ColumnDef;
use std::collections::{HashMap, HashSet};

/// Name of the built-in audit/soft-delete template.
pub const AUDIT_TEMPLATE: &str = "audit";

/// Columns of the built-in `audit` template.
pub fn audit_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("CreatedAt", "timestamp with time zone", false),
        ColumnDef::new("UpdatedAt", "timestamp with time zone", true),
        ColumnDef::new("CreatedBy", "text", true),
        ColumnDef::new("UpdatedBy", "text", true),
        ColumnDef::new("IsDeleted", "boolean", false),
    ]
}

/// Named column templates available to descriptor files.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<String, Vec<ColumnDef>>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateSet {
    /// Only the built-in templates.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(AUDIT_TEMPLATE.to_string(), audit_columns());
        Self { templates }
    }

    /// Built-in templates plus `configured`, which win on name clashes.
    pub fn with_overrides(configured: &HashMap<String, Vec<ColumnDef>>) -> Self {
        let mut set = Self::builtin();
        for (name, columns) in configured {
            set.templates.insert(name.clone(), columns.clone());
        }
        set
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Option<&[ColumnDef]> {
        self.templates.get(name).map(Vec::as_slice)
    }

    /// Append the named templates to `columns`.
    ///
    /// Fails on unknown template names and on column names that appear more
    /// than once in the result.
    pub fn splice(
        &self,
        id: &str,
        table: &str,
        mut columns: Vec<ColumnDef>,
        names: &[String],
    ) -> CoreResult<Vec<ColumnDef>> {
        for name in names {
            let template = self.get(name).ok_or_else(|| CoreError::UnknownTemplate {
                id: id.to_string(),
                template: name.clone(),
            })?;
            columns.extend(template.iter().cloned());
        }

        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(CoreError::DuplicateColumn {
                    id: id.to_string(),
                    table: table.to_string(),
                    column: col.name.clone(),
                });
            }
        }
        Ok(columns)
    }
}
