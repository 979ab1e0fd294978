//! Schema change primitives.
//!
//! An [`Operation`] is one DDL step. Descriptors hold ordered lists of them
//! and the runner executes each one as a single statement.

use crate::serde_helpers::default_true;
use crate::sql_utils::{quote_ident, quote_qualified};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A column definition inside a `create_table` operation or template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// SQL type, emitted verbatim (e.g. `uuid`, `timestamp with time zone`)
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether the column accepts NULL
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Default value as a SQL expression, emitted verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnDef {
    /// Build a column definition without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default: None,
        }
    }

    /// Render `"name" type [NOT NULL] [DEFAULT expr]`.
    pub fn to_sql(&self) -> String {
        column_sql(
            &self.name,
            &self.data_type,
            self.nullable,
            self.default.as_deref(),
        )
    }
}

fn column_sql(name: &str, data_type: &str, nullable: bool, default: Option<&str>) -> String {
    let mut sql = format!("{} {}", quote_ident(name), data_type);
    if !nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(expr) = default {
        sql.push_str(" DEFAULT ");
        sql.push_str(expr);
    }
    sql
}

/// A single schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Operation {
    /// Add a column to an existing table
    AddColumn {
        table: String,
        column: String,
        #[serde(rename = "type")]
        data_type: String,
        #[serde(default = "default_true")]
        nullable: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },

    /// Drop a column from an existing table
    DropColumn { table: String, column: String },

    /// Create a table with the given columns and primary key
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        primary_key: Vec<String>,
    },

    /// Drop an existing table
    DropTable { table: String },
}

impl Operation {
    /// Short snake_case name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::AddColumn { .. } => "add_column",
            Operation::DropColumn { .. } => "drop_column",
            Operation::CreateTable { .. } => "create_table",
            Operation::DropTable { .. } => "drop_table",
        }
    }

    /// Table the operation targets.
    pub fn table(&self) -> &str {
        match self {
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::CreateTable { table, .. }
            | Operation::DropTable { table } => table,
        }
    }

    /// Render the operation as one DDL statement.
    pub fn to_sql(&self) -> String {
        match self {
            Operation::AddColumn {
                table,
                column,
                data_type,
                nullable,
                default,
            } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_qualified(table),
                column_sql(column, data_type, *nullable, default.as_deref())
            ),
            Operation::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quote_qualified(table),
                quote_ident(column)
            ),
            Operation::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                let mut parts: Vec<String> = columns.iter().map(ColumnDef::to_sql).collect();
                if !primary_key.is_empty() {
                    let keys: Vec<String> = primary_key.iter().map(|k| quote_ident(k)).collect();
                    parts.push(format!("PRIMARY KEY ({})", keys.join(", ")));
                }
                format!(
                    "CREATE TABLE {} (\n    {}\n)",
                    quote_qualified(table),
                    parts.join(",\n    ")
                )
            }
            Operation::DropTable { table } => format!("DROP TABLE {}", quote_qualified(table)),
        }
    }

    /// The structural inverse, if one can be derived without prior state.
    ///
    /// Drops have no inverse: the dropped definition is not known here.
    pub fn inverse(&self) -> Option<Operation> {
        match self {
            Operation::AddColumn { table, column, .. } => Some(Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            }),
            Operation::CreateTable { table, .. } => Some(Operation::DropTable {
                table: table.clone(),
            }),
            Operation::DropColumn { .. } | Operation::DropTable { .. } => None,
        }
    }

    /// Check names, types and key references for obvious mistakes.
    pub fn validate(&self) -> Result<(), String> {
        if self.table().trim().is_empty() {
            return Err("table name must not be empty".to_string());
        }
        match self {
            Operation::AddColumn {
                column, data_type, ..
            } => {
                if column.trim().is_empty() {
                    return Err("column name must not be empty".to_string());
                }
                if data_type.trim().is_empty() {
                    return Err(format!("column '{column}' has an empty type"));
                }
            }
            Operation::DropColumn { column, .. } => {
                if column.trim().is_empty() {
                    return Err("column name must not be empty".to_string());
                }
            }
            Operation::CreateTable {
                table,
                columns,
                primary_key,
            } => {
                if columns.is_empty() {
                    return Err(format!("table '{table}' has no columns"));
                }
                let mut seen = HashSet::new();
                for col in columns {
                    if col.name.trim().is_empty() {
                        return Err(format!("table '{table}' has a column with an empty name"));
                    }
                    if col.data_type.trim().is_empty() {
                        return Err(format!("column '{}' has an empty type", col.name));
                    }
                    if !seen.insert(col.name.as_str()) {
                        return Err(format!("column '{}' is defined twice", col.name));
                    }
                }
                for key in primary_key {
                    if !seen.contains(key.as_str()) {
                        return Err(format!(
                            "primary key column '{key}' is not a column of '{table}'"
                        ));
                    }
                }
            }
            Operation::DropTable { .. } => {}
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::AddColumn { table, column, .. } => {
                write!(f, "add_column {table}.{column}")
            }
            Operation::DropColumn { table, column } => write!(f, "drop_column {table}.{column}"),
            Operation::CreateTable { table, .. } => write!(f, "create_table {table}"),
            Operation::DropTable { table } => write!(f, "drop_table {table}"),
        }
    }
}

#[cfg(test)]
#[path = "operation_test.rs"]
mod tests;
