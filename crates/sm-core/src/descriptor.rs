//! Migration descriptors: an id paired with forward and reverse operations.

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::migration_id::MigrationId;
use crate::operation::Operation;
use serde::Serialize;
use std::fmt;

/// An immutable, versioned schema change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationDescriptor {
    /// Globally ordered id
    pub id: MigrationId,

    /// Human-readable label
    pub name: String,

    /// Operations applied on forward migration, in order
    pub up: Vec<Operation>,

    /// Operations applied on rollback, in order
    pub down: Vec<Operation>,
}

/// A break in the up/down pairing contract of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asymmetry {
    /// An `up` operation has no counterpart in `down`
    MissingInverse { index: usize, operation: Operation },

    /// A `down` operation undoes nothing in `up`
    UnmatchedDown { index: usize, operation: Operation },
}

impl fmt::Display for Asymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asymmetry::MissingInverse { index, operation } => {
                write!(f, "up[{index}] ({operation}) is never undone in down")
            }
            Asymmetry::UnmatchedDown { index, operation } => {
                write!(f, "down[{index}] ({operation}) has no matching up operation")
            }
        }
    }
}

/// True when `down` structurally undoes `up`.
fn undoes(up: &Operation, down: &Operation) -> bool {
    match (up, down) {
        (
            Operation::AddColumn { table, column, .. },
            Operation::DropColumn {
                table: t,
                column: c,
            },
        )
        | (
            Operation::DropColumn { table, column },
            Operation::AddColumn {
                table: t,
                column: c,
                ..
            },
        ) => table == t && column == c,
        (Operation::CreateTable { table, .. }, Operation::DropTable { table: t })
        | (Operation::DropTable { table }, Operation::CreateTable { table: t, .. }) => table == t,
        _ => false,
    }
}

impl MigrationDescriptor {
    /// Build a descriptor with explicit up and down lists.
    pub fn new(
        id: MigrationId,
        name: impl Into<String>,
        up: Vec<Operation>,
        down: Vec<Operation>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            up,
            down,
        }
    }

    /// Build a descriptor whose `down` list is derived from `up`.
    ///
    /// The derived list holds the inverse of each `up` operation in reverse
    /// order. Fails if any `up` operation has no structural inverse.
    pub fn reversible(
        id: MigrationId,
        name: impl Into<String>,
        up: Vec<Operation>,
    ) -> CoreResult<Self> {
        let mut down = Vec::with_capacity(up.len());
        for (index, op) in up.iter().enumerate().rev() {
            let inverse = op.inverse().ok_or_else(|| CoreError::IrreversibleMigration {
                id: id.to_string(),
                index,
                kind: op.kind().to_string(),
            })?;
            down.push(inverse);
        }
        Ok(Self::new(id, name, up, down))
    }

    /// SHA-256 over the rendered `up` and `down` statements.
    ///
    /// The rendering is `up`, each statement with `;` and a newline, then
    /// `down` the same way. Ledger rows store this value, so it must not change.
    ///
    /// Any change to an operation's table, column, type, nullability, default
    /// or key changes the checksum. Renaming the descriptor does not.
    pub fn checksum(&self) -> String {
        let mut canonical = String::from("up\n");
        for op in &self.up {
            canonical.push_str(&op.to_sql());
            canonical.push_str(";\n");
        }
        canonical.push_str("down\n");
        for op in &self.down {
            canonical.push_str(&op.to_sql());
            canonical.push_str(";\n");
        }
        compute_checksum(&canonical)
    }

    /// Validate every operation, reporting the first problem found.
    pub fn validate(&self) -> CoreResult<()> {
        let lists = [("up", &self.up), ("down", &self.down)];
        for (direction, ops) in lists {
            for (index, op) in ops.iter().enumerate() {
                op.validate()
                    .map_err(|message| CoreError::InvalidOperation {
                        id: self.id.to_string(),
                        direction: direction.to_string(),
                        index,
                        message,
                    })?;
            }
        }
        Ok(())
    }

    /// Report breaks in the add/drop pairing between `up` and `down`.
    ///
    /// Order is not checked: independent drops may legitimately run in any
    /// order.
    pub fn asymmetries(&self) -> Vec<Asymmetry> {
        let mut issues = Vec::new();
        for (index, op) in self.up.iter().enumerate() {
            if !self.down.iter().any(|d| undoes(op, d)) {
                issues.push(Asymmetry::MissingInverse {
                    index,
                    operation: op.clone(),
                });
            }
        }
        for (index, op) in self.down.iter().enumerate() {
            if !self.up.iter().any(|u| undoes(u, op)) {
                issues.push(Asymmetry::UnmatchedDown {
                    index,
                    operation: op.clone(),
                });
            }
        }
        issues
    }
}

#[cfg(test)]
#[path = "descriptor_test.rs"]
mod tests;
