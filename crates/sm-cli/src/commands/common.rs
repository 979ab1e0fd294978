//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use sm_core::{Catalog, Config, MigrationId};
use sm_db::DuckDbBackend;
use sm_engine::{PlannedMigration, RunReport, RunnerOptions};
use std::fmt;
use std::path::PathBuf;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; nothing user-facing to print.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Project root plus its resolved configuration.
#[derive(Debug)]
pub(crate) struct Project {
    pub(crate) root: PathBuf,
    pub(crate) config: Config,
}

impl Project {
    pub(crate) fn migrations_dir(&self) -> PathBuf {
        self.config.migrations_dir_absolute(&self.root)
    }
}

/// Load configuration for the project named by the global arguments.
///
/// `--config` wins over `schemata.yml` in the project directory; a project
/// without either runs on defaults. `--database` / `SCHEMATA_DATABASE`
/// replace the configured database.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = global.project_dir.clone();
    let mut config = match &global.config {
        Some(path) => Config::load(path),
        None => Config::load_or_default(&root),
    }
    .context("Failed to load configuration")?;

    if let Some(database) = Config::resolve_database(global.database.as_deref()) {
        log::debug!("Database overridden: {}", database);
        config.database = database;
    }
    Ok(Project { root, config })
}

/// Load every migration descriptor of the project.
pub(crate) fn load_catalog(project: &Project) -> Result<Catalog> {
    let dir = project.migrations_dir();
    Catalog::load_dir(&dir, &project.config.template_set())
        .with_context(|| format!("Failed to load migrations from {}", dir.display()))
}

/// Open the project database with its lock table next to the ledger.
pub(crate) fn open_database(project: &Project) -> Result<DuckDbBackend> {
    let path = project.config.database_path(&project.root);
    let lock_table = format!("{}_lock", project.config.ledger_table);
    DuckDbBackend::new(&path)
        .and_then(|db| db.with_lock_table(&lock_table))
        .with_context(|| format!("Failed to open database {path}"))
}

/// Runner options from config; `--allow-drift` can only loosen the gate.
pub(crate) fn runner_options(project: &Project, allow_drift: bool) -> RunnerOptions {
    let mut options = RunnerOptions::from_config(&project.config);
    options.allow_drift |= allow_drift;
    options
}

pub(crate) fn parse_target(raw: Option<&str>) -> Result<Option<MigrationId>> {
    raw.map(MigrationId::parse)
        .transpose()
        .context("Invalid --to migration id")
}

/// Print the migrations a dry run would execute.
pub(crate) fn print_plan(plan: &[PlannedMigration]) {
    if plan.is_empty() {
        println!("Nothing to do");
        return;
    }
    for migration in plan {
        println!("-- {} {} ({})", migration.direction, migration.id, migration.name);
        for statement in &migration.statements {
            println!("{statement};");
        }
        println!();
    }
    println!("{} migration(s) would run", plan.len());
}

/// Print what a run executed.
pub(crate) fn print_report(report: &RunReport) {
    if report.is_empty() {
        println!("Nothing to do");
        return;
    }
    for migration in &report.migrations {
        println!(
            "  {} {} {} ({} op(s), {}ms)",
            report.direction,
            migration.id,
            migration.name,
            migration.operations,
            migration.elapsed.as_millis()
        );
    }
    println!();
    println!(
        "{} migration(s) {}, {} operation(s)",
        report.migrations.len(),
        match report.direction {
            sm_engine::Direction::Up => "applied",
            sm_engine::Direction::Down => "reverted",
        },
        report.operations_executed()
    );
}

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Render a left-aligned table: header row, dashes, then data rows.
/// Columns are separated by two spaces.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let widths = calculate_column_widths(headers, rows);
    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.to_vec())];
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(render(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
