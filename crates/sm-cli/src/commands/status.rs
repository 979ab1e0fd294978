//! Status command implementation

use anyhow::{Context, Result};
use sm_engine::{Runner, StatusReport};

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{
    format_table, load_catalog, load_project, open_database, runner_options, ExitCode,
};

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = load_catalog(&project)?;
    let db = open_database(&project)?;
    let report = Runner::new(&db, &catalog, runner_options(&project, false))
        .status()
        .await?;

    match args.output {
        StatusOutput::Table => println!("{}", render_table(&report)),
        StatusOutput::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize status")?
        ),
    }

    if report.has_drift() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

pub(crate) fn render_table(report: &StatusReport) -> String {
    let rows: Vec<Vec<String>> = report
        .migrations
        .iter()
        .map(|m| {
            vec![
                m.id.to_string(),
                m.name.clone(),
                m.state.to_string(),
                m.applied_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let mut out = format_table(&["ID", "NAME", "STATE", "APPLIED AT"], &rows);
    for entry in &report.orphaned {
        out.push_str(&format!(
            "\nwarning: {} {} is recorded as applied but has no migration file",
            entry.migration_id, entry.name
        ));
    }
    out.push_str(&format!(
        "\n\n{} applied, {} pending, {} drifted",
        report.applied_count(),
        report.pending_count(),
        report.drifted_count()
    ));
    out
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
