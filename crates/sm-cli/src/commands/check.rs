//! Check command implementation

use anyhow::Result;

use crate::cli::{CheckArgs, GlobalArgs};
use crate::commands::common::{load_catalog, load_project, ExitCode};

/// Execute the check command
pub async fn execute(_args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = load_catalog(&project)?;

    let mut issues = 0;
    for desc in catalog.list() {
        for asymmetry in desc.asymmetries() {
            println!("warning: {} {}: {}", desc.id, desc.name, asymmetry);
            issues += 1;
        }
    }

    if issues > 0 {
        println!();
        println!("{} migration(s) checked, {} issue(s)", catalog.len(), issues);
        return Err(ExitCode(1).into());
    }
    println!("{} migration(s) checked, no issues", catalog.len());
    Ok(())
}
