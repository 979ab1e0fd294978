//! Up command implementation

use anyhow::Result;
use sm_engine::Runner;

use crate::cli::{GlobalArgs, UpArgs};
use crate::commands::common::{
    load_catalog, load_project, open_database, parse_target, print_plan, print_report,
    runner_options,
};

/// Execute the up command
pub async fn execute(args: &UpArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = load_catalog(&project)?;
    let target = parse_target(args.to.as_deref())?;
    let db = open_database(&project)?;
    let runner = Runner::new(&db, &catalog, runner_options(&project, args.allow_drift));

    if args.dry_run {
        let plan = runner.plan_up(target.as_ref()).await?;
        print_plan(&plan);
        return Ok(());
    }

    let report = runner.up_to(target.as_ref()).await?;
    print_report(&report);
    Ok(())
}
