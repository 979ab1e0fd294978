//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Schemata - versioned, reversible schema migrations
#[derive(Parser, Debug)]
#[command(name = "migrate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override database path
    #[arg(short, long, global = true, env = "SCHEMATA_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending migrations
    Up(UpArgs),

    /// Revert applied migrations
    Down(DownArgs),

    /// Show applied, pending and drifted migrations
    Status(StatusArgs),

    /// Scaffold a new migration file
    New(NewArgs),

    /// Check migrations for up/down asymmetries
    Check(CheckArgs),
}

/// Arguments for the up command
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Stop after this migration id (default: latest)
    #[arg(long)]
    pub to: Option<String>,

    /// Print the SQL that would run without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Proceed even if applied migrations have drifted
    #[arg(long)]
    pub allow_drift: bool,
}

/// Arguments for the down command
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Revert every migration applied after this id
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    pub to: Option<String>,

    /// Revert every applied migration
    #[arg(long)]
    pub all: bool,

    /// Print the SQL that would run without executing it
    #[arg(long)]
    pub dry_run: bool,

    /// Proceed even if applied migrations have drifted
    #[arg(long)]
    pub allow_drift: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: StatusOutput,
}

/// Status output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
}

/// Arguments for the new command
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Migration name, e.g. "AddAuditoriaLogs" or "add audit logs"
    pub name: String,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {}
