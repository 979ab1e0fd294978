use super::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn global(project_dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: project_dir.to_path_buf(),
        config: None,
        database: None,
    }
}

#[test]
fn test_format_table_aligns_columns() {
    let table = format_table(
        &["ID", "STATE"],
        &[
            vec!["20260206003331".to_string(), "applied".to_string()],
            vec!["1".to_string(), "pending".to_string()],
        ],
    );
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "ID              STATE");
    assert_eq!(lines[1], "--------------  -------");
    assert_eq!(lines[2], "20260206003331  applied");
    assert_eq!(lines[3], "1               pending");
}

#[test]
fn test_parse_target() {
    assert_eq!(parse_target(None).unwrap(), None);
    assert_eq!(
        parse_target(Some("20260206003331")).unwrap(),
        Some(MigrationId::new("20260206003331"))
    );
    assert!(parse_target(Some("  ")).is_err());
}

#[test]
fn test_load_project_without_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let project = load_project(&global(dir.path())).unwrap();
    assert_eq!(project.config.ledger_table, "_schema_migrations");
    assert_eq!(project.migrations_dir(), dir.path().join("migrations"));
}

#[test]
fn test_load_project_explicit_config_and_database_override() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("custom.yml");
    fs::write(
        &config_path,
        "migrations_dir: db/migrations\nledger_table: history\nallow_drift: false\n",
    )
    .unwrap();

    let mut args = global(dir.path());
    args.config = Some(config_path);
    args.database = Some(":memory:".to_string());

    let project = load_project(&args).unwrap();
    assert_eq!(project.config.ledger_table, "history");
    assert_eq!(project.config.database, ":memory:");
    assert_eq!(project.migrations_dir(), dir.path().join("db/migrations"));

    let options = runner_options(&project, true);
    assert!(options.allow_drift);
    assert_eq!(options.ledger_table, "history");
}

#[test]
fn test_load_project_rejects_unknown_keys() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("schemata.yml"), "databse: typo.duckdb\n").unwrap();
    assert!(load_project(&global(dir.path())).is_err());
}
