use super::*;
use sm_core::{ColumnDef, CoreError};
use sm_db::DuckDbBackend;

fn id(s: &str) -> MigrationId {
    MigrationId::new(s)
}

fn create_table(migration: &str, table: &str) -> MigrationDescriptor {
    MigrationDescriptor::reversible(
        id(migration),
        format!("create_{table}"),
        vec![Operation::CreateTable {
            table: table.to_string(),
            columns: vec![
                ColumnDef::new("Id", "uuid", false),
                ColumnDef::new("CreatedAt", "timestamptz", false),
            ],
            primary_key: vec!["Id".to_string()],
        }],
    )
    .unwrap()
}

/// Keyless table, so later migrations can add and drop its columns.
fn create_plain_table(migration: &str, table: &str) -> MigrationDescriptor {
    MigrationDescriptor::reversible(
        id(migration),
        format!("create_{table}"),
        vec![Operation::CreateTable {
            table: table.to_string(),
            columns: vec![ColumnDef::new("Id", "uuid", true)],
            primary_key: vec![],
        }],
    )
    .unwrap()
}

fn add_column_op(table: &str, column: &str, data_type: &str) -> Operation {
    Operation::AddColumn {
        table: table.to_string(),
        column: column.to_string(),
        data_type: data_type.to_string(),
        nullable: true,
        default: None,
    }
}

fn add_column(migration: &str, table: &str, column: &str) -> MigrationDescriptor {
    MigrationDescriptor::reversible(
        id(migration),
        format!("add_{column}"),
        vec![add_column_op(table, column, "text")],
    )
    .unwrap()
}

fn options() -> RunnerOptions {
    RunnerOptions {
        lock_timeout: Duration::from_millis(100),
        ..RunnerOptions::default()
    }
}

async fn applied(db: &DuckDbBackend) -> Vec<String> {
    Ledger::new(db, "_schema_migrations")
        .unwrap()
        .applied_ids()
        .await
        .unwrap()
        .into_iter()
        .map(MigrationId::into_inner)
        .collect()
}

/// Table without a key, so columns can be added and dropped freely.
async fn plataformas(db: &DuckDbBackend) {
    db.execute_batch(r#"CREATE TABLE "PlataformasEleitorais" ("Id" uuid, "Titulo" text)"#)
        .await
        .unwrap();
}

fn scenario_catalog() -> Catalog {
    Catalog::new([
        create_table("20260206003331", "Configuracoes"),
        add_column("20260206142412", "PlataformasEleitorais", "ArquivoUrl"),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_up_then_down_to_first_keeps_first_only() {
    let db = DuckDbBackend::in_memory().unwrap();
    plataformas(&db).await;
    let catalog = scenario_catalog();
    let runner = Runner::new(&db, &catalog, options());

    let report = runner.up_to(None).await.unwrap();
    assert_eq!(report.direction, Direction::Up);
    assert_eq!(report.ids(), vec!["20260206003331", "20260206142412"]);
    assert_eq!(report.operations_executed(), 2);
    assert_eq!(applied(&db).await, vec!["20260206003331", "20260206142412"]);
    assert!(db.relation_exists("Configuracoes").await.unwrap());
    assert!(db
        .column_exists("PlataformasEleitorais", "ArquivoUrl")
        .await
        .unwrap());

    let report = runner.down_to(Some(&id("20260206003331"))).await.unwrap();
    assert_eq!(report.direction, Direction::Down);
    assert_eq!(report.ids(), vec!["20260206142412"]);
    assert_eq!(applied(&db).await, vec!["20260206003331"]);
    assert!(!db
        .column_exists("PlataformasEleitorais", "ArquivoUrl")
        .await
        .unwrap());
    assert!(db.column_exists("PlataformasEleitorais", "Titulo").await.unwrap());
    assert!(db.relation_exists("Configuracoes").await.unwrap());
}

#[tokio::test]
async fn test_second_up_runs_nothing() {
    let db = DuckDbBackend::in_memory().unwrap();
    plataformas(&db).await;
    let catalog = scenario_catalog();
    let runner = Runner::new(&db, &catalog, options());

    runner.up_to(None).await.unwrap();
    let again = runner.up_to(None).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(again.operations_executed(), 0);
}

#[tokio::test]
async fn test_status_after_clean_up_has_nothing_pending() {
    let db = DuckDbBackend::in_memory().unwrap();
    plataformas(&db).await;
    let catalog = scenario_catalog();
    let runner = Runner::new(&db, &catalog, options());

    let before = runner.status().await.unwrap();
    assert_eq!(before.pending_count(), 2);
    assert_eq!(before.applied_count(), 0);

    runner.up_to(None).await.unwrap();
    let after = runner.status().await.unwrap();
    assert_eq!(after.applied_count(), 2);
    assert_eq!(after.pending_count(), 0);
    assert_eq!(after.drifted_count(), 0);
    assert!(after.orphaned.is_empty());
    assert!(after
        .migrations
        .iter()
        .all(|m| m.applied_at.is_some()));
}

#[tokio::test]
async fn test_failing_operation_rolls_back_its_migration_only() {
    let db = DuckDbBackend::in_memory().unwrap();
    let broken = MigrationDescriptor::new(
        id("2"),
        "broken",
        vec![
            add_column_op("First", "Extra", "text"),
            add_column_op("Missing", "Oops", "text"),
        ],
        vec![],
    );
    let catalog = Catalog::new([
        create_plain_table("1", "First"),
        broken,
        create_table("3", "Third"),
    ])
    .unwrap();
    let runner = Runner::new(&db, &catalog, options());

    let err = runner.up_to(None).await.unwrap_err();
    match &err {
        EngineError::OperationExecution {
            id,
            direction,
            index,
            ..
        } => {
            assert_eq!(id, "2");
            assert_eq!(*direction, Direction::Up);
            assert_eq!(*index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(err.migration_id(), Some("2"));

    assert_eq!(applied(&db).await, vec!["1"]);
    assert!(db.relation_exists("First").await.unwrap());
    assert!(!db.column_exists("First", "Extra").await.unwrap());
    assert!(!db.relation_exists("Third").await.unwrap());

    // Lock was released on the failure path.
    assert!(db.try_acquire_lock("schemata").await.unwrap());
    db.release_lock("schemata").await.unwrap();
}

#[tokio::test]
async fn test_failing_down_operation_rolls_back_its_revert_only() {
    let db = DuckDbBackend::in_memory().unwrap();
    let lopsided = MigrationDescriptor::new(
        id("2"),
        "lopsided",
        vec![
            add_column_op("First", "Extra", "text"),
            add_column_op("First", "Other", "text"),
        ],
        vec![
            Operation::DropColumn {
                table: "First".to_string(),
                column: "Other".to_string(),
            },
            Operation::DropColumn {
                table: "Missing".to_string(),
                column: "Oops".to_string(),
            },
        ],
    );
    let catalog = Catalog::new([create_plain_table("1", "First"), lopsided]).unwrap();
    let runner = Runner::new(&db, &catalog, options());
    runner.up_to(None).await.unwrap();

    let err = runner.down_to(None).await.unwrap_err();
    match &err {
        EngineError::OperationExecution {
            id,
            direction,
            index,
            ..
        } => {
            assert_eq!(id, "2");
            assert_eq!(*direction, Direction::Down);
            assert_eq!(*index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(applied(&db).await, vec!["1", "2"]);
    assert!(db.column_exists("First", "Other").await.unwrap());
    assert!(db.column_exists("First", "Extra").await.unwrap());
    // The older migration was never reverted.
    assert!(db.relation_exists("First").await.unwrap());

    assert!(db.try_acquire_lock("schemata").await.unwrap());
    db.release_lock("schemata").await.unwrap();
}

#[tokio::test]
async fn test_drift_is_reported_and_gates_runs() {
    let db = DuckDbBackend::in_memory().unwrap();
    let original = Catalog::new([create_table("1", "Alpha")]).unwrap();
    Runner::new(&db, &original, options())
        .up_to(None)
        .await
        .unwrap();

    let mutated = MigrationDescriptor::reversible(
        id("1"),
        "create_Alpha",
        vec![Operation::CreateTable {
            table: "Alpha".to_string(),
            columns: vec![ColumnDef::new("Id", "bigint", false)],
            primary_key: vec!["Id".to_string()],
        }],
    )
    .unwrap();
    let catalog = Catalog::new([mutated, create_table("2", "Beta")]).unwrap();

    let runner = Runner::new(&db, &catalog, options());
    let status = runner.status().await.unwrap();
    assert!(status.has_drift());
    assert_eq!(
        status.get(&id("1")).map(|m| m.state),
        Some(MigrationState::Drifted)
    );
    assert_eq!(
        status.get(&id("2")).map(|m| m.state),
        Some(MigrationState::Pending)
    );

    let err = runner.up_to(None).await.unwrap_err();
    assert!(matches!(err, EngineError::Drift { ref id, .. } if id == "1"));
    assert!(matches!(
        runner.plan_up(None).await,
        Err(EngineError::Drift { .. })
    ));
    assert_eq!(applied(&db).await, vec!["1"]);

    let lenient = Runner::new(
        &db,
        &catalog,
        RunnerOptions {
            allow_drift: true,
            ..options()
        },
    );
    let report = lenient.up_to(None).await.unwrap();
    assert_eq!(report.ids(), vec!["2"]);
}

#[tokio::test]
async fn test_down_to_restores_exact_prefix() {
    let ids = ["1", "2", "10", "11"];
    for upper in 0..ids.len() {
        for lower in 0..=upper {
            let db = DuckDbBackend::in_memory().unwrap();
            let catalog = Catalog::new(
                ids.iter()
                    .map(|n| create_table(n, &format!("T{n}"))),
            )
            .unwrap();
            let runner = Runner::new(&db, &catalog, options());

            runner.up_to(Some(&id(ids[upper]))).await.unwrap();
            assert_eq!(applied(&db).await, ids[..=upper].to_vec());

            runner.down_to(Some(&id(ids[lower]))).await.unwrap();
            assert_eq!(applied(&db).await, ids[..=lower].to_vec());
            for n in &ids[lower + 1..] {
                assert!(!db.relation_exists(&format!("T{n}")).await.unwrap());
            }
        }
    }
}

#[tokio::test]
async fn test_down_to_initial_reverts_everything_newest_first() {
    let db = DuckDbBackend::in_memory().unwrap();
    let catalog = Catalog::new([
        create_plain_table("1", "Parent"),
        add_column("2", "Parent", "Label"),
        add_column("3", "Parent", "Notes"),
    ])
    .unwrap();
    let runner = Runner::new(&db, &catalog, options());
    runner.up_to(None).await.unwrap();

    let report = runner.down_to(None).await.unwrap();
    assert_eq!(report.ids(), vec!["3", "2", "1"]);
    assert!(applied(&db).await.is_empty());
    assert!(!db.relation_exists("Parent").await.unwrap());
}

#[tokio::test]
async fn test_lock_held_elsewhere_times_out() {
    let db = DuckDbBackend::in_memory().unwrap();
    let other = db.try_clone().unwrap();
    assert!(other.try_acquire_lock("schemata").await.unwrap());

    let catalog = Catalog::new([create_table("1", "Alpha")]).unwrap();
    let runner = Runner::new(&db, &catalog, options());
    let err = runner.up_to(None).await.unwrap_err();
    assert!(matches!(err, EngineError::LockTimeout { ref name, .. } if name == "schemata"));
    assert!(!db.relation_exists("Alpha").await.unwrap());

    other.release_lock("schemata").await.unwrap();
    assert_eq!(runner.up_to(None).await.unwrap().ids(), vec!["1"]);
}

#[tokio::test]
async fn test_orphaned_entries_are_reported_and_block_full_revert() {
    let db = DuckDbBackend::in_memory().unwrap();
    let full = Catalog::new([create_table("1", "Alpha"), create_table("2", "Beta")]).unwrap();
    Runner::new(&db, &full, options()).up_to(None).await.unwrap();

    let partial = Catalog::new([create_table("1", "Alpha")]).unwrap();
    let runner = Runner::new(&db, &partial, options());
    let status = runner.status().await.unwrap();
    assert_eq!(status.applied_count(), 1);
    assert_eq!(status.orphaned.len(), 1);
    assert_eq!(status.orphaned[0].migration_id, "2");

    let err = runner.down_to(None).await.unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::NotFound { ref id }) if id == "2"));
    assert_eq!(applied(&db).await, vec!["1", "2"]);
    assert!(db.relation_exists("Alpha").await.unwrap());
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let db = DuckDbBackend::in_memory().unwrap();
    let catalog = Catalog::new([create_table("1", "Alpha")]).unwrap();
    let runner = Runner::new(&db, &catalog, options());

    assert!(matches!(
        runner.up_to(Some(&id("999"))).await,
        Err(EngineError::Core(CoreError::NotFound { .. }))
    ));
    assert!(matches!(
        runner.down_to(Some(&id("999"))).await,
        Err(EngineError::Core(CoreError::NotFound { .. }))
    ));
    assert!(applied(&db).await.is_empty());
}

#[tokio::test]
async fn test_target_below_high_water_applies_nothing() {
    let db = DuckDbBackend::in_memory().unwrap();
    let catalog = Catalog::new([create_table("1", "Alpha"), create_table("2", "Beta")]).unwrap();
    let runner = Runner::new(&db, &catalog, options());
    runner.up_to(None).await.unwrap();

    assert!(runner.up_to(Some(&id("1"))).await.unwrap().is_empty());
    assert_eq!(applied(&db).await, vec!["1", "2"]);
}

#[tokio::test]
async fn test_out_of_order_migration_is_skipped_and_pending() {
    let db = DuckDbBackend::in_memory().unwrap();
    let first = Catalog::new([create_table("1", "Alpha"), create_table("3", "Gamma")]).unwrap();
    Runner::new(&db, &first, options()).up_to(None).await.unwrap();

    let late = Catalog::new([
        create_table("1", "Alpha"),
        create_table("2", "Beta"),
        create_table("3", "Gamma"),
    ])
    .unwrap();
    let runner = Runner::new(&db, &late, options());
    assert!(runner.up_to(None).await.unwrap().is_empty());
    assert!(!db.relation_exists("Beta").await.unwrap());

    let status = runner.status().await.unwrap();
    assert_eq!(
        status.get(&id("2")).map(|m| m.state),
        Some(MigrationState::Pending)
    );
}

#[tokio::test]
async fn test_plans_render_sql_without_executing() {
    let db = DuckDbBackend::in_memory().unwrap();
    plataformas(&db).await;
    let catalog = scenario_catalog();
    let runner = Runner::new(&db, &catalog, options());

    let plan = runner.plan_up(None).await.unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].direction, Direction::Up);
    assert!(plan[0].statements[0].starts_with(r#"CREATE TABLE "Configuracoes""#));
    assert_eq!(
        plan[1].statements,
        vec![r#"ALTER TABLE "PlataformasEleitorais" ADD COLUMN "ArquivoUrl" text"#]
    );
    assert!(applied(&db).await.is_empty());
    assert!(!db.relation_exists("Configuracoes").await.unwrap());

    runner.up_to(None).await.unwrap();
    let plan = runner.plan_down(Some(&id("20260206003331"))).await.unwrap();
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].direction, Direction::Down);
    assert_eq!(
        plan[0].statements,
        vec![r#"ALTER TABLE "PlataformasEleitorais" DROP COLUMN "ArquivoUrl""#]
    );
    assert_eq!(applied(&db).await.len(), 2);
}

#[test]
fn test_options_follow_config() {
    let mut config = Config::default();
    config.ledger_table = "ledger".to_string();
    config.lock.name = "deploy".to_string();
    config.lock.timeout_secs = 5;
    config.allow_drift = true;

    let options = RunnerOptions::from_config(&config);
    assert_eq!(options.ledger_table, "ledger");
    assert_eq!(options.lock_name, "deploy");
    assert_eq!(options.lock_timeout, Duration::from_secs(5));
    assert!(options.allow_drift);
}
