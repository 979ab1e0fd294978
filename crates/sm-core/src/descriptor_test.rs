use super::*;
use crate::operation::ColumnDef;

fn add_column(table: &str, column: &str) -> Operation {
    Operation::AddColumn {
        table: table.to_string(),
        column: column.to_string(),
        data_type: "text".to_string(),
        nullable: true,
        default: None,
    }
}

fn drop_column(table: &str, column: &str) -> Operation {
    Operation::DropColumn {
        table: table.to_string(),
        column: column.to_string(),
    }
}

fn create_table(table: &str) -> Operation {
    Operation::CreateTable {
        table: table.to_string(),
        columns: vec![ColumnDef::new("Id", "uuid", false)],
        primary_key: vec!["Id".to_string()],
    }
}

fn drop_table(table: &str) -> Operation {
    Operation::DropTable {
        table: table.to_string(),
    }
}

#[test]
fn test_reversible_derives_down_in_reverse_order() {
    let desc = MigrationDescriptor::reversible(
        MigrationId::new("1"),
        "init",
        vec![
            create_table("Configuracoes"),
            add_column("Configuracoes", "Valor"),
        ],
    )
    .unwrap();
    assert_eq!(
        desc.down,
        vec![
            drop_column("Configuracoes", "Valor"),
            drop_table("Configuracoes")
        ]
    );
}

#[test]
fn test_reversible_rejects_drops() {
    let err = MigrationDescriptor::reversible(
        MigrationId::new("2"),
        "drop",
        vec![add_column("A", "b"), drop_table("Legacy")],
    )
    .unwrap_err();
    match err {
        CoreError::IrreversibleMigration { id, index, kind } => {
            assert_eq!(id, "2");
            assert_eq!(index, 1);
            assert_eq!(kind, "drop_table");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_checksum_stable_across_clones_and_renames() {
    let desc = MigrationDescriptor::reversible(
        MigrationId::new("1"),
        "init",
        vec![create_table("Configuracoes")],
    )
    .unwrap();
    let mut renamed = desc.clone();
    renamed.name = "InitialCreate".to_string();
    assert_eq!(desc.checksum(), renamed.checksum());
    assert_eq!(desc.checksum().len(), 64);
}

#[test]
fn test_checksum_format_is_stable() {
    let desc = MigrationDescriptor::reversible(
        MigrationId::new("20260206142412"),
        "AddArquivoUrl",
        vec![add_column("PlataformasEleitorais", "ArquivoUrl")],
    )
    .unwrap();
    let rendered = "up\n\
        ALTER TABLE \"PlataformasEleitorais\" ADD COLUMN \"ArquivoUrl\" text;\n\
        down\n\
        ALTER TABLE \"PlataformasEleitorais\" DROP COLUMN \"ArquivoUrl\";\n";
    assert_eq!(desc.checksum(), compute_checksum(rendered));
}

#[test]
fn test_checksum_changes_when_operations_change() {
    let desc = MigrationDescriptor::reversible(
        MigrationId::new("1"),
        "init",
        vec![add_column("PlataformasEleitorais", "ArquivoUrl")],
    )
    .unwrap();
    let mut changed = desc.clone();
    if let Operation::AddColumn { nullable, .. } = &mut changed.up[0] {
        *nullable = false;
    }
    assert_ne!(desc.checksum(), changed.checksum());
}

#[test]
fn test_checksum_distinguishes_up_from_down() {
    let a = MigrationDescriptor::new(
        MigrationId::new("1"),
        "a",
        vec![drop_table("X")],
        vec![],
    );
    let b = MigrationDescriptor::new(
        MigrationId::new("1"),
        "a",
        vec![],
        vec![drop_table("X")],
    );
    assert_ne!(a.checksum(), b.checksum());
}

#[test]
fn test_asymmetries_empty_for_paired_descriptor() {
    // Down drops the table first, then columns in up order, as generated
    // migrations commonly do.
    let desc = MigrationDescriptor::new(
        MigrationId::new("20260206003331"),
        "AddMembroChapaSubstituicaoColumns",
        vec![
            add_column("PlataformasEleitorais", "ArquivoUrl"),
            add_column("MembrosChapa", "MotivoSubstituicao"),
            create_table("Configuracoes"),
        ],
        vec![
            drop_table("Configuracoes"),
            drop_column("PlataformasEleitorais", "ArquivoUrl"),
            drop_column("MembrosChapa", "MotivoSubstituicao"),
        ],
    );
    assert!(desc.asymmetries().is_empty());
}

#[test]
fn test_asymmetries_reports_both_directions() {
    let desc = MigrationDescriptor::new(
        MigrationId::new("3"),
        "broken",
        vec![
            add_column("DocumentosChapa", "AnalistaId"),
            create_table("Notificacoes"),
        ],
        vec![
            drop_table("Notificacoes"),
            drop_column("DocumentosChapa", "ParecerAnalise"),
        ],
    );
    let issues = desc.asymmetries();
    assert_eq!(issues.len(), 2);
    assert!(matches!(
        issues[0],
        Asymmetry::MissingInverse { index: 0, .. }
    ));
    assert!(matches!(issues[1], Asymmetry::UnmatchedDown { index: 1, .. }));
    assert!(issues[1].to_string().contains("ParecerAnalise"));
}

#[test]
fn test_drop_in_up_pairs_with_create_in_down() {
    let desc = MigrationDescriptor::new(
        MigrationId::new("4"),
        "drop_legacy",
        vec![drop_table("Legacy")],
        vec![create_table("Legacy")],
    );
    assert!(desc.asymmetries().is_empty());
}

#[test]
fn test_validate_reports_direction_and_index() {
    let desc = MigrationDescriptor::new(
        MigrationId::new("5"),
        "bad",
        vec![add_column("A", "b")],
        vec![drop_column("A", "")],
    );
    match desc.validate().unwrap_err() {
        CoreError::InvalidOperation {
            direction, index, ..
        } => {
            assert_eq!(direction, "down");
            assert_eq!(index, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}
