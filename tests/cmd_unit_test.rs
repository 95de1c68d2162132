//! CLI-level tests: argument wiring and the validate handler.

use clap::CommandFactory;
use sql_masker::cmd::Cli;

#[test]
fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn test_validate_accepts_good_config() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mask.yaml");
    std::fs::write(
        &path,
        r#"
tables:
  - table: t
    columns:
      - name: c
        data_type: varchar(20)
        masking_type: string
"#,
    )
    .unwrap();

    let cli = <Cli as clap::Parser>::try_parse_from([
        "sql-masker",
        "validate",
        path.to_str().unwrap(),
    ])
    .unwrap();
    sql_masker::cmd::run(cli).unwrap();
}

#[test]
fn test_validate_rejects_conflicting_modes() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("mask.yaml");
    std::fs::write(
        &path,
        r#"
tables:
  - table: t
    columns:
      - name: c
        data_type: int
        masking_type: number
        action: { category: number, kind: add, value: 1 }
        composite: { parts: [ { static: "x" } ] }
"#,
    )
    .unwrap();

    let cli = <Cli as clap::Parser>::try_parse_from([
        "sql-masker",
        "validate",
        path.to_str().unwrap(),
    ])
    .unwrap();
    assert!(sql_masker::cmd::run(cli).is_err());
}

#[test]
fn test_schema_subcommand_lists_names() {
    let cli =
        <Cli as clap::Parser>::try_parse_from(["sql-masker", "schema"]).unwrap();
    sql_masker::cmd::run(cli).unwrap();

    let cli =
        <Cli as clap::Parser>::try_parse_from(["sql-masker", "schema", "nope"]).unwrap();
    assert!(sql_masker::cmd::run(cli).is_err());
}
