//! End-to-end strategy tests: YAML file on disk through to compiled SQL.

use sql_anonymizer::provider::{compile_run, SeedTableName};
use sql_anonymizer::query::Dialect;
use sql_anonymizer::strategy::load_strategy_file;
use std::io::Write;
use tempfile::NamedTempFile;

const STRATEGY: &str = r#"
tables:
  accounts:
    columns:
      email: unique_email
      name: first_name
      bio: empty
  orders:
    columns:
      shipping_name: first_name
  sessions: truncate
  audit_log: delete
"#;

fn strategy_file(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_file_to_postgres_statements() {
    let file = strategy_file(STRATEGY);
    let strategy = load_strategy_file(file.path()).unwrap();

    let run = compile_run(
        Dialect::Postgres.factory(),
        &strategy,
        &SeedTableName::new("seed_table"),
        2,
    )
    .unwrap();

    // first_name appears in two tables but seeds a single column
    assert_eq!(
        run.seed_setup[0],
        "CREATE TABLE \"seed_table\" (_id SERIAL NOT NULL PRIMARY KEY,first_name VARCHAR(65535));"
    );
    assert_eq!(run.seed_setup.len(), 3);

    assert_eq!(run.table_statements.len(), 4);
    assert!(run.table_statements[0].starts_with("UPDATE \"accounts\""));
    assert!(run.table_statements[1].starts_with("UPDATE \"orders\""));
    assert_eq!(
        run.table_statements[2],
        "TRUNCATE TABLE \"sessions\" CASCADE;"
    );
    assert_eq!(
        run.table_statements[3],
        "TRUNCATE TABLE \"audit_log\" CASCADE;"
    );
}

#[test]
fn test_file_to_mysql_statements() {
    let file = strategy_file(STRATEGY);
    let strategy = load_strategy_file(file.path()).unwrap();

    let run = compile_run(
        Dialect::MySql.factory(),
        &strategy,
        &SeedTableName::new("seed_table"),
        1,
    )
    .unwrap();

    assert_eq!(
        run.seed_setup[0],
        "CREATE TABLE `seed_table` (`_id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY,`first_name` VARCHAR(65535));"
    );
    assert_eq!(
        run.table_statements[3],
        "DELETE FROM `audit_log`;"
    );
}

#[test]
fn test_seed_inserts_vary_between_rows() {
    let file = strategy_file(STRATEGY);
    let strategy = load_strategy_file(file.path()).unwrap();

    let run = compile_run(
        Dialect::Postgres.factory(),
        &strategy,
        &SeedTableName::new("seed_table"),
        50,
    )
    .unwrap();

    // real generators back the inserts; 50 identical first names would mean
    // the generator is not being invoked per row
    let inserts: std::collections::HashSet<&String> = run.seed_setup[1..].iter().collect();
    assert!(inserts.len() > 1);
}

#[test]
fn test_missing_file_errors() {
    assert!(load_strategy_file(std::path::Path::new("/nonexistent/strategy.yml")).is_err());
}
