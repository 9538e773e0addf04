//! CLI handler for the compile command: render every statement a strategy
//! would produce, for review without touching a database.

use crate::provider::{compile_run, SeedTableName};
use crate::query::Dialect;
use crate::strategy::load_strategy_file;
use std::path::Path;

pub fn run(
    strategy_path: &Path,
    db_type: &str,
    seed_table: &str,
    seed_rows: usize,
    db_name: &str,
) -> anyhow::Result<()> {
    let dialect = Dialect::from_name(db_type).ok_or_else(|| {
        anyhow::anyhow!("Unknown database type: {}. Use: mysql, postgres, mssql", db_type)
    })?;
    let factory = dialect.factory();

    let strategy = load_strategy_file(strategy_path)?;
    let seed_table = SeedTableName::new(seed_table);
    let run = compile_run(factory, &strategy, &seed_table, seed_rows)?;

    println!("-- {} ({} tables)", dialect.name(), strategy.tables.len());
    println!("{}", factory.create_database(db_name));
    for statement in &run.seed_setup {
        println!("{statement}");
    }
    for statement in &run.table_statements {
        println!("{statement}");
    }
    if let Some(teardown) = &run.seed_teardown {
        println!("{teardown}");
    }
    for statement in factory.drop_database(db_name) {
        println!("{statement}");
    }

    Ok(())
}
