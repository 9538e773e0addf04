//! CLI handler for the validate command.

use crate::provider::{compile_run, SeedTableName};
use crate::query::Dialect;
use crate::strategy::{load_strategy_file, TableStrategy};
use std::path::Path;

pub fn run(strategy_path: &Path, db_type: Option<&str>) -> anyhow::Result<()> {
    let strategy = load_strategy_file(strategy_path)?;

    let mut truncates = 0usize;
    let mut deletes = 0usize;
    let mut updates = 0usize;
    for table in &strategy.tables {
        match table {
            TableStrategy::Truncate(_) => truncates += 1,
            TableStrategy::Delete(_) => deletes += 1,
            TableStrategy::UpdateColumns(_) => updates += 1,
        }
    }

    println!(
        "{}: {} tables ({} truncate, {} delete, {} update), {} distinct fake columns",
        strategy_path.display(),
        strategy.tables.len(),
        truncates,
        deletes,
        updates,
        strategy.fake_columns().len()
    );

    // Unknown strategy kinds only surface when a dialect compiles them.
    if let Some(name) = db_type {
        let dialect = Dialect::from_name(name).ok_or_else(|| {
            anyhow::anyhow!("Unknown database type: {}. Use: mysql, postgres, mssql", name)
        })?;
        compile_run(
            dialect.factory(),
            &strategy,
            &SeedTableName::new("seed_table"),
            1,
        )?;
        println!("compiles for {}", dialect.name());
    }

    Ok(())
}
