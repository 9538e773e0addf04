//! PostgreSQL query factory.
//!
//! Fake columns are filled from the seed table at a deterministic per-row
//! index: a 32-bit hash of the update target row's text form, modulo the
//! seed row count, 1-based. Every fake column in one UPDATE shares the same
//! hash expression, so one row draws all its fake values from one seed row
//! and keeps an internally consistent synthetic identity.

use crate::error::AnonymizerError;
use crate::fake::FakeDataType;
use crate::query::{sql_literal, Dialect, QueryFactory, SeedColumns};
use crate::strategy::{ColumnStrategy, TableName, UpdateColumnsStrategy};

pub struct PostgresQueryFactory;

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn qualified_name(table: &TableName) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

fn seed_column_type(data_type: FakeDataType) -> &'static str {
    match data_type {
        FakeDataType::String => "VARCHAR(65535)",
        FakeDataType::Int => "INT",
        FakeDataType::Date => "DATE",
        FakeDataType::DateTime => "TIMESTAMP",
    }
}

/// Deterministic 1-based seed row index for the current target row.
fn seed_row_index(seed_table: &str) -> String {
    format!(
        "MOD(ABS(('x' || MD5(updatetarget::text))::bit(32)::int), (SELECT MAX(\"_id\") FROM {seed})) + 1",
        seed = quote_ident(seed_table)
    )
}

impl PostgresQueryFactory {
    fn set_fragment(
        &self,
        seed_table: &str,
        column: &str,
        strategy: &ColumnStrategy,
    ) -> Result<String, AnonymizerError> {
        let expression = match strategy {
            ColumnStrategy::Empty => "('')".to_string(),
            ColumnStrategy::UniqueLogin => {
                "( SELECT md5(random()::text) ORDER BY MD5(\"updatetarget\"::text) LIMIT 1)"
                    .to_string()
            }
            ColumnStrategy::UniqueEmail => {
                "( SELECT CONCAT(md5(random()::text), '@', md5(random()::text), '.com') ORDER BY MD5(\"updatetarget\"::text) LIMIT 1)"
                    .to_string()
            }
            ColumnStrategy::Fake(fake) => {
                let mut selected = quote_ident(fake.qualifier());
                if let Some(sql_type) = &fake.sql_type {
                    selected = format!("{}::{}", selected, sql_type);
                }
                format!(
                    "( SELECT {selected} FROM {seed} WHERE \"_id\"={index})",
                    seed = quote_ident(seed_table),
                    index = seed_row_index(seed_table)
                )
            }
            ColumnStrategy::Literal { value } => value.clone(),
            ColumnStrategy::Other { kind } => {
                return Err(AnonymizerError::UnsupportedColumnStrategy {
                    dialect: self.dialect().name(),
                    column: column.to_string(),
                    kind: kind.clone(),
                });
            }
        };
        Ok(format!("{} = {}", quote_ident(column), expression))
    }
}

impl QueryFactory for PostgresQueryFactory {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn truncate_table(&self, table: &TableName) -> String {
        format!("TRUNCATE TABLE {} CASCADE;", qualified_name(table))
    }

    // postgres truncates cascade, so delete compiles identically
    fn delete_table(&self, table: &TableName) -> String {
        self.truncate_table(table)
    }

    fn create_database(&self, name: &str) -> String {
        format!("CREATE DATABASE {};", name)
    }

    fn drop_database(&self, name: &str) -> Vec<String> {
        vec![
            format!(
                "SELECT pid, pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}' AND pid != pg_backend_pid();",
                name
            ),
            format!("DROP DATABASE IF EXISTS {};", name),
        ]
    }

    // no cheap server-side estimate exists
    fn dumpsize_estimate(&self, _name: &str) -> String {
        "SELECT 1;".to_string()
    }

    fn create_seed_table(
        &self,
        seed_table: &str,
        columns: &SeedColumns<'_>,
    ) -> Result<String, AnonymizerError> {
        if columns.is_empty() {
            return Err(AnonymizerError::EmptySeedTable {
                seed_table: seed_table.to_string(),
            });
        }

        let column_defs: Vec<String> = columns
            .iter()
            .map(|(qualifier, fake)| {
                format!(
                    "{} {}",
                    qualifier,
                    seed_column_type(fake.generator.data_type())
                )
            })
            .collect();

        Ok(format!(
            "CREATE TABLE {} (_id SERIAL NOT NULL PRIMARY KEY,{});",
            quote_ident(seed_table),
            column_defs.join(",")
        ))
    }

    fn insert_seed_row(&self, seed_table: &str, columns: &SeedColumns<'_>) -> String {
        let names: Vec<&str> = columns.iter().map(|(qualifier, _)| *qualifier).collect();
        let values: Vec<String> = columns
            .iter()
            .map(|(_, fake)| sql_literal(&fake.generator.value()))
            .collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({});",
            quote_ident(seed_table),
            names.join(","),
            values.join(",")
        )
    }

    fn update_table(
        &self,
        seed_table: &str,
        strategy: &UpdateColumnsStrategy,
    ) -> Result<Vec<String>, AnonymizerError> {
        if strategy.columns.is_empty() {
            return Ok(Vec::new());
        }

        let fragments = strategy
            .columns
            .iter()
            .map(|(column, column_strategy)| self.set_fragment(seed_table, column, column_strategy))
            .collect::<Result<Vec<String>, AnonymizerError>>()?;

        Ok(vec![format!(
            "UPDATE {} AS \"updatetarget\" SET {};",
            qualified_name(&strategy.table),
            fragments.join(",")
        )])
    }

    fn drop_seed_table(&self, seed_table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", seed_table)
    }
}
