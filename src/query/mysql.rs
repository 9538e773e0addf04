//! MySQL query factory.
//!
//! MySQL has no cascading truncate, so DELETE stays a real DELETE and
//! TRUNCATE is bracketed by FOREIGN_KEY_CHECKS toggles. Fake columns draw
//! from the seed table with `ORDER BY RAND() LIMIT 1` subselects; MySQL has
//! no textual cast of the target row, so the deterministic per-row hash
//! index used on PostgreSQL is not expressible here.

use crate::error::AnonymizerError;
use crate::fake::FakeDataType;
use crate::query::{sql_literal, Dialect, QueryFactory, SeedColumns};
use crate::strategy::{ColumnStrategy, TableName, UpdateColumnsStrategy};

pub struct MySqlQueryFactory;

/// Pseudo-random md5 token built from RAND/NOW primitives.
const RAND_MD5: &str = "MD5(FLOOR((NOW() + RAND()) * (RAND() * RAND() / RAND()) + RAND()))";

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
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
        FakeDataType::DateTime => "DATETIME",
    }
}

impl MySqlQueryFactory {
    fn set_fragment(
        &self,
        seed_table: &str,
        column: &str,
        strategy: &ColumnStrategy,
    ) -> Result<String, AnonymizerError> {
        let expression = match strategy {
            ColumnStrategy::Empty => "('')".to_string(),
            ColumnStrategy::UniqueLogin => format!("( SELECT {} )", RAND_MD5),
            ColumnStrategy::UniqueEmail => {
                format!("( SELECT CONCAT({md5}, '@', {md5}, '.com') )", md5 = RAND_MD5)
            }
            ColumnStrategy::Fake(fake) => {
                let mut selected = quote_ident(fake.qualifier());
                if let Some(sql_type) = &fake.sql_type {
                    selected = format!("CAST({} AS {})", selected, sql_type);
                }
                format!(
                    "( SELECT {} FROM {} ORDER BY RAND() LIMIT 1)",
                    selected,
                    quote_ident(seed_table)
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

impl QueryFactory for MySqlQueryFactory {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    // FK checks off for the duration, the table graph is being emptied anyway
    fn truncate_table(&self, table: &TableName) -> String {
        format!(
            "SET FOREIGN_KEY_CHECKS=0; TRUNCATE TABLE {}; SET FOREIGN_KEY_CHECKS=1;",
            qualified_name(table)
        )
    }

    fn delete_table(&self, table: &TableName) -> String {
        format!("DELETE FROM {};", qualified_name(table))
    }

    fn create_database(&self, name: &str) -> String {
        format!("CREATE DATABASE {};", quote_ident(name))
    }

    // IF EXISTS drops do not fail on live sessions, no termination needed
    fn drop_database(&self, name: &str) -> Vec<String> {
        vec![format!("DROP DATABASE IF EXISTS {};", quote_ident(name))]
    }

    fn dumpsize_estimate(&self, name: &str) -> String {
        format!(
            "SELECT data_bytes FROM (SELECT SUM(data_length) AS data_bytes FROM information_schema.tables WHERE table_schema = '{}') AS data;",
            name
        )
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
                    quote_ident(qualifier),
                    seed_column_type(fake.generator.data_type())
                )
            })
            .collect();

        Ok(format!(
            "CREATE TABLE {} (`_id` INT NOT NULL AUTO_INCREMENT PRIMARY KEY,{});",
            quote_ident(seed_table),
            column_defs.join(",")
        ))
    }

    fn insert_seed_row(&self, seed_table: &str, columns: &SeedColumns<'_>) -> String {
        let names: Vec<String> = columns
            .iter()
            .map(|(qualifier, _)| quote_ident(qualifier))
            .collect();
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
            "UPDATE {} SET {};",
            qualified_name(&strategy.table),
            fragments.join(",")
        )])
    }

    fn drop_seed_table(&self, seed_table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", quote_ident(seed_table))
    }
}
