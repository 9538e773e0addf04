//! SQL Server query factory.
//!
//! Compile-only dialect: the streaming dump/restore transports do not cover
//! SQL Server (its native path is BACKUP/RESTORE to server-side files), but
//! strategies compile so the statements can be reviewed or executed by other
//! means.

use crate::error::AnonymizerError;
use crate::fake::FakeDataType;
use crate::query::{sql_literal, Dialect, QueryFactory, SeedColumns};
use crate::strategy::{ColumnStrategy, TableName, UpdateColumnsStrategy};

pub struct MssqlQueryFactory;

fn quote_ident(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

fn qualified_name(table: &TableName) -> String {
    match &table.schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
        None => quote_ident(&table.name),
    }
}

fn seed_column_type(data_type: FakeDataType) -> &'static str {
    match data_type {
        FakeDataType::String => "VARCHAR(MAX)",
        FakeDataType::Int => "INT",
        FakeDataType::Date => "DATE",
        FakeDataType::DateTime => "DATETIME2",
    }
}

impl MssqlQueryFactory {
    fn set_fragment(
        &self,
        seed_table: &str,
        column: &str,
        strategy: &ColumnStrategy,
    ) -> Result<String, AnonymizerError> {
        let expression = match strategy {
            ColumnStrategy::Empty => "('')".to_string(),
            ColumnStrategy::UniqueLogin => "( SELECT NEWID() )".to_string(),
            ColumnStrategy::UniqueEmail => {
                "( SELECT CONCAT(NEWID(), '@', NEWID(), '.com') )".to_string()
            }
            ColumnStrategy::Fake(fake) => {
                let mut selected = quote_ident(fake.qualifier());
                if let Some(sql_type) = &fake.sql_type {
                    selected = format!("CAST({} AS {})", selected, sql_type);
                }
                format!(
                    "( SELECT TOP 1 {} FROM {} ORDER BY NEWID())",
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

impl QueryFactory for MssqlQueryFactory {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn truncate_table(&self, table: &TableName) -> String {
        format!("TRUNCATE TABLE {};", qualified_name(table))
    }

    fn delete_table(&self, table: &TableName) -> String {
        format!("DELETE FROM {};", qualified_name(table))
    }

    fn create_database(&self, name: &str) -> String {
        format!("CREATE DATABASE {};", quote_ident(name))
    }

    // rollback live sessions before dropping, the drop fails otherwise
    fn drop_database(&self, name: &str) -> Vec<String> {
        vec![
            format!(
                "ALTER DATABASE {} SET SINGLE_USER WITH ROLLBACK IMMEDIATE;",
                quote_ident(name)
            ),
            format!("DROP DATABASE IF EXISTS {};", quote_ident(name)),
        ]
    }

    fn dumpsize_estimate(&self, name: &str) -> String {
        format!(
            "SELECT SUM(size) * 8 * 1024 FROM sys.master_files WHERE database_id = DB_ID('{}');",
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
            "CREATE TABLE {} ([_id] INT NOT NULL IDENTITY(1,1) PRIMARY KEY,{});",
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
