//! Strategy file parsing.
//!
//! The strategy file is YAML: a `tables` map where each value is either the
//! shorthand string `truncate` / `delete`, or a map with a `columns` map.
//! Column values are shorthand strings (`empty`, `unique_login`,
//! `unique_email`, or a fake field key) or a verbose map with `type` and
//! kind-specific keys. Unknown `type` values are kept as
//! [`ColumnStrategy::Other`] so the dialect factory can reject them when SQL
//! is compiled; unknown fake field keys fail here because no generator can
//! supply them.

use crate::error::AnonymizerError;
use crate::fake::FakerColumn;
use crate::strategy::{
    ColumnStrategy, ColumnStrategyMap, DatabaseStrategy, FakeColumnStrategy, TableName,
    TableStrategy, UpdateColumnsStrategy,
};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RawStrategyFile {
    #[serde(default)]
    tables: serde_yaml_ng::Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTable {
    Shorthand(String),
    Update(RawUpdateTable),
}

#[derive(Debug, Deserialize)]
struct RawUpdateTable {
    #[serde(default)]
    schema: Option<String>,
    columns: serde_yaml_ng::Mapping,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Shorthand(String),
    Verbose(RawVerboseColumn),
}

#[derive(Debug, Deserialize)]
struct RawVerboseColumn {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    fake_type: Option<String>,
    #[serde(default)]
    sql_type: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

/// Load and resolve a strategy file.
pub fn load_strategy_file(path: &Path) -> Result<DatabaseStrategy, AnonymizerError> {
    let content = std::fs::read_to_string(path)?;
    parse_strategy(&content)
}

/// Parse strategy YAML into the model. Table and column order follows the
/// document.
pub fn parse_strategy(yaml: &str) -> Result<DatabaseStrategy, AnonymizerError> {
    let raw: RawStrategyFile = serde_yaml_ng::from_str(yaml)?;

    let mut tables = Vec::with_capacity(raw.tables.len());
    for (key, value) in &raw.tables {
        let table_key = key.as_str().ok_or_else(|| {
            AnonymizerError::StrategyFile("table names must be strings".to_string())
        })?;
        let entry: RawTable = serde_yaml_ng::from_value(value.clone()).map_err(|_| {
            AnonymizerError::StrategyFile(format!(
                "table '{}' must be 'truncate', 'delete', or a map with 'columns'",
                table_key
            ))
        })?;
        tables.push(resolve_table(table_key, entry)?);
    }

    Ok(DatabaseStrategy { tables })
}

fn resolve_table(table_key: &str, entry: RawTable) -> Result<TableStrategy, AnonymizerError> {
    match entry {
        RawTable::Shorthand(kind) => match kind.as_str() {
            "truncate" => Ok(TableStrategy::Truncate(TableName::parse(table_key))),
            "delete" => Ok(TableStrategy::Delete(TableName::parse(table_key))),
            other => Err(AnonymizerError::StrategyFile(format!(
                "unknown table strategy '{}' for table '{}'",
                other, table_key
            ))),
        },
        RawTable::Update(update) => {
            if update.columns.is_empty() {
                return Err(AnonymizerError::StrategyFile(format!(
                    "table '{}' has an empty 'columns' map",
                    table_key
                )));
            }

            let table = match update.schema {
                Some(schema) => TableName::with_schema(schema, table_key),
                None => TableName::parse(table_key),
            };

            let mut columns = ColumnStrategyMap::new();
            for (key, value) in &update.columns {
                let column = key.as_str().ok_or_else(|| {
                    AnonymizerError::StrategyFile(format!(
                        "column names in table '{}' must be strings",
                        table_key
                    ))
                })?;
                let entry: RawColumn =
                    serde_yaml_ng::from_value(value.clone()).map_err(|_| {
                        AnonymizerError::StrategyFile(format!(
                            "column '{}' in table '{}' must be a string or a map with 'type'",
                            column, table_key
                        ))
                    })?;
                columns.insert(column, resolve_column(column, entry)?);
            }

            Ok(TableStrategy::UpdateColumns(UpdateColumnsStrategy {
                table,
                columns,
            }))
        }
    }
}

fn resolve_column(column: &str, entry: RawColumn) -> Result<ColumnStrategy, AnonymizerError> {
    match entry {
        RawColumn::Shorthand(kind) => match kind.as_str() {
            "empty" => Ok(ColumnStrategy::Empty),
            "unique_login" => Ok(ColumnStrategy::UniqueLogin),
            "unique_email" => Ok(ColumnStrategy::UniqueEmail),
            // anything else is a fake field key
            field => fake_strategy(column, field, None),
        },
        RawColumn::Verbose(verbose) => match verbose.kind.as_str() {
            "empty" => Ok(ColumnStrategy::Empty),
            "unique_login" => Ok(ColumnStrategy::UniqueLogin),
            "unique_email" => Ok(ColumnStrategy::UniqueEmail),
            "literal" => {
                let value = verbose.value.ok_or_else(|| {
                    AnonymizerError::StrategyFile(format!(
                        "literal strategy for column '{}' requires 'value'",
                        column
                    ))
                })?;
                Ok(ColumnStrategy::Literal { value })
            }
            "fake_update" => {
                let field = verbose.fake_type.ok_or_else(|| {
                    AnonymizerError::StrategyFile(format!(
                        "fake_update strategy for column '{}' requires 'fake_type'",
                        column
                    ))
                })?;
                fake_strategy(column, &field, verbose.sql_type)
            }
            // deferred: the dialect factory decides whether this kind exists
            other => Ok(ColumnStrategy::Other {
                kind: other.to_string(),
            }),
        },
    }
}

fn fake_strategy(
    column: &str,
    field: &str,
    sql_type: Option<String>,
) -> Result<ColumnStrategy, AnonymizerError> {
    let generator = FakerColumn::for_field(field).ok_or_else(|| AnonymizerError::UnknownFakeField {
        column: column.to_string(),
        field: field.to_string(),
    })?;
    Ok(ColumnStrategy::Fake(FakeColumnStrategy {
        field: field.to_string(),
        sql_type,
        generator: Arc::new(generator),
    }))
}
