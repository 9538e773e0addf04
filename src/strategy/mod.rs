//! Declarative anonymization strategy model.
//!
//! Pure data: what to do to each table and column. Construction validates
//! structural shape only; whether a column strategy kind is actually
//! supported is dialect-dependent and decided by the query factories at SQL
//! compile time.

mod config;

pub use config::{load_strategy_file, parse_strategy};

use crate::fake::GeneratorRef;

/// A table name, optionally schema-qualified. Quoting is the query
/// factories' job; the model stores raw identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Split a `schema.table` key from a strategy file. A bare name has no
    /// schema; only the first dot separates.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('.') {
            Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
                Self::with_schema(schema, name)
            }
            _ => Self::new(raw),
        }
    }
}

/// How to rewrite one column within an UPDATE.
#[derive(Debug, Clone)]
pub enum ColumnStrategy {
    /// Replace with a value drawn from the seed table.
    Fake(FakeColumnStrategy),
    /// Replace with an empty string literal.
    Empty,
    /// Collision-resistant per-row token, no seed table involved.
    UniqueLogin,
    /// Collision-resistant per-row email, no seed table involved.
    UniqueEmail,
    /// Raw SQL expression, inserted verbatim.
    Literal { value: String },
    /// A kind this build does not know. Survives strategy-file parsing so the
    /// active dialect's factory can reject it with a compile-time error.
    Other { kind: String },
}

impl ColumnStrategy {
    /// Kind name used in error messages and strategy files.
    pub fn kind(&self) -> &str {
        match self {
            ColumnStrategy::Fake(_) => "fake_update",
            ColumnStrategy::Empty => "empty",
            ColumnStrategy::UniqueLogin => "unique_login",
            ColumnStrategy::UniqueEmail => "unique_email",
            ColumnStrategy::Literal { .. } => "literal",
            ColumnStrategy::Other { kind } => kind,
        }
    }
}

/// Fake column strategy: generator reference, logical field key, optional
/// SQL type the subselect result is cast to.
#[derive(Debug, Clone)]
pub struct FakeColumnStrategy {
    pub field: String,
    pub sql_type: Option<String>,
    pub generator: GeneratorRef,
}

impl FakeColumnStrategy {
    /// Key under which this strategy's values appear in the seed table.
    /// Strategies sharing a field share a seed column, which is what gives
    /// rows a consistent synthetic identity.
    pub fn qualifier(&self) -> &str {
        &self.field
    }
}

/// Ordered column-name -> strategy map for one UPDATE statement.
///
/// Re-inserting a column replaces the earlier entry in place
/// (last-write-wins, matching map semantics in strategy files).
#[derive(Debug, Clone, Default)]
pub struct ColumnStrategyMap {
    entries: Vec<(String, ColumnStrategy)>,
}

impl ColumnStrategyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, strategy: ColumnStrategy) {
        let column = column.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == column) {
            entry.1 = strategy;
        } else {
            self.entries.push((column, strategy));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnStrategy)> {
        self.entries.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ColumnStrategy)> for ColumnStrategyMap {
    fn from_iter<T: IntoIterator<Item = (String, ColumnStrategy)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (column, strategy) in iter {
            map.insert(column, strategy);
        }
        map
    }
}

/// Column-level rewrites for one table, applied as a single UPDATE.
#[derive(Debug, Clone)]
pub struct UpdateColumnsStrategy {
    pub table: TableName,
    pub columns: ColumnStrategyMap,
}

/// The anonymization treatment for an entire table.
#[derive(Debug, Clone)]
pub enum TableStrategy {
    /// Remove all rows, fast path.
    Truncate(TableName),
    /// Remove all rows. Distinct from Truncate, but dialects with cascading
    /// truncate compile both to the same SQL.
    Delete(TableName),
    UpdateColumns(UpdateColumnsStrategy),
}

impl TableStrategy {
    pub fn table(&self) -> &TableName {
        match self {
            TableStrategy::Truncate(table) | TableStrategy::Delete(table) => table,
            TableStrategy::UpdateColumns(update) => &update.table,
        }
    }
}

/// The full strategy for one anonymization run, in file order.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStrategy {
    pub tables: Vec<TableStrategy>,
}

impl DatabaseStrategy {
    /// Distinct fake column strategies across the whole run, keyed by
    /// qualifier, in first-seen order. This is the seed table's column set:
    /// one seed table serves every fake-bearing UPDATE in the run.
    pub fn fake_columns(&self) -> Vec<(&str, &FakeColumnStrategy)> {
        let mut out: Vec<(&str, &FakeColumnStrategy)> = Vec::new();
        for table in &self.tables {
            let TableStrategy::UpdateColumns(update) = table else {
                continue;
            };
            for (_, strategy) in update.columns.iter() {
                if let ColumnStrategy::Fake(fake) = strategy {
                    if !out.iter().any(|(q, _)| *q == fake.qualifier()) {
                        out.push((fake.qualifier(), fake));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeColumnGenerator, FakeDataType, FakeValue};
    use std::sync::Arc;

    #[derive(Debug)]
    struct StubGenerator;

    impl FakeColumnGenerator for StubGenerator {
        fn data_type(&self) -> FakeDataType {
            FakeDataType::String
        }
        fn value(&self) -> FakeValue {
            FakeValue::String("stub".to_string())
        }
    }

    fn fake(field: &str) -> ColumnStrategy {
        ColumnStrategy::Fake(FakeColumnStrategy {
            field: field.to_string(),
            sql_type: None,
            generator: Arc::new(StubGenerator),
        })
    }

    #[test]
    fn test_table_name_parse() {
        assert_eq!(TableName::parse("users"), TableName::new("users"));
        assert_eq!(
            TableName::parse("public.users"),
            TableName::with_schema("public", "users")
        );
        // only the first dot splits
        assert_eq!(
            TableName::parse("a.b.c"),
            TableName::with_schema("a", "b.c")
        );
    }

    #[test]
    fn test_column_map_preserves_order() {
        let mut map = ColumnStrategyMap::new();
        map.insert("b", ColumnStrategy::Empty);
        map.insert("a", ColumnStrategy::UniqueLogin);
        map.insert("c", ColumnStrategy::UniqueEmail);

        let names: Vec<&str> = map.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_column_map_last_write_wins_in_place() {
        let mut map = ColumnStrategyMap::new();
        map.insert("name", ColumnStrategy::Empty);
        map.insert("email", ColumnStrategy::UniqueEmail);
        map.insert("name", ColumnStrategy::UniqueLogin);

        assert_eq!(map.len(), 2);
        let entries: Vec<(&str, &str)> = map.iter().map(|(name, s)| (name, s.kind())).collect();
        assert_eq!(
            entries,
            vec![("name", "unique_login"), ("email", "unique_email")]
        );
    }

    #[test]
    fn test_fake_columns_deduplicates_by_qualifier() {
        let mut users = ColumnStrategyMap::new();
        users.insert("given_name", fake("first_name"));
        users.insert("surname", fake("last_name"));

        let mut staff = ColumnStrategyMap::new();
        staff.insert("fname", fake("first_name"));
        staff.insert("mail", ColumnStrategy::UniqueEmail);

        let strategy = DatabaseStrategy {
            tables: vec![
                TableStrategy::UpdateColumns(UpdateColumnsStrategy {
                    table: TableName::new("users"),
                    columns: users,
                }),
                TableStrategy::Truncate(TableName::new("logs")),
                TableStrategy::UpdateColumns(UpdateColumnsStrategy {
                    table: TableName::new("staff"),
                    columns: staff,
                }),
            ],
        };

        let qualifiers: Vec<&str> = strategy.fake_columns().iter().map(|(q, _)| *q).collect();
        assert_eq!(qualifiers, vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_fake_columns_empty_when_no_fake_strategies() {
        let strategy = DatabaseStrategy {
            tables: vec![TableStrategy::Delete(TableName::new("audit"))],
        };
        assert!(strategy.fake_columns().is_empty());
    }
}
