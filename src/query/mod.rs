//! Dialect-specific compilation of strategies into literal SQL.
//!
//! Each factory is pure and stateless: strategy model in, statement text out.
//! The generated text is the wire contract with the database, so formatting
//! (quoting style, terminators, clause order) is pinned by tests per dialect.

pub mod mssql;
pub mod mysql;
pub mod postgres;

pub use mssql::MssqlQueryFactory;
pub use mysql::MySqlQueryFactory;
pub use postgres::PostgresQueryFactory;

use crate::error::AnonymizerError;
use crate::fake::FakeValue;
use crate::strategy::{FakeColumnStrategy, TableName, UpdateColumnsStrategy};

/// A database engine's SQL syntax variant. Closed set, selected at
/// configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
    Mssql,
}

impl Dialect {
    /// Parse a user-facing dialect name, accepting common aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Dialect::MySql),
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "mssql" | "sqlserver" | "sql_server" => Some(Dialect::Mssql),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "postgres",
            Dialect::Mssql => "mssql",
        }
    }

    /// The query factory for this dialect.
    pub fn factory(&self) -> &'static dyn QueryFactory {
        match self {
            Dialect::MySql => &MySqlQueryFactory,
            Dialect::Postgres => &PostgresQueryFactory,
            Dialect::Mssql => &MssqlQueryFactory,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Seed columns in run order: qualifier plus the fake strategy supplying it.
pub type SeedColumns<'a> = [(&'a str, &'a FakeColumnStrategy)];

/// Maps strategy model entities to SQL statement text for one dialect.
///
/// Operations returning `Vec<String>` are ordered, non-reorderable statement
/// sequences (session termination before drop, FK-check bracketing).
pub trait QueryFactory: Sync {
    fn dialect(&self) -> Dialect;

    /// Remove all rows, fast path.
    fn truncate_table(&self, table: &TableName) -> String;

    /// Remove all rows. Compiles identically to truncate on dialects with
    /// cascading truncate support.
    fn delete_table(&self, table: &TableName) -> String;

    fn create_database(&self, name: &str) -> String;

    /// Drop the database. Dialects that cannot drop a database with live
    /// sessions emit a session-termination statement strictly before the
    /// drop.
    fn drop_database(&self, name: &str) -> Vec<String>;

    /// A query whose scalar result estimates dump size in bytes. Progress
    /// display only; dialects without a cheap estimate return a placeholder.
    fn dumpsize_estimate(&self, name: &str) -> String;

    /// DDL for the seed table: synthetic `_id` primary key plus one typed
    /// column per entry, in map order. Errors if `columns` is empty.
    fn create_seed_table(
        &self,
        seed_table: &str,
        columns: &SeedColumns<'_>,
    ) -> Result<String, AnonymizerError>;

    /// One INSERT whose value list invokes every generator once, each
    /// literal escaped per its declared type.
    fn insert_seed_row(&self, seed_table: &str, columns: &SeedColumns<'_>) -> String;

    /// Compile the UPDATE statement(s) for one table. All columns combine
    /// into a single SET clause so fake columns of one row draw from the same
    /// seed row. Unknown strategy kinds fail here, before any SQL is sent.
    fn update_table(
        &self,
        seed_table: &str,
        strategy: &UpdateColumnsStrategy,
    ) -> Result<Vec<String>, AnonymizerError>;

    /// Idempotent; safe even if seed table creation partially failed.
    fn drop_seed_table(&self, seed_table: &str) -> String;
}

/// Escape a generated value as a SQL literal. Strings are single-quoted with
/// embedded quotes doubled, integers are bare, dates/datetimes quoted in ISO
/// form. Identical across the supported dialects.
pub(crate) fn sql_literal(value: &FakeValue) -> String {
    match value {
        FakeValue::Int(n) => n.to_string(),
        FakeValue::String(s) => format!("'{}'", s.replace('\'', "''")),
        FakeValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        FakeValue::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    #[test]
    fn test_dialect_from_name_aliases() {
        assert_eq!(Dialect::from_name("PostgreSQL"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_name("mariadb"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_name("sqlserver"), Some(Dialect::Mssql));
        assert_eq!(Dialect::from_name("oracle"), None);
    }

    #[test]
    fn test_sql_literal_escapes_strings() {
        assert_eq!(
            sql_literal(&FakeValue::String("O'Brien".to_string())),
            "'O''Brien'"
        );
        assert_eq!(sql_literal(&FakeValue::Int(645)), "645");
    }

    #[test]
    fn test_sql_literal_dates() {
        let date = NaiveDate::from_ymd_opt(1984, 3, 7).unwrap();
        assert_eq!(sql_literal(&FakeValue::Date(date)), "'1984-03-07'");

        let dt = NaiveDateTime::new(date, NaiveTime::from_hms_opt(13, 5, 9).unwrap());
        assert_eq!(
            sql_literal(&FakeValue::DateTime(dt)),
            "'1984-03-07 13:05:09'"
        );
    }
}
