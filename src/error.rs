//! Error types for strategy compilation and pipeline execution.
//!
//! Compile-time errors (unsupported strategies, empty seed maps) are raised
//! while building SQL, before anything reaches the database. Execution errors
//! abort the current pipeline step and are never retried.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnonymizerError {
    /// A column strategy kind the active dialect's query factory cannot
    /// compile. Detected while building SQL, so no statement is sent.
    #[error("column '{column}' uses strategy kind '{kind}', which is not supported by the {dialect} dialect")]
    UnsupportedColumnStrategy {
        dialect: &'static str,
        column: String,
        kind: String,
    },

    /// Seed table DDL was requested with zero payload columns.
    #[error("seed table '{seed_table}' would have no columns; the strategy contains no fake column strategies")]
    EmptySeedTable { seed_table: String },

    /// A fake column strategy names a field the generator registry cannot supply.
    #[error("unknown fake field '{field}' for column '{column}'")]
    UnknownFakeField { column: String, field: String },

    /// Structural problem in a strategy file (bad shorthand, missing keys).
    #[error("invalid strategy file: {0}")]
    StrategyFile(String),

    #[error("failed to parse strategy file")]
    StrategyParse(#[from] serde_yaml_ng::Error),

    /// A statement failed at the database. `statement` is a truncated summary.
    #[error("database error while executing `{statement}`: {message}")]
    Database { statement: String, message: String },

    /// An external client program (psql, mysqldump, ...) failed.
    #[error("external process `{program}` failed: {message}")]
    Process { program: String, message: String },

    /// The selected dialect has no dump/restore transport.
    #[error("no dump/restore transport is available for the {dialect} dialect")]
    UnsupportedTransport { dialect: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AnonymizerError {
    /// Build a database error, keeping only the head of a long statement so
    /// seed-row INSERTs and multi-column UPDATEs stay readable in logs.
    pub fn database(statement: &str, message: impl Into<String>) -> Self {
        const MAX: usize = 120;
        let statement = if statement.len() > MAX {
            let cut = statement
                .char_indices()
                .take_while(|(i, _)| *i < MAX)
                .map(|(i, c)| i + c.len_utf8())
                .last()
                .unwrap_or(0);
            format!("{}...", &statement[..cut])
        } else {
            statement.to_string()
        };
        AnonymizerError::Database {
            statement,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_truncates_long_statements() {
        let long = "INSERT INTO seed VALUES ".to_string() + &"x".repeat(500);
        let err = AnonymizerError::database(&long, "boom");
        match err {
            AnonymizerError::Database { statement, .. } => {
                assert!(statement.len() <= 123);
                assert!(statement.ends_with("..."));
            }
            _ => panic!("expected Database variant"),
        }
    }

    #[test]
    fn test_database_error_keeps_short_statements() {
        let err = AnonymizerError::database("SELECT 1;", "boom");
        match err {
            AnonymizerError::Database { statement, .. } => assert_eq!(statement, "SELECT 1;"),
            _ => panic!("expected Database variant"),
        }
    }
}
