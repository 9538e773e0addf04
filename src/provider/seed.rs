//! Seed table construction.
//!
//! A small fixed-size table of pre-generated fake rows supplies fake values
//! to arbitrarily large target tables: generator invocations are bounded by
//! `rows x distinct fields`, never by target row counts.

use crate::error::AnonymizerError;
use crate::query::{QueryFactory, SeedColumns};
use rand::Rng;

/// Per-run seed table name. Generated once per run and passed in explicitly,
/// so tests can pin it and concurrent accidental collisions stay unlikely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTableName(String);

impl SeedTableName {
    const PREFIX: &'static str = "_anonymizer_seed_fake_data";

    /// A name unlikely to collide with anything in the restored schema.
    pub fn random() -> Self {
        let suffix: u32 = rand::rng().random_range(1..=99999);
        Self(format!("{}_{}", Self::PREFIX, suffix))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SeedTableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compile the statements that create and populate the seed table: one DDL
/// statement, then `rows` INSERTs, each invoking every column's generator
/// once. Errors (via the factory) when `columns` is empty.
pub fn seed_statements(
    factory: &dyn QueryFactory,
    seed_table: &SeedTableName,
    columns: &SeedColumns<'_>,
    rows: usize,
) -> Result<Vec<String>, AnonymizerError> {
    let mut statements = Vec::with_capacity(rows + 1);
    statements.push(factory.create_seed_table(seed_table.as_str(), columns)?);
    for _ in 0..rows {
        statements.push(factory.insert_seed_row(seed_table.as_str(), columns));
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_names_carry_prefix_and_differ() {
        let a = SeedTableName::random();
        let b = SeedTableName::random();
        assert!(a.as_str().starts_with(SeedTableName::PREFIX));
        // 1-in-99999 flake odds are acceptable here
        assert_ne!(a, b);
    }

    #[test]
    fn test_explicit_name_is_kept_verbatim() {
        let name = SeedTableName::new("seed_table");
        assert_eq!(name.as_str(), "seed_table");
        assert_eq!(name.to_string(), "seed_table");
    }
}
