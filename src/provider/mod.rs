//! Database provider: the pipeline that creates the working database,
//! restores the dump into it, anonymizes it, dumps it back out, and drops it.
//!
//! The provider is generic over a dialect's [`QueryFactory`] and over the
//! transports that actually reach a server, so the whole pipeline is testable
//! against recording fakes. Execution is single-threaded and synchronous:
//! statements run strictly in compiled order, and no step is retried.

mod process;
mod seed;

pub use process::{
    ConnectionSettings, MySqlClient, MySqlDumpTransport, PgDumpTransport, PsqlClient,
};
pub use seed::{seed_statements, SeedTableName};

use crate::error::AnonymizerError;
use crate::query::{Dialect, QueryFactory};
use crate::strategy::{DatabaseStrategy, TableStrategy};
use std::io::{Read, Write};

/// Executes single statements against a live connection. One implementation
/// per client program; tests substitute a recording fake.
pub trait SqlClient {
    fn execute(&mut self, statement: &str) -> Result<(), AnonymizerError>;

    /// Run a query and return the first column of the first row, if any.
    fn query_scalar(&mut self, query: &str) -> Result<Option<String>, AnonymizerError>;
}

/// Streams dumps in and out of the working database via an external
/// mechanism. Byte counts are returned for progress display.
pub trait DumpTransport {
    fn restore(&mut self, input: &mut dyn Read) -> Result<u64, AnonymizerError>;
    fn dump(&mut self, output: &mut dyn Write) -> Result<u64, AnonymizerError>;
}

/// The pipeline's linear steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStep {
    CreateDatabase,
    RestoreDatabase,
    AnonymizeDatabase,
    DumpDatabase,
    DropDatabase,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 5] = [
        PipelineStep::CreateDatabase,
        PipelineStep::RestoreDatabase,
        PipelineStep::AnonymizeDatabase,
        PipelineStep::DumpDatabase,
        PipelineStep::DropDatabase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::CreateDatabase => "create-database",
            PipelineStep::RestoreDatabase => "restore-database",
            PipelineStep::AnonymizeDatabase => "anonymize-database",
            PipelineStep::DumpDatabase => "dump-database",
            PipelineStep::DropDatabase => "drop-database",
        }
    }

    /// Accepts kebab or snake case, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.to_lowercase().replace('_', "-");
        Self::ALL.iter().copied().find(|s| s.name() == normalized)
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability set implemented once per dialect with a transport. Every
/// operation fails with a propagated error and returns nothing on success.
pub trait DatabaseProvider {
    fn create_database(&mut self) -> Result<(), AnonymizerError>;
    fn restore_database(&mut self, input: &mut dyn Read) -> Result<(), AnonymizerError>;
    fn anonymize_database(&mut self, strategy: &DatabaseStrategy) -> Result<(), AnonymizerError>;
    fn dump_database(&mut self, output: &mut dyn Write) -> Result<(), AnonymizerError>;
    fn drop_database(&mut self) -> Result<(), AnonymizerError>;
}

/// Every SQL statement of an anonymization run, compiled up front so a
/// misconfigured strategy fails before anything reaches the database.
#[derive(Debug, Default)]
pub struct CompiledRun {
    /// Seed table DDL plus row INSERTs. Empty when the strategy has no fake
    /// columns, in which case no seed table is created at all.
    pub seed_setup: Vec<String>,
    /// Truncates, deletes, and updates, in strategy order.
    pub table_statements: Vec<String>,
    /// Drop of the seed table; present iff `seed_setup` is non-empty.
    pub seed_teardown: Option<String>,
}

/// Compile a full run for one dialect. The seed table must exist before any
/// fake-bearing UPDATE runs and is dropped only after all of them, which the
/// setup / statements / teardown split preserves by construction.
pub fn compile_run(
    factory: &dyn QueryFactory,
    strategy: &DatabaseStrategy,
    seed_table: &SeedTableName,
    seed_rows: usize,
) -> Result<CompiledRun, AnonymizerError> {
    let fake_columns = strategy.fake_columns();

    let mut run = CompiledRun::default();
    if !fake_columns.is_empty() {
        run.seed_setup = seed_statements(factory, seed_table, &fake_columns, seed_rows)?;
        run.seed_teardown = Some(factory.drop_seed_table(seed_table.as_str()));
    }

    for table in &strategy.tables {
        match table {
            TableStrategy::Truncate(name) => {
                run.table_statements.push(factory.truncate_table(name));
            }
            TableStrategy::Delete(name) => {
                run.table_statements.push(factory.delete_table(name));
            }
            TableStrategy::UpdateColumns(update) => {
                run.table_statements
                    .extend(factory.update_table(seed_table.as_str(), update)?);
            }
        }
    }

    Ok(run)
}

#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Name of the transient working database.
    pub database: String,
    /// Per-run seed table name; see [`SeedTableName::random`].
    pub seed_table: SeedTableName,
    /// Seed row count. Bounds repeated synthetic identities on large tables
    /// against generator cost; the trade-off is deliberate.
    pub seed_rows: usize,
}

/// Provider for dialects whose SQL and dumps travel through client programs.
/// `admin` is connected to a maintenance database so it can create and drop
/// the working database; `target` is connected to the working database.
pub struct SqlProvider {
    factory: &'static dyn QueryFactory,
    admin: Box<dyn SqlClient>,
    target: Box<dyn SqlClient>,
    transport: Box<dyn DumpTransport>,
    options: ProviderOptions,
}

impl SqlProvider {
    pub fn new(
        factory: &'static dyn QueryFactory,
        admin: Box<dyn SqlClient>,
        target: Box<dyn SqlClient>,
        transport: Box<dyn DumpTransport>,
        options: ProviderOptions,
    ) -> Self {
        Self {
            factory,
            admin,
            target,
            transport,
            options,
        }
    }

    /// Wire up subprocess clients for a dialect. MSSQL has no streaming
    /// transport and is rejected here; it remains compile-only.
    pub fn for_dialect(
        dialect: Dialect,
        settings: ConnectionSettings,
        options: ProviderOptions,
    ) -> Result<Self, AnonymizerError> {
        let factory = dialect.factory();
        match dialect {
            Dialect::Postgres => Ok(Self::new(
                factory,
                Box::new(PsqlClient::new(settings.clone(), "postgres")),
                Box::new(PsqlClient::new(settings.clone(), &options.database)),
                Box::new(PgDumpTransport::new(settings, &options.database)),
                options,
            )),
            Dialect::MySql => Ok(Self::new(
                factory,
                Box::new(MySqlClient::new(settings.clone(), None)),
                Box::new(MySqlClient::new(
                    settings.clone(),
                    Some(options.database.clone()),
                )),
                Box::new(MySqlDumpTransport::new(settings, &options.database)),
                options,
            )),
            Dialect::Mssql => Err(AnonymizerError::UnsupportedTransport {
                dialect: dialect.name(),
            }),
        }
    }

    /// Estimated dump size in bytes, when the dialect can provide one.
    /// Progress display only.
    pub fn dumpsize_estimate(&mut self) -> Result<Option<u64>, AnonymizerError> {
        let query = self.factory.dumpsize_estimate(&self.options.database);
        let value = self.target.query_scalar(&query)?;
        Ok(value.and_then(|v| v.trim().parse::<u64>().ok()))
    }
}

impl DatabaseProvider for SqlProvider {
    fn create_database(&mut self) -> Result<(), AnonymizerError> {
        let statement = self.factory.create_database(&self.options.database);
        self.admin.execute(&statement)
    }

    fn restore_database(&mut self, input: &mut dyn Read) -> Result<(), AnonymizerError> {
        self.transport.restore(input).map(|_| ())
    }

    fn anonymize_database(&mut self, strategy: &DatabaseStrategy) -> Result<(), AnonymizerError> {
        // compile everything first: zero SQL is sent for a bad strategy
        let run = compile_run(
            self.factory,
            strategy,
            &self.options.seed_table,
            self.options.seed_rows,
        )?;

        let mut execute_all = || -> Result<(), AnonymizerError> {
            for statement in run.seed_setup.iter().chain(run.table_statements.iter()) {
                self.target.execute(statement)?;
            }
            Ok(())
        };
        let outcome = execute_all();

        // the seed table is dropped even when a statement failed; the drop
        // is IF EXISTS, so a partially created seed is fine too
        let teardown = match &run.seed_teardown {
            Some(drop) => self.target.execute(drop),
            None => Ok(()),
        };

        outcome.and(teardown)
    }

    fn dump_database(&mut self, output: &mut dyn Write) -> Result<(), AnonymizerError> {
        self.transport.dump(output).map(|_| ())
    }

    fn drop_database(&mut self) -> Result<(), AnonymizerError> {
        // ordered sequence: session termination (where the dialect needs it)
        // strictly before the drop
        for statement in self.factory.drop_database(&self.options.database) {
            self.admin.execute(&statement)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_step_order() {
        let mut sorted = PipelineStep::ALL;
        sorted.sort();
        assert_eq!(sorted, PipelineStep::ALL);
        assert!(PipelineStep::CreateDatabase < PipelineStep::DropDatabase);
    }

    #[test]
    fn test_pipeline_step_names_round_trip() {
        for step in PipelineStep::ALL {
            assert_eq!(PipelineStep::from_name(step.name()), Some(step));
        }
        assert_eq!(
            PipelineStep::from_name("ANONYMIZE_DATABASE"),
            Some(PipelineStep::AnonymizeDatabase)
        );
        assert_eq!(PipelineStep::from_name("vacuum"), None);
    }
}
