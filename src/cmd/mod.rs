mod compile;
mod run;
mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-anonymizer")]
#[command(version)]
#[command(about = "Anonymize production database snapshots with synthetic data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: create, restore, anonymize, dump, drop
    Run {
        /// Input dump file (.sql, optionally .gz/.bz2/.xz/.zst compressed)
        #[arg(short, long)]
        input: PathBuf,

        /// Output dump file; compression is chosen from the extension
        #[arg(short, long)]
        output: PathBuf,

        /// Strategy file (YAML)
        #[arg(short, long)]
        strategy: PathBuf,

        /// Database type: mysql or postgres
        #[arg(short = 't', long, default_value = "mysql")]
        db_type: String,

        /// Database server host
        #[arg(long, default_value = "localhost")]
        db_host: String,

        /// Database server port (dialect default when omitted)
        #[arg(long)]
        db_port: Option<u16>,

        /// Database user
        #[arg(long, env = "DB_USER")]
        db_user: String,

        /// Database password
        #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
        db_password: String,

        /// Name for the transient working database (generated when omitted)
        #[arg(long)]
        db_name: Option<String>,

        /// Seed table row count; more rows means fewer repeated synthetic
        /// identities on large tables, at a higher generation cost
        #[arg(long, default_value_t = 500)]
        seed_rows: usize,

        /// First pipeline step to run (create-database, restore-database,
        /// anonymize-database, dump-database, drop-database)
        #[arg(long)]
        start_at_step: Option<String>,

        /// Last pipeline step to run
        #[arg(long)]
        stop_at_step: Option<String>,

        /// Restore and re-dump without anonymizing
        #[arg(long)]
        skip_anonymization: bool,

        /// Show progress bars
        #[arg(short, long)]
        progress: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print every SQL statement a strategy would execute, without a database
    Compile {
        /// Strategy file (YAML)
        strategy: PathBuf,

        /// Database type: mysql, postgres, or mssql
        #[arg(short = 't', long, default_value = "postgres")]
        db_type: String,

        /// Seed table name used in the rendered statements
        #[arg(long, default_value = "seed_table")]
        seed_table: String,

        /// Seed rows to render (one is enough to review the INSERT shape)
        #[arg(long, default_value_t = 1)]
        seed_rows: usize,

        /// Database name used in the CREATE/DROP statements
        #[arg(long, default_value = "anonymizer")]
        db_name: String,
    },

    /// Parse and check a strategy file
    Validate {
        /// Strategy file (YAML)
        strategy: PathBuf,

        /// Also compile against this dialect to catch unsupported kinds
        #[arg(short = 't', long)]
        db_type: Option<String>,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            input,
            output,
            strategy,
            db_type,
            db_host,
            db_port,
            db_user,
            db_password,
            db_name,
            seed_rows,
            start_at_step,
            stop_at_step,
            skip_anonymization,
            progress,
            verbose,
        } => run::run(run::RunArgs {
            input,
            output,
            strategy,
            db_type,
            db_host,
            db_port,
            db_user,
            db_password,
            db_name,
            seed_rows,
            start_at_step,
            stop_at_step,
            skip_anonymization,
            progress,
            verbose,
        }),
        Commands::Compile {
            strategy,
            db_type,
            seed_table,
            seed_rows,
            db_name,
        } => compile::run(&strategy, &db_type, &seed_table, seed_rows, &db_name),
        Commands::Validate { strategy, db_type } => validate::run(&strategy, db_type.as_deref()),
    }
}
