//! CLI handler for the run command: the full anonymization pipeline.

use crate::iostream::{create_dump_output, open_dump_input, ProgressWriter};
use crate::provider::{
    ConnectionSettings, DatabaseProvider, PipelineStep, ProviderOptions, SeedTableName, SqlProvider,
};
use crate::query::Dialect;
use crate::strategy::load_strategy_file;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::io::Write;
use std::path::PathBuf;

pub struct RunArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub strategy: PathBuf,
    pub db_type: String,
    pub db_host: String,
    pub db_port: Option<u16>,
    pub db_user: String,
    pub db_password: String,
    pub db_name: Option<String>,
    pub seed_rows: usize,
    pub start_at_step: Option<String>,
    pub stop_at_step: Option<String>,
    pub skip_anonymization: bool,
    pub progress: bool,
    pub verbose: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let dialect = Dialect::from_name(&args.db_type).ok_or_else(|| {
        anyhow::anyhow!("Unknown database type: {}. Use: mysql, postgres", args.db_type)
    })?;

    let strategy = load_strategy_file(&args.strategy)?;

    let start = parse_step(args.start_at_step.as_deref(), PipelineStep::CreateDatabase)?;
    let stop = parse_step(args.stop_at_step.as_deref(), PipelineStep::DropDatabase)?;
    if start > stop {
        anyhow::bail!(
            "--start-at-step {} is after --stop-at-step {}",
            start.name(),
            stop.name()
        );
    }

    let database = args.db_name.clone().unwrap_or_else(generated_db_name);
    let settings = ConnectionSettings {
        host: args.db_host.clone(),
        port: args.db_port.unwrap_or_else(|| default_port(dialect)),
        user: args.db_user.clone(),
        password: args.db_password.clone(),
    };
    let options = ProviderOptions {
        database: database.clone(),
        seed_table: SeedTableName::random(),
        seed_rows: args.seed_rows,
    };
    let mut provider = SqlProvider::for_dialect(dialect, settings, options)?;

    let included = |step: PipelineStep| {
        (start..=stop).contains(&step)
            && !(args.skip_anonymization && step == PipelineStep::AnonymizeDatabase)
    };

    if included(PipelineStep::CreateDatabase) {
        log_step(args.verbose, &format!("Creating database {}", database));
        provider.create_database()?;
    }

    if included(PipelineStep::RestoreDatabase) {
        log_step(
            args.verbose,
            &format!("Restoring {}", args.input.display()),
        );
        let bar = args.progress.then(byte_bar);
        let bar_for_reader = bar.clone();
        let (mut reader, size) = open_dump_input(&args.input, move |n| {
            if let Some(bar) = &bar_for_reader {
                bar.set_position(n);
            }
        })?;
        if let Some(bar) = &bar {
            bar.set_length(size);
        }
        provider.restore_database(&mut reader)?;
        if let Some(bar) = &bar {
            bar.finish_with_message("restored");
        }
    }

    if included(PipelineStep::AnonymizeDatabase) {
        log_step(args.verbose, "Anonymizing");
        provider.anonymize_database(&strategy)?;
    }

    if included(PipelineStep::DumpDatabase) {
        log_step(args.verbose, &format!("Dumping to {}", args.output.display()));
        // estimate failure only costs the bar length
        let estimate = provider
            .dumpsize_estimate()
            .ok()
            .flatten()
            .filter(|bytes| *bytes > 1);

        let writer = create_dump_output(&args.output)?;
        let bar = args.progress.then(|| match estimate {
            Some(bytes) => {
                let bar = byte_bar();
                bar.set_length(bytes);
                bar
            }
            None => ProgressBar::new_spinner(),
        });
        let bar_for_writer = bar.clone();
        let mut writer: Box<dyn Write> = Box::new(ProgressWriter::new(writer, move |n| {
            if let Some(bar) = &bar_for_writer {
                bar.set_position(n);
            }
        }));
        provider.dump_database(&mut writer)?;
        writer.flush()?;
        // encoders finish on drop, before the file is announced as complete
        drop(writer);
        if let Some(bar) = &bar {
            bar.finish_with_message("dumped");
        }
    }

    if included(PipelineStep::DropDatabase) {
        log_step(args.verbose, &format!("Dropping database {}", database));
        provider.drop_database()?;
    }

    Ok(())
}

fn parse_step(raw: Option<&str>, fallback: PipelineStep) -> anyhow::Result<PipelineStep> {
    match raw {
        None => Ok(fallback),
        Some(name) => PipelineStep::from_name(name).ok_or_else(|| {
            let known: Vec<&str> = PipelineStep::ALL.iter().map(|s| s.name()).collect();
            anyhow::anyhow!("Unknown pipeline step '{}'. Use: {}", name, known.join(", "))
        }),
    }
}

fn default_port(dialect: Dialect) -> u16 {
    match dialect {
        Dialect::MySql => 3306,
        Dialect::Postgres => 5432,
        Dialect::Mssql => 1433,
    }
}

fn generated_db_name() -> String {
    format!(
        "anonymizer_{:05}",
        rand::rng().random_range(1..=99999u32)
    )
}

fn byte_bar() -> ProgressBar {
    let bar = ProgressBar::no_length();
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}",
        )
        .unwrap()
        .progress_chars("█▓▒░  "),
    );
    bar
}

fn log_step(verbose: bool, message: &str) {
    if verbose {
        eprintln!("{message}");
    }
}
