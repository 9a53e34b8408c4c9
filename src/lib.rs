//! dupecheck - concurrent duplicate file finder
//!
//! A scanner thread walks a directory tree and feeds a bounded queue of paths
//! to a pool of hashing workers. Their fingerprints are aggregated on the
//! calling thread into a duplicate index, optionally mirrored into a SQLite
//! record store, and reported as text, JSON or CSV.

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;
pub mod sink;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::cli::{Cli, Commands, DuplicatesArgs, LookupArgs, OutputFormat, ScanArgs};
use crate::config::{Config, ConfigOverrides};
use crate::duplicates::DuplicateFinder;
use crate::error::ExitCode;
use crate::logging::LoggingError;
use crate::output::{CsvOutput, JsonOutput, JsonStoreReport, TextOutput};
use crate::progress::Progress;
use crate::sink::{RecordStore, SinkWriter, SqliteStore};

/// Run one CLI invocation.
///
/// Returns the exit code for a completed command. Errors that abort the
/// command are returned and mapped with [`ExitCode::for_error`].
///
/// # Errors
///
/// Returns an error if configuration is invalid, the scan root does not
/// exist, the record store cannot be opened, or the report cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let overrides = overrides_for(&cli);
    let config =
        Config::load(cli.config.as_deref(), overrides).context("Failed to load configuration")?;

    match logging::init_logging(cli.verbose, cli.quiet, config.log_file.as_deref()) {
        Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => {}
        Err(e) => return Err(e).context("Failed to initialize logging"),
    }

    match cli.command {
        Commands::Scan(args) => run_scan(&args, &config, cli.quiet),
        Commands::Lookup(args) => run_lookup(&args, &config),
        Commands::Duplicates(args) => run_duplicates(&args, &config),
    }
}

fn overrides_for(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides {
        log_file: cli.log_file.clone(),
        ..ConfigOverrides::default()
    };

    match &cli.command {
        Commands::Scan(args) => {
            overrides.threads = args.threads.map(clamp_to_usize);
            overrides.queue_capacity = args.queue_capacity.map(clamp_to_usize);
            overrides.algorithm = args.algorithm;
            overrides.follow_symlinks = args.follow_symlinks.then_some(true);
            overrides.skip_hidden = args.skip_hidden.then_some(true);
            overrides.max_depth = args.max_depth;
            overrides.database = args.db.clone();
            overrides.extra_ignore_patterns = args.ignore_patterns.clone();
        }
        Commands::Lookup(args) => overrides.database = args.db.clone(),
        Commands::Duplicates(args) => overrides.database = args.db.clone(),
    }
    overrides
}

fn clamp_to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn run_scan(args: &ScanArgs, config: &Config, quiet: bool) -> anyhow::Result<ExitCode> {
    let shutdown = signal::install_handler().context("Failed to install Ctrl+C handler")?;

    let mut finder_config = config
        .finder_config()
        .with_shutdown_flag(shutdown.get_flag());
    if !quiet && !args.no_progress {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let writer = match &config.database {
        Some(path) => {
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open record store {}", path.display()))?;
            let writer = SinkWriter::spawn(
                Box::new(store),
                config.sink_capacity,
                config.sink_timeout(),
            )?;
            finder_config = finder_config.with_sink(writer.handle());
            Some(writer)
        }
        None => None,
    };

    let finder = DuplicateFinder::new(finder_config);
    let session = finder.scan(&args.path)?;
    drop(finder);

    let (groups, summary) = session.into_report();
    let exit_code = if summary.interrupted {
        ExitCode::Interrupted
    } else {
        ExitCode::Success
    };

    if let Some(writer) = writer {
        let (_, stats) = writer.finish()?;
        if stats.failed > 0 || stats.dropped > 0 {
            log::warn!(
                "Record store missed {} records ({} failed, {} dropped)",
                stats.failed + stats.dropped,
                stats.failed,
                stats.dropped
            );
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&groups, &summary).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&groups, &summary, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&groups).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

fn open_existing_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let Some(path) = &config.database else {
        bail!("No record store given; pass --db or set `database` in the config file");
    };
    if !path.exists() {
        bail!("Record store {} does not exist", path.display());
    }
    SqliteStore::open(path).with_context(|| format!("Failed to open record store {}", path.display()))
}

fn run_lookup(args: &LookupArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let store = open_existing_store(config)?;
    let paths: Vec<PathBuf> = store.query_by_fingerprint(&args.fingerprint)?;
    if paths.is_empty() {
        log::info!("No paths stored for {}", args.fingerprint);
    }

    let stdout = io::stdout();
    output::text::write_lookup(stdout.lock(), &paths)?;
    Ok(ExitCode::Success)
}

fn run_duplicates(args: &DuplicatesArgs, config: &Config) -> anyhow::Result<ExitCode> {
    let store = open_existing_store(config)?;
    log::info!("Record store holds {} records", store.record_count()?);
    let duplicates = store.query_duplicate_fingerprints()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => output::text::write_stored(&mut out, &duplicates)?,
        OutputFormat::Json => JsonStoreReport::new(&duplicates).write_to(&mut out, true)?,
        OutputFormat::Csv => output::csv::write_stored(&mut out, &duplicates)?,
    }
    out.flush()?;
    Ok(ExitCode::Success)
}
