//! Logging infrastructure for dupecheck.
//!
//! This module provides structured logging using the `log` facade and
//! `env_logger` backend. Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! When a log file is configured, every record goes to both stderr and the
//! file. Library code only uses the `log` macros.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupecheck::logging::init_logging;
//!
//! // Info level, console only
//! init_logging(0, false, None).unwrap();
//! log::info!("Application started");
//! ```

use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::{Builder, Target, WriteStyle};
use log::LevelFilter;

/// Errors raised while setting up logging.
#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    /// The log file could not be opened for appending.
    #[error("Cannot open log file {path}: {source}")]
    LogFile {
        /// Requested log file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A global logger was already installed.
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

/// Writes every log line to stderr and a file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Console output is best effort; the file is authoritative.
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Initialize the logging subsystem.
///
/// Call once, before any long-running work starts.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by `RUST_LOG`)
/// * `log_file` - Optional file that receives a copy of every record
///
/// # Errors
///
/// Returns [`LoggingError`] if the log file cannot be opened or a logger is
/// already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<(), LoggingError> {
    let use_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggingError::LogFile {
                path: path.to_path_buf(),
                source,
            })?;
        builder
            .target(Target::Pipe(Box::new(TeeWriter { file })))
            .write_style(WriteStyle::Never);
    }

    configure_format(&mut builder, verbose, log_file.is_some());
    builder.try_init()?;

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!("Logging initialized at level: {:?}", level);
    }
    if let Some(path) = log_file {
        log::debug!("Also logging to {}", path.display());
    }
    Ok(())
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Configure the log line format.
///
/// File logging always carries a timestamp. Console logging adds the module
/// path at debug verbosity and above.
fn configure_format(builder: &mut Builder, verbose: u8, to_file: bool) {
    builder.format(move |buf, record| {
        let level = record.level();
        let level_style = buf.default_level_style(level);

        if verbose >= 1 {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else if to_file {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} {}",
                buf.timestamp_seconds(),
                level,
                record.args()
            )
        } else {
            writeln!(buf, "{level_style}{:<5}{level_style:#} {}", level, record.args())
        }
    });
}
