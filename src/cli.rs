//! Command-line interface definitions for dupecheck.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global options (verbosity, config file, log file) apply
//! to every subcommand.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory and print a text report
//! dupecheck scan ~/Pictures
//!
//! # Four hashing workers, JSON output, persist records to SQLite
//! dupecheck scan ~/Pictures --threads 4 --output json --db records.db
//!
//! # Ask the store which paths share a fingerprint
//! dupecheck lookup 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08 --db records.db
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{Fingerprint, HashAlgorithm};

/// Concurrent duplicate file finder.
///
/// dupecheck walks a directory tree, fingerprints every regular file by
/// content, and reports groups of byte-identical files.
#[derive(Debug, Parser)]
#[command(name = "dupecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Also write log records to this file
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// List stored paths that share a fingerprint
    Lookup(LookupArgs),
    /// List every fingerprint stored for two or more distinct paths
    Duplicates(DuplicatesArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory (or file) to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Number of hashing workers (default: 1)
    #[arg(short = 't', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub threads: Option<u64>,

    /// Capacity of the path queue between the scanner and the workers (default: 32)
    #[arg(long, value_name = "C", value_parser = clap::value_parser!(u64).range(1..))]
    pub queue_capacity: Option<u64>,

    /// Content digest
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Follow symbolic links during the scan
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Gitignore-style patterns to skip (repeatable, added to configured patterns)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Maximum directory depth (the root is depth 0)
    #[arg(long, value_name = "D")]
    pub max_depth: Option<usize>,

    /// Persist every record to this SQLite database
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Do not show the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the lookup subcommand.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Fingerprint as 64 hex characters
    #[arg(value_name = "FINGERPRINT")]
    pub fingerprint: Fingerprint,

    /// Record store to query (falls back to the configured database)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

/// Arguments for the duplicates subcommand.
#[derive(Debug, Args)]
pub struct DuplicatesArgs {
    /// Record store to query (falls back to the configured database)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON for scripting
    Json,
    /// CSV, one row per duplicate file
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
