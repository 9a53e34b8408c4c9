//! Output formatters for duplicate scan results.
//!
//! This module provides different output formats for scan results:
//! - Text for people at a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use dupecheck::duplicates::DuplicateFinder;
//! use dupecheck::error::ExitCode;
//! use dupecheck::output::json::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! // Output as JSON to stdout
//! let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use self::csv::{CsvOutput, CsvOutputError};
pub use json::{JsonOutput, JsonOutputError, JsonStoreReport};
pub use text::TextOutput;
