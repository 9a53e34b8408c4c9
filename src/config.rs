//! Layered application configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config FILE`, or `dupecheck/config.toml` in the
//!    platform config directory when it exists
//! 3. Environment variables prefixed `DUPECHECK_` (e.g. `DUPECHECK_THREADS=4`)
//! 4. Command-line flags ([`ConfigOverrides`])
//!
//! The resulting [`Config`] is a plain value handed to whoever needs it.
//!
//! # Example file
//!
//! ```toml
//! threads = 4
//! queue_capacity = 32
//! algorithm = "sha256"
//! ignore_patterns = ["*.tmp", "node_modules/"]
//! database = "/var/lib/dupecheck/records.db"
//! log_file = "/var/log/dupecheck.log"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{FinderConfig, DEFAULT_QUEUE_CAPACITY};
use crate::scanner::{HashAlgorithm, WalkerConfig};
use crate::sink::writer::{DEFAULT_SINK_CAPACITY, DEFAULT_SINK_TIMEOUT};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPECHECK_";

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    MissingFile(PathBuf),

    /// A layer could not be parsed or had the wrong shape.
    #[error("Invalid configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Values parsed but violate a constraint.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// Effective application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hashing workers (N)
    pub threads: usize,
    /// Path channel capacity (C)
    pub queue_capacity: usize,
    /// Fingerprint digest
    pub algorithm: HashAlgorithm,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Skip names starting with `.`
    pub skip_hidden: bool,
    /// Gitignore-style patterns to skip
    pub ignore_patterns: Vec<String>,
    /// Maximum walk depth
    pub max_depth: Option<usize>,
    /// SQLite record store
    pub database: Option<PathBuf>,
    /// Copy of the log written here
    pub log_file: Option<PathBuf>,
    /// Channel capacity in front of the sink writer
    pub sink_capacity: usize,
    /// Longest a record waits for sink channel space, in milliseconds
    pub sink_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 1,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            algorithm: HashAlgorithm::default(),
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            max_depth: None,
            database: None,
            log_file: None,
            sink_capacity: DEFAULT_SINK_CAPACITY,
            sink_timeout_ms: DEFAULT_SINK_TIMEOUT.as_millis() as u64,
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Appended to the configured patterns rather than replacing them.
    #[serde(skip)]
    pub extra_ignore_patterns: Vec<String>,
}

impl Config {
    /// Load configuration from every layer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing, a layer fails
    /// to parse, or the merged values are invalid.
    pub fn load(config_file: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with_env_prefix(config_file, ENV_PREFIX, overrides)
    }

    /// [`Config::load`] reading environment variables with a custom prefix.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_with_env_prefix(
        config_file: Option<&Path>,
        env_prefix: &str,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match config_file {
            Some(path) if !path.exists() => {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path().filter(|p| p.exists()) {
                    log::debug!("Loading config from {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        let mut config: Config = figment
            .merge(Env::prefixed(env_prefix))
            .merge(Serialized::defaults(&overrides))
            .extract()?;
        config
            .ignore_patterns
            .extend(overrides.extra_ignore_patterns);

        config.validate()?;
        Ok(config)
    }

    /// Platform config file location (`.../dupecheck/config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dupecheck").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check value constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.sink_capacity == 0 {
            return Err(ConfigError::Invalid(
                "sink_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Walker settings.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_follow_symlinks(self.follow_symlinks)
            .with_skip_hidden(self.skip_hidden)
            .with_ignore_patterns(self.ignore_patterns.clone())
            .with_max_depth(self.max_depth)
    }

    /// Pipeline settings (without shutdown flag, progress, or sink).
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_io_threads(self.threads)
            .with_queue_capacity(self.queue_capacity)
            .with_algorithm(self.algorithm)
            .with_walker_config(self.walker_config())
    }

    /// Sink append timeout.
    #[must_use]
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }
}
