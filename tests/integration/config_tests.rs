use dupecheck::config::{Config, ConfigError, ConfigOverrides};
use dupecheck::scanner::HashAlgorithm;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_file_then_env_then_overrides() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("config.toml");
    fs::write(
        &file,
        r#"
threads = 3
queue_capacity = 8
algorithm = "sha256"
ignore_patterns = ["*.bak"]
database = "/var/lib/dupecheck/records.db"
"#,
    )
    .unwrap();

    std::env::set_var("DCINTEG_LAYERS_THREADS", "5");
    std::env::set_var("DCINTEG_LAYERS_SKIP_HIDDEN", "true");

    let overrides = ConfigOverrides {
        queue_capacity: Some(64),
        extra_ignore_patterns: vec!["target/".to_string()],
        ..ConfigOverrides::default()
    };
    let config = Config::load_with_env_prefix(Some(&file), "DCINTEG_LAYERS_", overrides).unwrap();

    std::env::remove_var("DCINTEG_LAYERS_THREADS");
    std::env::remove_var("DCINTEG_LAYERS_SKIP_HIDDEN");

    assert_eq!(config.threads, 5);
    assert_eq!(config.queue_capacity, 64);
    assert_eq!(config.algorithm, HashAlgorithm::Sha256);
    assert!(config.skip_hidden);
    assert_eq!(config.ignore_patterns, vec!["*.bak", "target/"]);
    assert_eq!(
        config.database,
        Some(PathBuf::from("/var/lib/dupecheck/records.db"))
    );

    let finder = config.finder_config();
    assert_eq!(finder.io_threads, 5);
    assert_eq!(finder.queue_capacity, 64);
    assert_eq!(finder.in_flight_limit(), 69);
}

#[test]
fn test_zero_threads_in_file_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("config.toml");
    fs::write(&file, "threads = 0\n").unwrap();

    let err = Config::load_with_env_prefix(Some(&file), "DCINTEG_ZERO_", ConfigOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_explicit_missing_file_rejected() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let err = Config::load_with_env_prefix(Some(&missing), "DCINTEG_MISSING_", ConfigOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingFile(p) if p == missing));
}

#[test]
fn test_malformed_file_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("config.toml");
    fs::write(&file, "threads = \"many\"\n").unwrap();

    let err = Config::load_with_env_prefix(Some(&file), "DCINTEG_BAD_", ConfigOverrides::default())
        .unwrap_err();
    assert!(matches!(err, ConfigError::Load(_)));
}
