use clap::Parser;
use dupecheck::cli::Cli;
use dupecheck::error::ExitCode;
use dupecheck::sink::{RecordStore, SqliteStore};
use std::fs;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["dupecheck", "-q"];
    argv.extend_from_slice(args);
    dupecheck::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_scan_exits_successfully_without_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"1").unwrap();
    fs::write(dir.path().join("b"), b"2").unwrap();
    let root = dir.path().to_str().unwrap();

    let code = run(&["scan", root, "--no-progress", "-o", "json"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_scan_missing_root_maps_to_exit_code_two() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");

    let err = run(&["scan", missing.to_str().unwrap(), "--no-progress"]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::PathNotFound);
    assert_eq!(ExitCode::for_error(&err).as_i32(), 2);
}

#[test]
fn test_scan_then_query_store() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    fs::write(tree.join("one.txt"), b"same bytes").unwrap();
    fs::write(tree.join("two.txt"), b"same bytes").unwrap();
    let db = dir.path().join("records.db");
    let db_arg = db.to_str().unwrap();

    let code = run(&[
        "scan",
        tree.to_str().unwrap(),
        "--no-progress",
        "-t",
        "3",
        "-o",
        "csv",
        "--db",
        db_arg,
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);

    let store = SqliteStore::open(&db).unwrap();
    let stored = store.query_duplicate_fingerprints().unwrap();
    assert_eq!(stored.len(), 1);
    let hex = stored[0].fingerprint.to_hex();
    drop(store);

    assert_eq!(run(&["lookup", &hex, "--db", db_arg]).unwrap(), ExitCode::Success);
    assert_eq!(
        run(&["duplicates", "--db", db_arg, "-o", "json"]).unwrap(),
        ExitCode::Success
    );
}

#[test]
fn test_lookup_without_store_fails() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("never-created.db");
    let hex = "0".repeat(64);

    let err = run(&["lookup", &hex, "--db", db.to_str().unwrap()]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(!db.exists());
}
