//! End-to-end CLI tests for the offline command surface: database
//! initialization, listing, clearing, and the no-context answer path.
//! Commands that reach the OpenAI API are covered by unit tests against
//! mock clients instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ka_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ka");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[storage]
dir = "{}/storage"
collection = "test_collection"

[chunking]
max_tokens = 200
overlap_tokens = 40

[retrieval]
top_k = 4
"#,
        root.display()
    );

    let config_path = root.join("knowledge-agent.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ka(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ka_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ka binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ka(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp
        .path()
        .join("storage")
        .join("knowledge-agent.sqlite")
        .exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ka(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ka(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sources_empty() {
    let (_tmp, config_path) = setup_test_env();

    run_ka(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ka(&config_path, &["sources"]);
    assert!(
        success,
        "sources failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("No sources ingested yet."));
}

#[test]
fn test_ask_on_empty_store_reports_no_context() {
    let (_tmp, config_path) = setup_test_env();

    run_ka(&config_path, &["init"]);
    // Must succeed without any API key: nothing is ingested, so neither
    // the embedding nor the completion API may be called.
    let (stdout, stderr, success) = run_ka(&config_path, &["ask", "what is in here?"]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("relevant context"),
        "expected no-context answer, got: {}",
        stdout
    );
}

#[test]
fn test_clear_on_empty_store_succeeds() {
    let (_tmp, config_path) = setup_test_env();

    run_ka(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ka(&config_path, &["clear"]);
    assert!(success, "clear failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("cleared"));

    let (stdout, _, _) = run_ka(&config_path, &["sources"]);
    assert!(stdout.contains("No sources ingested yet."));
}

#[test]
fn test_ingest_unsupported_file_type_fails() {
    let (tmp, config_path) = setup_test_env();

    let bad_file = tmp.path().join("image.png");
    fs::write(&bad_file, b"\x89PNG not a document").unwrap();

    run_ka(&config_path, &["init"]);
    let (stdout, stderr, success) = run_ka(
        &config_path,
        &["ingest", "file", bad_file.to_str().unwrap()],
    );
    assert!(!success, "ingest of a PNG must fail: {}", stdout);
    assert!(
        stderr.contains("unsupported file type"),
        "expected unsupported-file error, got: {}",
        stderr
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[chunking]\nmax_tokens = 100\noverlap_tokens = 250\n",
    )
    .unwrap();

    let (_, stderr, success) = run_ka(&config_path, &["init"]);
    assert!(!success, "init with overlap >= max must fail");
    assert!(
        stderr.contains("overlap_tokens"),
        "expected chunking validation error, got: {}",
        stderr
    );
}
