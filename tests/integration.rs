use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mh_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mh");
    path
}

/// Config plus a `files/` directory holding three text files. Every
/// provider stays disabled, so nothing leaves the machine.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha\n\nNotes about Rust programming, cargo and crates.",
    )
    .unwrap();
    fs::write(
        files_dir.join("beta.md"),
        "# Beta\n\nPython and machine learning with PyTorch.",
    )
    .unwrap();
    fs::write(
        files_dir.join("gamma.txt"),
        "Deployment notes: Kubernetes and Docker.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/mh.sqlite"

[ingest]
workers = 2

[retrieval]
top_k = 3
"#,
        root.display()
    );

    let config_path = config_dir.join("mh.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn run_mh(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mh_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mh binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn init_and_ingest(config_path: &Path, tenant: &str) {
    let (_, stderr, success) = run_mh(config_path, &["init"]);
    assert!(success, "init failed: {}", stderr);
    let files = files_dir(config_path);
    let (stdout, stderr, success) = run_mh(
        config_path,
        &["ingest", "--tenant", tenant, files.to_str().unwrap()],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
}

fn tenant_count(stdout: &str, tenant: &str) -> Option<u64> {
    stdout.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        (parts.next() == Some(tenant)).then(|| parts.next().unwrap().parse().unwrap())
    })
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mh(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_mh(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_mh(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_directory() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);

    let files = files_dir(&config_path);
    let (stdout, stderr, success) = run_mh(
        &config_path,
        &["ingest", "--tenant", "acme", files.to_str().unwrap()],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("ingest acme"));
    assert!(stdout.contains("ingested: 3"));
    assert!(stdout.contains("failed: 0"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_search_finds_keyword() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");

    let (stdout, _, success) = run_mh(&config_path, &["search", "--tenant", "acme", "cargo crates"]);
    assert!(success);
    assert!(stdout.starts_with("1. [2] alpha.md (text)"), "{}", stdout);
    assert!(!stdout.contains("beta.md"));
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");

    let (stdout, _, success) = run_mh(&config_path, &["search", "--tenant", "acme", "zebra"]);
    assert!(success);
    assert!(stdout.contains("No results."));

    // Tenants never leak into each other.
    let (stdout, _, success) = run_mh(&config_path, &["search", "--tenant", "other", "cargo"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_ask_empty_tenant_returns_sentinel() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);

    let (stdout, stderr, success) =
        run_mh(&config_path, &["ask", "--tenant", "nobody", "What is this?"]);
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("Please upload some documents first."), "{}", stdout);
}

#[test]
fn test_ask_without_generation_provider_fails() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");

    let (_, stderr, success) = run_mh(&config_path, &["ask", "--tenant", "acme", "Tell me about cargo"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "{}", stderr);
}

#[test]
fn test_reingest_with_id_does_not_duplicate() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);
    let alpha = files_dir(&config_path).join("alpha.md");

    for _ in 0..2 {
        let (stdout, stderr, success) = run_mh(
            &config_path,
            &["ingest", "--tenant", "acme", "--id", "doc-1", alpha.to_str().unwrap()],
        );
        assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
        assert!(stdout.contains("doc-1"));
    }

    let (stdout, _, _) = run_mh(&config_path, &["tenants", "list"]);
    assert_eq!(tenant_count(&stdout, "acme"), Some(1), "{}", stdout);
}

#[test]
fn test_id_requires_single_file() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);
    let files = files_dir(&config_path);

    let (_, stderr, success) = run_mh(
        &config_path,
        &["ingest", "--tenant", "acme", "--id", "x", files.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("exactly one file"), "{}", stderr);
}

#[test]
fn test_blank_tenant_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);
    let files = files_dir(&config_path);

    let (_, stderr, success) = run_mh(
        &config_path,
        &["ingest", "--tenant", "  ", files.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("tenant"), "{}", stderr);
}

#[test]
fn test_image_without_ocr_is_degraded_then_cleaned_up() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");

    let scan = files_dir(&config_path).join("scan.png");
    fs::write(&scan, b"not really a png").unwrap();
    let (stdout, stderr, success) = run_mh(
        &config_path,
        &["ingest", "--tenant", "acme", scan.to_str().unwrap()],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("degraded: 1"), "{}", stdout);

    let (stdout, _, success) = run_mh(&config_path, &["cleanup", "--tenant", "acme", "--degraded"]);
    assert!(success);
    assert!(stdout.contains("deleted: 1"), "{}", stdout);

    let (stdout, _, _) = run_mh(&config_path, &["tenants", "list"]);
    assert_eq!(tenant_count(&stdout, "acme"), Some(3), "{}", stdout);
}

#[test]
fn test_cleanup_by_media_type() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");

    let (stdout, _, success) =
        run_mh(&config_path, &["cleanup", "--tenant", "acme", "--media-type", "image"]);
    assert!(success);
    assert!(stdout.contains("deleted: 0"));

    let (stdout, _, success) = run_mh(&config_path, &["cleanup", "--tenant", "acme"]);
    assert!(success);
    assert!(stdout.contains("deleted: 3"));

    let (stdout, _, _) = run_mh(&config_path, &["tenants", "list"]);
    assert!(stdout.contains("No tenants."), "{}", stdout);
}

#[test]
fn test_tenants_list_and_contents() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path, "acme");
    init_and_ingest(&config_path, "globex");

    let (stdout, _, success) = run_mh(&config_path, &["tenants", "list"]);
    assert!(success);
    assert_eq!(tenant_count(&stdout, "acme"), Some(3));
    assert_eq!(tenant_count(&stdout, "globex"), Some(3));

    let (stdout, _, success) = run_mh(&config_path, &["contents", "--tenant", "globex"]);
    assert!(success);
    assert!(stdout.contains("--- globex / alpha.md ---"));
    assert!(stdout.contains("content:    \"# Alpha Notes about Rust programming, cargo and crates.\""));
    assert!(!stdout.contains("acme"));
    assert!(stdout.contains("3 documents"));
}

#[test]
fn test_contents_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_mh(&config_path, &["init"]);

    let (stdout, _, success) = run_mh(&config_path, &["contents"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_tenants_create_mints_unique_ids() {
    let (_tmp, config_path) = setup_test_env();

    let (first, _, success) = run_mh(&config_path, &["tenants", "create", "--name", "Research"]);
    assert!(success);
    let (second, _, _) = run_mh(&config_path, &["tenants", "create", "--name", "Research"]);

    assert!(first.trim().starts_with("research-"), "{}", first);
    assert_ne!(first.trim(), second.trim());
}
