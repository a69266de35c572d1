use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn qry_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("qry");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let corpus_dir = root.join("corpus");
    fs::create_dir_all(&corpus_dir).unwrap();
    fs::write(
        corpus_dir.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    ).unwrap();
    fs::write(
        corpus_dir.join("beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks like PyTorch are covered.",
    ).unwrap();
    fs::write(
        corpus_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nContains notes about deployment and infrastructure.\n\nKubernetes and Docker are mentioned here.",
    ).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/qry.sqlite"

[corpus]
root = "{}/corpus"
include_globs = ["**/*.md", "**/*.txt"]
exclude_globs = []

[chunking]
max_tokens = 250

[retrieval]
keyword_weight = 0.6
top_k = 5
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("qry.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_qry(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = qry_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qry binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_qry(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_qry(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_qry(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_index_corpus() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    let (stdout, stderr, success) = run_qry(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("indexed: 3"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_index_incremental_skips_unchanged() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    let (stdout1, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout1.contains("indexed: 3"));

    // Nothing changed, nothing re-processed.
    let (stdout2, _, _) = run_qry(&config_path, &["index"]);
    assert!(
        stdout2.contains("indexed: 0") && stdout2.contains("skipped (unchanged): 3"),
        "Expected a no-op second run, got: {}",
        stdout2
    );
}

#[test]
fn test_index_force_reprocesses_everything() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let (stdout, _, success) = run_qry(&config_path, &["index", "--force"]);
    assert!(success);
    assert!(stdout.contains("indexed: 3"), "got: {}", stdout);
}

#[test]
fn test_index_picks_up_modified_file() {
    let (tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    // Touching bytes without changing them must not trigger a re-index;
    // changing content must.
    let alpha = tmp.path().join("corpus").join("alpha.md");
    let original = fs::read_to_string(&alpha).unwrap();
    fs::write(&alpha, &original).unwrap();
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout.contains("indexed: 0"), "got: {}", stdout);

    fs::write(&alpha, format!("{original}\n\nA brand new paragraph about memory safety.")).unwrap();
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(
        stdout.contains("indexed: 1") && stdout.contains("skipped (unchanged): 2"),
        "got: {}",
        stdout
    );
}

#[test]
fn test_index_renamed_file_is_new_document() {
    let (tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let corpus = tmp.path().join("corpus");
    fs::rename(corpus.join("gamma.txt"), corpus.join("delta.txt")).unwrap();

    // Same bytes, new identity: the new path is indexed fresh.
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout.contains("indexed: 1"), "got: {}", stdout);
}

#[test]
fn test_index_dry_run_writes_nothing() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    let (stdout, _, success) = run_qry(&config_path, &["index", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("to index: 3"), "got: {}", stdout);

    // A real run afterwards still sees all three as new.
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout.contains("indexed: 3"), "got: {}", stdout);
}

#[test]
fn test_index_limit() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    let (stdout, _, _) = run_qry(&config_path, &["index", "--limit", "2"]);
    assert!(stdout.contains("indexed: 2"), "got: {}", stdout);

    // The remaining document is picked up next run.
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout.contains("indexed: 1"), "got: {}", stdout);
}

#[test]
fn test_corrupt_document_does_not_stop_the_run() {
    let (tmp, config_path) = setup_test_env();

    // A .pdf that is not a PDF fails extraction for that document only.
    fs::write(tmp.path().join("corpus").join("broken.pdf"), b"not a pdf at all").unwrap();

    run_qry(&config_path, &["init"]);
    // Need pdf in include globs: the default test config only includes md/txt,
    // so rewrite it to include pdf too.
    let config_content = fs::read_to_string(&config_path).unwrap();
    fs::write(
        &config_path,
        config_content.replace(
            r#"include_globs = ["**/*.md", "**/*.txt"]"#,
            r#"include_globs = ["**/*.md", "**/*.txt", "**/*.pdf"]"#,
        ),
    )
    .unwrap();

    let (stdout, stderr, success) = run_qry(&config_path, &["index"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("indexed: 3"), "got: {}", stdout);
    assert!(stdout.contains("failed: 1"), "got: {}", stdout);
    assert!(stderr.contains("Warning"), "got stderr: {}", stderr);

    // The broken file is retried (and fails again) on the next run.
    let (stdout, _, _) = run_qry(&config_path, &["index"]);
    assert!(stdout.contains("failed: 1"), "got: {}", stdout);
}

#[test]
fn test_query_without_embeddings_is_lexical_only() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let (stdout, stderr, success) = run_qry(&config_path, &["query", "Rust programming cargo"]);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    // Embedding provider is disabled: results come from lexical scoring
    // with a warning on stderr.
    assert!(stderr.contains("Warning"), "got stderr: {}", stderr);
    assert!(stdout.contains("alpha.md"), "got: {}", stdout);
    assert!(!stdout.contains("beta.md"), "got: {}", stdout);
}

#[test]
fn test_query_json_output() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let (stdout, _, success) = run_qry(
        &config_path,
        &["query", "Kubernetes deployment", "--json"],
    );
    assert!(success);
    let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let arr = results.as_array().unwrap();
    assert!(!arr.is_empty());
    assert_eq!(arr[0]["document"], "gamma.txt");
    assert!(arr[0]["score"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_query_no_matches() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let (stdout, _, success) = run_qry(&config_path, &["query", "zyxwvut nonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results."), "got: {}", stdout);
}

#[test]
fn test_stats_reports_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_qry(&config_path, &["init"]);
    run_qry(&config_path, &["index"]);

    let (stdout, stderr, success) = run_qry(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documents:   3"), "got: {}", stdout);
    assert!(stdout.contains("alpha.md"), "got: {}", stdout);
}
