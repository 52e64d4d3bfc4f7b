use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|err| panic!("clock should be >= UNIX_EPOCH: {err}"))
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{now}"));
    fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("failed to create temp dir {}: {err}", dir.display()));
    dir
}

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body)
        .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
    path
}

fn run_rr<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_rr"))
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("failed to execute rr binary: {err}"))
}

fn run_json<I, S>(args: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_rr(args);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "rr command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
            output.status, stdout, stderr
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_else(|| panic!("path should be valid UTF-8: {}", path.display()))
}

fn payload<'a>(value: &'a Value) -> &'a Value {
    assert_eq!(
        value.get("contract_version").and_then(Value::as_str),
        Some("cli.v1"),
        "missing contract version in: {value}"
    );
    value.get("payload").unwrap_or(value)
}

const RANKING_A: &str =
    r#"[["1"], ["2", "3"], ["4"], ["5", "6", "7"], ["8"], ["9"], ["10"]]"#;
const RANKING_B: &str = r#"[["3"], ["1", "4"], ["2"], ["6"], ["5", "7", "8"], ["9", "10"]]"#;

#[test]
fn reconcile_kernel_variant_reports_contradiction_pairs() {
    let dir = unique_temp_dir("rr-kernel");
    let a = write_file(&dir, "a.json", RANKING_A);
    let b = write_file(&dir, "b.json", RANKING_B);

    let value = run_json([
        "reconcile",
        "--a",
        path_str(&a),
        "--b",
        path_str(&b),
        "--variant",
        "kernel",
    ]);
    assert_eq!(payload(&value), &json!([["1", "3"], ["2", "4"]]));
}

#[test]
fn reconcile_consistent_variant_reports_clustered_ranking() {
    let dir = unique_temp_dir("rr-consistent");
    let a = write_file(&dir, "a.json", RANKING_A);
    let b = write_file(&dir, "b.json", RANKING_B);

    let value = run_json([
        "reconcile",
        "--a",
        path_str(&a),
        "--b",
        path_str(&b),
        "--variant",
        "consistent",
    ]);
    assert_eq!(
        payload(&value),
        &json!([["1", "3"], ["2", "4"], ["5", "7"], ["6"], ["8"], ["9"], ["10"]])
    );
}

#[test]
fn reconcile_accepts_wrapper_objects() {
    let dir = unique_temp_dir("rr-wrapper");
    let a = write_file(&dir, "a.json", r#"{"ranking": [["1"], ["2"]]}"#);
    let b = write_file(&dir, "b.json", r#"{"clusters": ["1", "2"]}"#);

    let value = run_json([
        "reconcile",
        "--a",
        path_str(&a),
        "--b",
        path_str(&b),
        "--variant",
        "consistent",
    ]);
    assert_eq!(payload(&value), &json!([["1"], ["2"]]));
}

#[test]
fn reconcile_reads_one_ranking_from_stdin() {
    let dir = unique_temp_dir("rr-stdin");
    let b = write_file(&dir, "b.json", r#"[["1"], ["2"]]"#);

    let mut child = Command::new(env!("CARGO_BIN_EXE_rr"))
        .args(["reconcile", "--a", "-", "--b", path_str(&b), "--variant", "kernel"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|err| panic!("failed to spawn rr binary: {err}"));
    if let Some(stdin) = child.stdin.as_mut() {
        stdin
            .write_all(br#"[["2"], ["1"]]"#)
            .unwrap_or_else(|err| panic!("failed to write stdin: {err}"));
    }
    let output = child
        .wait_with_output()
        .unwrap_or_else(|err| panic!("failed to wait for rr binary: {err}"));
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let value: Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"));
    assert_eq!(payload(&value), &json!([["1", "2"]]));
}

#[test]
fn reconcile_rejects_double_stdin() {
    let output = run_rr(["reconcile", "--a", "-", "--b", "-", "--variant", "kernel"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("stdin"), "stderr: {stderr}");
}

#[test]
fn reconcile_fails_on_mismatched_object_sets() {
    let dir = unique_temp_dir("rr-mismatch");
    let a = write_file(&dir, "a.json", r#"[["1"], ["2"]]"#);
    let b = write_file(&dir, "b.json", r#"[["1"], ["3"]]"#);

    let output = run_rr([
        "reconcile",
        "--a",
        path_str(&a),
        "--b",
        path_str(&b),
        "--variant",
        "kernel",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("symmetric difference"), "stderr: {stderr}");
    assert!(stderr.contains('2') && stderr.contains('3'), "stderr: {stderr}");
}

#[test]
fn reconcile_fails_on_duplicate_label() {
    let dir = unique_temp_dir("rr-duplicate");
    let a = write_file(&dir, "a.json", r#"[["1", "1"], ["2"]]"#);
    let b = write_file(&dir, "b.json", r#"[["1"], ["2"]]"#);

    let output = run_rr([
        "reconcile",
        "--a",
        path_str(&a),
        "--b",
        path_str(&b),
        "--variant",
        "consistent",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate object label"), "stderr: {stderr}");
}

#[test]
fn reconcile_rejects_unknown_variant_selector() {
    let output = run_rr(["reconcile", "--a", "a.json", "--b", "b.json", "--variant", "vote"]);
    assert!(!output.status.success());
}

#[test]
fn hierarchy_complexity_matches_reference_sample() {
    let dir = unique_temp_dir("rr-complexity");
    let edges = write_file(&dir, "edges.csv", "1,2\n1,3\n3,4\n3,5\n");

    let value = run_json(["hierarchy", "complexity", "--edges", path_str(&edges)]);
    assert_eq!(value.get("entropy_rounded").and_then(Value::as_f64), Some(6.5));
    assert_eq!(value.get("normalized_complexity_rounded").and_then(Value::as_f64), Some(0.5));
}

#[test]
fn hierarchy_relations_reports_five_matrices() {
    let dir = unique_temp_dir("rr-relations");
    let edges = write_file(&dir, "edges.csv", "1,2\n1,3\n3,4\n3,5\n");

    let value = run_json(["hierarchy", "relations", "--edges", path_str(&edges)]);
    assert_eq!(value.get("nodes"), Some(&json!(["1", "2", "3", "4", "5"])));
    for key in [
        "direct_control",
        "direct_subordination",
        "indirect_control",
        "indirect_subordination",
        "collaboration",
    ] {
        let matrix = value
            .get(key)
            .and_then(Value::as_array)
            .unwrap_or_else(|| panic!("missing matrix `{key}` in: {value}"));
        assert_eq!(matrix.len(), 5, "matrix `{key}` has wrong order");
    }
    assert_eq!(
        value.get("indirect_control"),
        Some(&json!([
            [false, false, false, true, true],
            [false, false, false, false, false],
            [false, false, false, false, false],
            [false, false, false, false, false],
            [false, false, false, false, false]
        ]))
    );
}

#[test]
fn graph_adjacency_matches_reference_sample() {
    let dir = unique_temp_dir("rr-adjacency");
    let edges = write_file(&dir, "edges.csv", "1,2\n1,3\n3,4\n3,5\n");

    let value = run_json(["graph", "adjacency", "--edges", path_str(&edges)]);
    assert_eq!(value.get("order").and_then(Value::as_u64), Some(5));
    assert_eq!(
        value.get("matrix"),
        Some(&json!([
            [false, true, true, false, false],
            [false, false, false, false, false],
            [false, false, false, true, true],
            [false, false, false, false, false],
            [false, false, false, false, false]
        ]))
    );
}

#[test]
fn graph_adjacency_fails_on_malformed_edges() {
    let dir = unique_temp_dir("rr-bad-edges");
    let edges = write_file(&dir, "edges.csv", "1;2\n");

    let output = run_rr(["graph", "adjacency", "--edges", path_str(&edges)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid edge line"), "stderr: {stderr}");
}
