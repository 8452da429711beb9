use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("layout").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_lays_out_a_fixture_to_stdout() {
    let exe = assert_cmd::cargo_bin!("beluga");
    let output = Command::new(exe)
        .arg(fixture("cycle_with_tail.json"))
        .output()
        .expect("run beluga");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    let positions = json["positions"].as_object().expect("positions object");
    assert!(positions.contains_key("A"));
    assert!(positions.values().all(|p| p["x"].is_f64() && p["y"].is_f64()));
    assert!(json["report"]["steps"].as_u64().is_some());
}

#[test]
fn cli_writes_positions_to_out_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("positions.json");

    let exe = assert_cmd::cargo_bin!("beluga");
    Command::new(exe)
        .args([
            "--positions-only",
            "--pretty",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("anchored_grid.json").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let json: Value = serde_json::from_str(&fs::read_to_string(&out).expect("read out")).unwrap();
    assert!(json.get("report").is_none());
    assert_eq!(json.as_object().map(|m| m.len()), Some(16));
}

#[test]
fn cli_reads_stdin_and_is_reproducible() {
    let doc = r#"{ "edges": [
        { "source": "a", "target": "b" },
        { "source": "b", "target": "c" }
    ] }"#;
    let run = || {
        let exe = assert_cmd::cargo_bin!("beluga");
        assert_cmd::Command::new(exe)
            .args(["--seed", "5", "-"])
            .write_stdin(doc)
            .output()
            .expect("run beluga")
    };
    let first = run();
    let second = run();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn cli_reports_layout_errors() {
    let doc = r#"{ "vertices": ["a"], "fixed": { "ghost": { "x": 0.0, "y": 0.0 } } }"#;
    let exe = assert_cmd::cargo_bin!("beluga");
    let output = assert_cmd::Command::new(exe)
        .write_stdin(doc)
        .output()
        .expect("run beluga");
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown vertex"), "stderr: {stderr}");
}

#[test]
fn cli_rejects_malformed_json() {
    let exe = assert_cmd::cargo_bin!("beluga");
    let output = assert_cmd::Command::new(exe)
        .write_stdin("{ not json")
        .output()
        .expect("run beluga");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("JSON error"));
}
