//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `tessera` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so the shared
//! catalogue fixture under `crates/eval/tests/fixtures` resolves.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CATALOGUE: &str = "crates/eval/tests/fixtures/vehicles.catalogue.json";

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

fn tessera() -> Command {
    let mut cmd = cargo_bin_cmd!("tessera");
    cmd.current_dir(workspace_root());
    cmd
}

/// Write `contents` to `name` inside `dir` and return the absolute path.
fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn electric_car(dir: &TempDir) -> PathBuf {
    write_file(
        dir,
        "car.json",
        r#"{"type": "car", "engine": {"kind": "electric", "kwh": 75}}"#,
    )
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    tessera()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("flatten"));
}

#[test]
fn version_exits_0() {
    tessera()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tessera"));
}

// ──────────────────────────────────────────────
// 2. check
// ──────────────────────────────────────────────

#[test]
fn check_summarizes_catalogue() {
    tessera()
        .args(["check", CATALOGUE])
        .assert()
        .success()
        .stdout(predicate::str::contains("catalogue OK: 2 families, 6 types"))
        .stdout(predicate::str::contains("Engine (keyed on kind): Combustion, Electric"))
        .stdout(predicate::str::contains("Vehicle (predicates only): Car, Van"));
}

#[test]
fn check_json_output() {
    let output = tessera()
        .args(["--output", "json", "check", CATALOGUE])
        .output()
        .expect("run tessera");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(v["families"][0]["name"], "Engine");
    assert_eq!(v["families"][0]["discriminators"], serde_json::json!(["kind"]));
    assert_eq!(v["types"], serde_json::json!(["Garage", "Wheel"]));
}

#[test]
fn check_rejects_bad_catalogue() {
    let dir = TempDir::new().unwrap();
    let bad = write_file(
        &dir,
        "bad.json",
        r#"{"types": [{"name": "T", "fields": [{"name": "x", "type": "Widget"}]}]}"#,
    );
    tessera()
        .args(["check"])
        .arg(&bad)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("bad field type for 'T.x'"));
}

#[test]
fn check_missing_file() {
    tessera()
        .args(["check", "does/not/exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn check_reads_toml_catalogue() {
    let dir = TempDir::new().unwrap();
    let catalogue = write_file(
        &dir,
        "shapes.toml",
        r#"
[[families]]
name = "Shape"
discriminators = ["sides"]

[[families.members]]
name = "Triangle"
fields = [{ name = "sides", type = "int", default = 3 }]

[[families.members]]
name = "Square"
fields = [{ name = "sides", type = "int", default = 4 }]
"#,
    );
    let record = write_file(&dir, "shape.toml", "sides = 4\n");
    tessera()
        .arg("resolve")
        .arg(&catalogue)
        .args(["--family", "Shape"])
        .arg(&record)
        .assert()
        .success()
        .stdout("Square\n");
}

// ──────────────────────────────────────────────
// 3. resolve
// ──────────────────────────────────────────────

#[test]
fn resolve_prints_type_name() {
    let dir = TempDir::new().unwrap();
    let record = write_file(&dir, "r.json", r#"{"type": "CAR"}"#);
    tessera()
        .args(["resolve", CATALOGUE, "--family", "Vehicle"])
        .arg(&record)
        .assert()
        .success()
        .stdout("Car\n");
}

#[test]
fn resolve_no_match_exits_1() {
    let dir = TempDir::new().unwrap();
    let record = write_file(&dir, "r.json", r#"{"type": "bicycle"}"#);
    tessera()
        .args(["resolve", CATALOGUE, "--family", "Vehicle"])
        .arg(&record)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "no type in family 'Vehicle' matches the given record",
        ));
}

#[test]
fn resolve_error_as_json() {
    let dir = TempDir::new().unwrap();
    let record = write_file(&dir, "r.json", r#"{"type": "car", "num_doors": 4}"#);
    let output = tessera()
        .args(["--output", "json", "resolve", CATALOGUE, "--family", "Engine"])
        .arg(&record)
        .output()
        .expect("run tessera");
    assert_eq!(output.status.code(), Some(1));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).expect("json stderr");
    assert!(err["error"]
        .as_str()
        .unwrap()
        .contains("no type in family 'Engine'"));
}

#[test]
fn resolve_rejects_non_record() {
    let dir = TempDir::new().unwrap();
    let record = write_file(&dir, "r.json", "[1, 2]");
    tessera()
        .args(["resolve", CATALOGUE, "--family", "Vehicle"])
        .arg(&record)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not contain a record"));
}

// ──────────────────────────────────────────────
// 4. build
// ──────────────────────────────────────────────

#[test]
fn build_prints_typed_tree() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    tessera()
        .args(["build", CATALOGUE, "--target", "Vehicle"])
        .arg(&record)
        .assert()
        .success()
        .stdout(predicate::str::contains("Car {"))
        .stdout(predicate::str::contains("engine: Electric {"))
        .stdout(predicate::str::contains("kwh: 75"));
}

#[test]
fn build_json_is_tagged() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    let output = tessera()
        .args(["--output", "json", "build", CATALOGUE, "--target", "Car"])
        .arg(&record)
        .output()
        .expect("run tessera");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(v["kind"], "object_value");
    assert_eq!(v["type"], "Car");
    assert_eq!(v["fields"]["engine"]["type"], "Electric");
    assert_eq!(v["fields"]["engine"]["fields"]["kwh"]["kind"], "float_value");
    assert_eq!(v["fields"]["num_doors"]["value"], 4);
}

#[test]
fn build_reports_nested_field_path() {
    let dir = TempDir::new().unwrap();
    let record = write_file(
        &dir,
        "r.json",
        r#"{"type": "car", "engine": {"kind": "electric"}}"#,
    );
    tessera()
        .args(["build", CATALOGUE, "--target", "Vehicle"])
        .arg(&record)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required field: engine.kwh"));
}

#[test]
fn build_unknown_target() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    tessera()
        .args(["build", CATALOGUE, "--target", "Bicycle"])
        .arg(&record)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type: Bicycle"));
}

#[test]
fn quiet_suppresses_error_output() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    tessera()
        .args(["--quiet", "build", CATALOGUE, "--target", "Bicycle"])
        .arg(&record)
        .assert()
        .failure()
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 5. flatten
// ──────────────────────────────────────────────

#[test]
fn flatten_round_trips_record() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    let output = tessera()
        .args(["flatten", CATALOGUE, "--target", "Vehicle"])
        .arg(&record)
        .output()
        .expect("run tessera");
    assert!(output.status.success());
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(
        v,
        serde_json::json!({
            "type": "car",
            "num_doors": 4,
            "engine": {"kind": "electric", "kwh": 75.0},
            "wheels": []
        })
    );
}

#[test]
fn flatten_json_names_type() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    let output = tessera()
        .args(["--output", "json", "flatten", CATALOGUE, "--target", "Vehicle"])
        .arg(&record)
        .output()
        .expect("run tessera");
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json stdout");
    assert_eq!(v["type"], "Car");
    assert_eq!(v["record"]["engine"]["kind"], "electric");
}

// ──────────────────────────────────────────────
// 6. Logging
// ──────────────────────────────────────────────

#[test]
fn verbose_logs_resolution_to_stderr() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    tessera()
        .env_remove("TESSERA_LOG")
        .args(["--verbose", "resolve", CATALOGUE, "--family", "Vehicle"])
        .arg(&record)
        .assert()
        .success()
        .stdout("Car\n")
        .stderr(predicate::str::contains("resolved"));
}

#[test]
fn default_run_is_silent_on_stderr() {
    let dir = TempDir::new().unwrap();
    let record = electric_car(&dir);
    tessera()
        .env_remove("TESSERA_LOG")
        .args(["resolve", CATALOGUE, "--family", "Vehicle"])
        .arg(&record)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}
