//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `migr8` binary against throwaway project
//! trees and verify exit codes, stdout content, and stderr content.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const APP: &str = "import { Button } from '@old/ui';\n\nexport const App = () => (\n  <Button variant=\"primary\" size=\"large\">Go</Button>\n);\n";

const RULES: &str = r#"{
  "sourcePackage": "@old/ui",
  "rules": [
    { "component": "Button", "rename": { "variant": "kind" }, "remove": ["size"] }
  ]
}
"#;

/// A project with one component file and one rule document.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/App.jsx", APP);
    write(dir.path(), "migr8-rules/old-ui.json", RULES);
    dir
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

/// Helper: create a Command for the `migr8` binary, rooted at `dir`.
fn migr8(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("migr8");
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = tempfile::tempdir().unwrap();
    migr8(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rule-driven JSX component migration"));
}

#[test]
fn version_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    migr8(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("migr8"));
}

// ──────────────────────────────────────────────
// 2. Scan and report
// ──────────────────────────────────────────────

#[test]
fn scan_counts_imports_and_elements() {
    let dir = project();
    migr8(&dir)
        .arg("scan")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 1 files: 1 imports, 1 elements"))
        .stdout(predicate::str::contains("@old/ui (1 elements)"));
}

#[test]
fn scan_json_is_the_project_graph() {
    let dir = project();
    let out = migr8(&dir)
        .args(["scan", "--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let graph: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(graph["elements"].as_array().unwrap().len(), 1);
    assert_eq!(graph["imports"][0]["local_name"], "Button");
}

#[test]
fn report_lists_prop_values() {
    let dir = project();
    migr8(&dir)
        .args(["report", "--package", "@old/ui"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Button"))
        .stdout(predicate::str::contains("variant: \"primary\" x1"));
}

#[test]
fn excluded_directories_are_not_scanned() {
    let dir = project();
    write(dir.path(), "vendor/Lib.jsx", "import { Chip } from '@old/ui';\n<Chip />;\n");
    migr8(&dir)
        .args(["scan", "--exclude", "vendor,node_modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 1 files"));
}

#[test]
fn missing_root_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    migr8(&dir)
        .args(["scan", "does-not-exist"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("project root"));
}

// ──────────────────────────────────────────────
// 3. Rules
// ──────────────────────────────────────────────

#[test]
fn validate_rules_accepts_good_documents() {
    let dir = project();
    migr8(&dir)
        .arg("validate-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid old-ui.json"));
}

#[test]
fn validate_rules_accepts_component_name_documents() {
    let dir = project();
    write(
        dir.path(),
        "migr8-rules/old-ui.json",
        r#"{ "sourcePackage": "@old/ui", "componentRules": [ { "componentName": "Button", "remove": ["size"] } ] }"#,
    );
    migr8(&dir)
        .arg("validate-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid old-ui.json"));
}

#[test]
fn validate_rules_rejects_schema_violations() {
    let dir = project();
    write(
        dir.path(),
        "migr8-rules/bad.json",
        r#"{ "sourcePackage": "x", "rules": [ { "component": "A", "remove": "size" } ] }"#,
    );
    migr8(&dir)
        .arg("validate-rules")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid bad.json"));
}

#[test]
fn validate_rules_reports_incomplete_sets() {
    let dir = project();
    write(
        dir.path(),
        "migr8-rules/todo.json",
        r#"{ "sourcePackage": "chips", "rules": [ { "component": "TODO" } ] }"#,
    );
    migr8(&dir)
        .arg("validate-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("valid todo.json (incomplete"));
}

#[test]
fn scaffold_prints_placeholders_for_used_components() {
    let dir = project();
    let out = migr8(&dir)
        .args(["scaffold", "--package", "@old/ui", "--rules-dir", "fresh-rules"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["sourcePackage"], "@old/ui");
    assert_eq!(doc["rules"][0], serde_json::json!({ "component": "Button" }));
}

#[test]
fn scaffold_write_creates_the_rule_document() {
    let dir = project();
    migr8(&dir)
        .args(["scaffold", "--package", "@next/ui", "--rules-dir", "generated", "--write"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next-ui.json"));
    assert!(dir.path().join("generated/next-ui.json").is_file());
}

// ──────────────────────────────────────────────
// 4. Migrate
// ──────────────────────────────────────────────

#[test]
fn migrate_dry_run_prints_diff_and_writes_nothing() {
    let dir = project();
    migr8(&dir)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("--- a/src/App.jsx"))
        .stdout(predicate::str::contains("+  <Button kind=\"primary\">Go</Button>"))
        .stdout(predicate::str::contains("dry run: nothing written"));
    assert_eq!(fs::read_to_string(dir.path().join("src/App.jsx")).unwrap(), APP);
}

#[test]
fn migrate_apply_writes_and_backs_up() {
    let dir = project();
    migr8(&dir)
        .args(["migrate", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("files written: 1 of 1"));
    let text = fs::read_to_string(dir.path().join("src/App.jsx")).unwrap();
    assert!(text.contains("<Button kind=\"primary\">Go</Button>"));

    let out = migr8(&dir)
        .args(["backups", "list", "--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let records: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let id = records[0]["id"].as_str().unwrap().to_string();

    migr8(&dir)
        .args(["backups", "verify", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("verified"));
    migr8(&dir)
        .args(["backups", "restore", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("restored 1 file(s)"));
    assert_eq!(fs::read_to_string(dir.path().join("src/App.jsx")).unwrap(), APP);
}

#[test]
fn migrate_apply_twice_changes_nothing_the_second_time() {
    let dir = project();
    migr8(&dir)
        .args(["migrate", "--apply", "--no-backup"])
        .assert()
        .success();
    migr8(&dir)
        .args(["migrate", "--apply", "--no-backup", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files\": []"));
    assert!(!dir.path().join(".migr8").exists());
}

#[test]
fn migrate_json_report_counts_elements() {
    let dir = project();
    let out = migr8(&dir)
        .args(["migrate", "--output", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["mode"], "dry_run");
    assert_eq!(report["elements"]["matched"], 1);
    assert_eq!(report["files"][0]["written"], false);
}

#[test]
fn migrate_unknown_rule_set_exits_1() {
    let dir = project();
    migr8(&dir)
        .args(["migrate", "--rule-set", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no rule set named 'nope'"));
}

#[test]
fn migrate_without_rules_exits_1_with_json_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/App.jsx", APP);
    migr8(&dir)
        .args(["migrate", "--output", "json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn config_file_supplies_rules_dir() {
    let dir = project();
    fs::rename(dir.path().join("migr8-rules"), dir.path().join("custom")).unwrap();
    write(dir.path(), "migr8.toml", "rules_dir = \"custom\"\n");
    migr8(&dir)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("files to change: 1"));
}

#[test]
fn quiet_suppresses_output() {
    let dir = project();
    migr8(&dir)
        .args(["migrate", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
