//! Integration tests for CLI execution using `assert_cmd`.
//!
//! These tests exercise end-to-end command handling by invoking the
//! compiled binary against a serialised graph file and verifying the
//! emitted manifest, the metadata output, and the exit codes.

use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

const GRAPH_JSON: &str = r#"{
  "settings": {"build_dir": "//out/Debug/", "root_path": "/src"},
  "toolchains": [{
    "name": "default",
    "tools": [{
      "name": "rustc",
      "kind": "rust",
      "source_kinds": ["rs"],
      "command": "rustc --crate-name {{crate_name}} {{source}} -o {{output}} {{externs}}",
      "outputs": ["{{output_dir}}/{{rustc_output_prefix}}{{crate_name}}{{rustc_output_extension}}"]
    }, {
      "name": "stamp",
      "kind": "general",
      "command": "touch {{output}}"
    }]
  }],
  "targets": [
    {
      "label": "//bar:mylib",
      "type": "rust_library",
      "sources": ["//bar/lib.rs"],
      "rust": {"crate_name": "mylib", "crate_root": "//bar/lib.rs"},
      "metadata": {"doc_files": ["//bar/readme.md"]}
    },
    {
      "label": "//foo:app",
      "type": "executable",
      "sources": ["//foo/main.rs"],
      "private_deps": ["//bar:mylib"],
      "rust": {"crate_name": "app", "crate_root": "//foo/main.rs", "edition": "2021"}
    }
  ]
}"#;

fn write_graph(dir: &std::path::Path) {
    fs::write(dir.join("graph.json"), GRAPH_JSON).expect("write graph file");
}

#[test]
fn gen_writes_manifest_and_is_idempotent() {
    let temp = tempdir().expect("temp dir");
    write_graph(temp.path());

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    cmd.current_dir(temp.path()).arg("gen").arg(".").assert().success();

    let manifest_path = temp.path().join("build.tagane");
    let manifest = fs::read_to_string(&manifest_path).expect("manifest");
    assert!(manifest.contains("build obj/foo/app: rustc ../../foo/main.rs"));
    assert!(manifest.contains("--extern mylib=obj/bar/libmylib.rlib"));
    assert!(manifest.contains("rule rustc\n"));

    // A second run over an unchanged graph writes the same bytes and
    // leaves the file untouched.
    let mtime = fs::metadata(&manifest_path).expect("metadata").modified().expect("mtime");
    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    cmd.current_dir(temp.path()).arg("gen").arg(".").assert().success();
    let manifest_after = fs::read_to_string(&manifest_path).expect("manifest");
    assert_eq!(manifest, manifest_after);
    let mtime_after = fs::metadata(&manifest_path).expect("metadata").modified().expect("mtime");
    assert_eq!(mtime, mtime_after);
}

#[test]
fn gen_emits_rust_project_on_request() {
    let temp = tempdir().expect("temp dir");
    write_graph(temp.path());

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    cmd.current_dir(temp.path())
        .arg("gen")
        .arg(".")
        .arg("--rust-project")
        .assert()
        .success();

    let project = fs::read_to_string(temp.path().join("rust-project.json")).expect("project");
    let parsed: serde_json::Value = serde_json::from_str(&project).expect("valid JSON");
    assert_eq!(parsed["crates"].as_array().expect("crates").len(), 2);
    assert_eq!(parsed["crates"][1]["edition"], "2015");
}

#[test]
fn meta_prints_collected_values() {
    let temp = tempdir().expect("temp dir");
    write_graph(temp.path());

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    let assert = cmd
        .current_dir(temp.path())
        .arg("meta")
        .arg(".")
        .arg("//foo:app")
        .arg("--data")
        .arg("doc_files")
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert_eq!(output.trim(), "//bar/readme.md");
}

#[test]
fn meta_rebases_file_values() {
    let temp = tempdir().expect("temp dir");
    write_graph(temp.path());

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    let assert = cmd
        .current_dir(temp.path())
        .arg("meta")
        .arg(".")
        .arg("//foo:app")
        .arg("--data")
        .arg("doc_files")
        .arg("--rebase-files")
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert_eq!(output.trim(), "../../bar/readme.md");
}

#[test]
fn meta_unknown_target_fails_with_exit_code_one() {
    let temp = tempdir().expect("temp dir");
    write_graph(temp.path());

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    cmd.current_dir(temp.path())
        .arg("meta")
        .arg(".")
        .arg("//gone:target")
        .arg("--data")
        .arg("doc_files")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn gen_reports_malformed_graph() {
    let temp = tempdir().expect("temp dir");
    fs::write(temp.path().join("graph.json"), "not json").expect("write graph file");

    let mut cmd = Command::cargo_bin("tagane").expect("binary");
    cmd.current_dir(temp.path())
        .arg("gen")
        .arg(".")
        .assert()
        .failure()
        .code(1);
}
