// SPDX-License-Identifier: MIT OR Apache-2.0
//! Integration tests for the `nomos` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn nomos() -> Command {
    Command::cargo_bin("nomos").expect("binary `nomos` should be built")
}

#[test]
fn help_exits_zero_and_mentions_compile() {
    nomos()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compile"));
}

#[test]
fn version_shows_version_string() {
    nomos()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn compile_empty_directory_emits_an_empty_json_object() {
    let dir = tempfile::tempdir().unwrap();
    nomos()
        .args(["compile", dir.path().to_str().unwrap(), "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{}"));
}

#[test]
fn compile_writes_to_out_and_infers_format_from_its_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.csl"), "port: 5432\n").unwrap();
    let out = dir.path().join("out.tfvars");

    nomos()
        .args([
            "compile",
            dir.path().to_str().unwrap(),
            "--format",
            "json",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "port = 5432\n");
}

#[test]
fn compile_nonexistent_path_fails_with_a_nonzero_exit_code() {
    nomos()
        .args(["compile", "/nonexistent/path.csl"])
        .assert()
        .failure();
}
