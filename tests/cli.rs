use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn editcheck(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("editcheck").expect("binary exists");
    cmd.current_dir(dir)
        .env_remove("EDITCHECK_LOG")
        .env_remove("EDITCHECK_CLASSIFIER_URL");
    cmd
}

fn revisions(original: &str, edited: &str) -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("original.md"), original).unwrap();
    fs::write(dir.path().join("edited.md"), edited).unwrap();
    fs::write(
        dir.path().join("editcheck.toml"),
        "[checks.paste]\nminimum_characters = 10\n",
    )
    .unwrap();
    dir
}

#[test]
fn help_displays_usage() {
    let dir = tempdir().unwrap();
    editcheck(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn pasted_insertion_is_reported_as_json() {
    let dir = revisions(
        "The cat sat.\n",
        "The cat sat on the mat, which was disgusting.\n",
    );
    editcheck(dir.path())
        .args([
            "check",
            "original.md",
            "edited.md",
            "--config",
            "editcheck.toml",
            "--trigger",
            "change",
            "--format",
            "json",
            "--mark-pasted",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"total_findings\": 1"))
        .stdout(predicate::str::contains("\"check\": \"paste\""))
        .stdout(predicate::str::contains("\"id\": \"paste-1\""))
        .stdout(predicate::str::contains(
            "\"text\": \" on the mat, which was disgusting\"",
        ));
}

#[test]
fn short_paste_is_ignored() {
    let dir = revisions("The cat sat.\n", "The cat sat down.\n");
    editcheck(dir.path())
        .args([
            "check",
            "original.md",
            "edited.md",
            "-c",
            "editcheck.toml",
            "--mark-pasted",
            "--no-color",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No findings"));
}

#[test]
fn no_fail_keeps_exit_code_zero() {
    let dir = revisions(
        "The cat sat.\n",
        "The cat sat on the mat, which was disgusting.\n",
    );
    editcheck(dir.path())
        .args([
            "check",
            "original.md",
            "edited.md",
            "--config",
            "editcheck.toml",
            "--mark-pasted",
            "--no-color",
            "--no-fail",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[paste]"))
        .stdout(predicate::str::contains("1 finding in edited.md"));
}

#[test]
fn typed_text_without_classifier_has_no_findings() {
    let dir = revisions(
        "The cat sat.\n",
        "The cat sat on the mat, which was disgusting.\n",
    );
    editcheck(dir.path())
        .args([
            "check",
            "original.md",
            "edited.md",
            "--config",
            "editcheck.toml",
            "--trigger",
            "all",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_findings\": 0"))
        .stdout(predicate::str::contains("\"trigger\": \"all_checks\""));
}

#[test]
fn hidden_namespace_has_no_findings() {
    let dir = revisions(
        "The cat sat.\n",
        "The cat sat on the mat, which was disgusting.\n",
    );
    editcheck(dir.path())
        .args([
            "check",
            "original.md",
            "edited.md",
            "--config",
            "editcheck.toml",
            "--mark-pasted",
            "--namespace",
            "2",
            "-o",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_findings\": 0"));
}

#[test]
fn unknown_config_option_fails() {
    let dir = revisions("A.\n", "B.\n");
    fs::write(
        dir.path().join("bad.toml"),
        "[checks.paste]\nminimum_chars = 10\n",
    )
    .unwrap();
    editcheck(dir.path())
        .args(["check", "original.md", "edited.md", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn unknown_check_in_config_fails() {
    let dir = revisions("A.\n", "B.\n");
    fs::write(dir.path().join("bad.toml"), "[checks.spelling]\nenabled = true\n").unwrap();
    editcheck(dir.path())
        .args(["check", "original.md", "edited.md", "--config", "bad.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown check 'spelling'"));
}

#[test]
fn missing_file_fails() {
    let dir = revisions("A.\n", "B.\n");
    editcheck(dir.path())
        .args(["check", "original.md", "missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn completion_script_is_generated() {
    let dir = tempdir().unwrap();
    editcheck(dir.path())
        .args(["--completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("editcheck"));
}
