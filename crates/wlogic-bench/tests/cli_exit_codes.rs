// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! End-to-end exit codes and report line of the `wlogic-bench` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn bench(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wlogic-bench").unwrap();
    cmd.env("RUST_LOG", "warn")
        .arg("--store-dir")
        .arg(dir.path());
    cmd
}

#[test]
fn validation_failures_map_to_their_codes() {
    let cases: &[(&[&str], i32)] = &[
        (&[], 1),
        (&["disk", "5"], 1),
        (&["disk", "5", "5", "extra"], 1),
        (&["floppy", "5", "5"], 2),
        (&["disk", "many", "5"], 3),
        (&["disk", "-x", "5"], 3),
        (&["disk", "-2", "5"], 4),
        (&["disk", "5", "1.5"], 5),
        (&["disk", "5", "-y"], 5),
        (&["disk", "5", "-1"], 6),
    ];
    let dir = tempfile::tempdir().unwrap();
    for (args, code) in cases {
        bench(&dir)
            .args(*args)
            .assert()
            .code(*code)
            .stdout(predicate::str::is_empty());
    }
}

#[test]
fn zero_users_exits_before_touching_the_store() {
    let dir = tempfile::tempdir().unwrap();
    bench(&dir)
        .args(["disk", "0", "5"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("numUsers"));
    assert!(!dir.path().join("facts.wlog").exists());
}

#[test]
fn zero_runs_exits_with_its_code() {
    let dir = tempfile::tempdir().unwrap();
    bench(&dir)
        .args(["disk", "5", "0"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("numRuns"));
    assert!(!dir.path().join("facts.wlog").exists());
}

#[test]
fn memory_run_prints_one_report_line() {
    let dir = tempfile::tempdir().unwrap();
    let line = r"^users:3,backend:memory,runs:2;time_ms:total=\d+,cold_start=\d+,min=\d+,max=\d+,mean=\d+\n$";
    bench(&dir)
        .args(["memory", "3", "2"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(line).unwrap());
}

#[test]
fn disk_run_with_memory_tracking_reports_both_blocks() {
    let dir = tempfile::tempdir().unwrap();
    bench(&dir)
        .args(["--track-memory", "--seed", "7", "disk", "3", "1"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("users:3,backend:disk,runs:1;time_ms:"))
        .stdout(predicate::str::contains(";memory_mb:total="));
    assert!(dir.path().join("facts.wlog").exists());
}

#[test]
fn missing_config_file_is_a_benchmark_failure() {
    let dir = tempfile::tempdir().unwrap();
    bench(&dir)
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["memory", "2", "1"])
        .assert()
        .code(7)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("absent.json"));
}

#[test]
fn config_file_settings_are_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bench.json");
    std::fs::write(
        &config,
        r#"{"seed": 3, "inference": {"max_iterations": 10, "step_size": 0.25}}"#,
    )
    .unwrap();
    bench(&dir)
        .arg("--config")
        .arg(&config)
        .args(["memory", "2", "1"])
        .assert()
        .success();
}

#[test]
fn invalid_solver_config_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bench.json");
    std::fs::write(&config, r#"{"inference": {"step_size": 0.0}}"#).unwrap();
    bench(&dir)
        .arg("--config")
        .arg(&config)
        .args(["memory", "2", "1"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("trial 0 failed"));
}
