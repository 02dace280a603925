//! CLI subprocess integration tests.
//!
//! These tests invoke the `waveloader` binary as a subprocess and verify
//! exit codes, stdout content, and JSON output stability.

use std::path::Path;
use std::process::{Command, Output};
use waveloader_server::TestServer;

/// The binary with a private home so no real config or install is touched.
fn waveloader_bin(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_waveloader"));
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join(".config"));
    cmd.env_remove("WAVELOADER_LOG");
    cmd
}

fn run_in(root: &Path, args: &[&str]) -> Output {
    waveloader_bin(root)
        .arg("--root")
        .arg(root.join("install"))
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn release_server(versions: &[&str]) -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path().to_path_buf());
    for version in versions {
        server.publish(
            &format!("{version}/core/waveviewer"),
            format!("#!/bin/sh\necho \"viewer {version} $*\"\n").as_bytes(),
        );
        server.publish(&format!("{version}/qml/main.qml"), b"Window {}");
    }
    server.refresh_manifest();
    (server, dir)
}

#[test]
fn cli_version_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = waveloader_bin(home.path()).arg("--version").output().unwrap();
    assert!(output.status.success(), "waveloader --version must exit 0");
    assert!(
        stdout(&output).contains("waveloader"),
        "version output must contain 'waveloader': {}",
        stdout(&output)
    );
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let output = waveloader_bin(home.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let out = stdout(&output);
    for cmd in ["run", "update", "list", "verify", "completions"] {
        assert!(out.contains(cmd), "help must list '{cmd}': {out}");
    }
}

#[test]
fn cli_list_empty_root() {
    let home = tempfile::tempdir().unwrap();
    let output = run_in(home.path(), &["list"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("no releases installed"));
}

#[test]
fn cli_list_json_empty() {
    let home = tempfile::tempdir().unwrap();
    let output = run_in(home.path(), &["list", "--json"]);
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed, serde_json::json!([]));
}

#[test]
fn cli_offline_with_nothing_installed_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let output = run_in(home.path(), &["--offline"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("nothing to run"));
}

#[test]
fn cli_unreachable_repository_falls_back() {
    let home = tempfile::tempdir().unwrap();
    let output = run_in(
        home.path(),
        &["--remote", "http://127.0.0.1:1", "--manifest-timeout", "2", "run"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("nothing to run"));
}

#[test]
fn cli_malformed_release_dir_is_store_error() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join("install/versions/latest")).unwrap();
    let output = run_in(home.path(), &["list"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("store error"), "{}", stderr(&output));
}

#[test]
fn cli_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = waveloader_bin(home.path())
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).contains("waveloader"));
}

#[test]
fn cli_update_then_list() {
    let (server, _srv) = release_server(&["1.0.0", "1.2.0"]);
    let home = tempfile::tempdir().unwrap();

    let output = run_in(home.path(), &["--remote", &server.url, "update", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["version"], "1.2.0");
    assert_eq!(report["fetched"], 2);

    let output = run_in(home.path(), &["list", "--json"]);
    let listed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["version"], "1.2.0");
}

#[test]
fn cli_update_offline_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = run_in(home.path(), &["--offline", "update"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("--offline"));
}

#[test]
fn cli_undecodable_manifest_is_manifest_error() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path().to_path_buf());
    server.publish("manifest.yaml", b"- not\n- a map\n");
    let home = tempfile::tempdir().unwrap();

    let output = run_in(home.path(), &["--remote", &server.url, "update"]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("manifest error"));
}

#[test]
fn cli_verify_detects_tampering() {
    let (server, _srv) = release_server(&["1.0.0"]);
    let home = tempfile::tempdir().unwrap();
    let output = run_in(home.path(), &["--remote", &server.url, "update"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_in(home.path(), &["--remote", &server.url, "verify"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("2/2 files passed"));

    std::fs::write(
        home.path().join("install/versions/1.0.0/qml/main.qml"),
        b"Window { tampered }",
    )
    .unwrap();
    let output = run_in(home.path(), &["--remote", &server.url, "verify", "1.0.0", "--json"]);
    assert_eq!(output.status.code(), Some(3));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["passed"], 1);
    assert_eq!(report["failed"][0]["path"], "qml/main.qml");
}

#[cfg(target_os = "linux")]
#[test]
fn cli_run_launches_newest_release() {
    let (server, _srv) = release_server(&["1.0.0", "1.1.0"]);
    let home = tempfile::tempdir().unwrap();

    let output = run_in(
        home.path(),
        &["--remote", &server.url, "run", "--", "--scene", "demo"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("viewer 1.1.0 --scene demo"), "{out}");
    assert!(out.contains("== CHILD EXIT : exit status: 0 =="), "{out}");
}

#[cfg(target_os = "linux")]
#[test]
fn cli_bare_arguments_reach_the_viewer() {
    let (server, _srv) = release_server(&["1.0.0"]);
    let home = tempfile::tempdir().unwrap();

    let output = run_in(home.path(), &["--remote", &server.url, "scene.ini", "--fullscreen"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("viewer 1.0.0 scene.ini --fullscreen"), "{out}");
}
