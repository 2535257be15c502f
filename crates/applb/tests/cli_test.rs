//! Integration tests for the `applb` CLI binary.
//!
//! Each test gets its own config and state file in a temp directory, so
//! runs never touch the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

const CONFIG: &str = r#"
[[networks]]
id = 1
name = "guest"
cidr = "10.1.1.0/24"
services = ["Lb", "Firewall"]

[[networks]]
id = 3
name = "public"
traffic_type = "Public"

[[accounts]]
id = 1
name = "admin"
"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
        Self { dir }
    }

    fn state(&self) -> std::path::PathBuf {
        self.dir.path().join("rules.json")
    }

    /// Build a [`Command`] for the `applb` binary with env isolation.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("applb");
        cmd.env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path())
            .env_remove("APPLB_OUTPUT")
            .env_remove("RUST_LOG")
            .env("APPLB_CONFIG", self.dir.path().join("config.toml"))
            .env("APPLB_STATE", self.state())
            .env("NO_COLOR", "1");
        cmd
    }

    fn create(&self, extra: &[&str]) -> assert_cmd::assert::Assert {
        let mut args = vec![
            "create",
            "--name",
            "alena",
            "--network",
            "1",
            "--source-port",
            "22",
            "--instance-port",
            "22",
        ];
        args.extend_from_slice(extra);
        self.cmd().args(args).assert()
    }
}

fn saved_rules(path: &Path) -> Vec<serde_json::Value> {
    let raw = std::fs::read_to_string(path).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    doc["rules"].as_array().unwrap().clone()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = Workspace::new().cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn help_lists_subcommands() {
    Workspace::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("create")
            .and(predicate::str::contains("delete"))
            .and(predicate::str::contains("list")),
    );
}

#[test]
fn config_path_reports_overrides() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rules.json"));
}

// ── Rule lifecycle ──────────────────────────────────────────────────

#[test]
fn create_get_list_delete_round_trip() {
    let ws = Workspace::new();

    ws.create(&["--ip", "10.1.1.1", "-o", "json"])
        .success()
        .stdout(predicate::str::contains("\"state\": \"Add\""));
    assert_eq!(saved_rules(&ws.state()).len(), 1);

    ws.cmd()
        .args(["get", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10.1.1.1:22"));

    ws.cmd()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alena"));

    ws.cmd()
        .args(["delete", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted rule 1"));
    assert!(saved_rules(&ws.state()).is_empty());
}

#[test]
fn ack_moves_rules_to_active() {
    let ws = Workspace::new();
    ws.create(&[]).success();

    ws.cmd()
        .arg("ack")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acknowledged 1 rule(s)"));

    let rules = saved_rules(&ws.state());
    assert_eq!(rules[0]["state"], "Active");
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn duplicate_endpoint_exits_with_conflict() {
    let ws = Workspace::new();
    ws.create(&["--ip", "10.1.1.1"]).success();
    ws.create(&["--ip", "10.1.1.1"])
        .code(6)
        .stderr(predicate::str::contains("Rule conflict on 10.1.1.1:22"));
}

#[test]
fn out_of_range_port_exits_with_usage() {
    let ws = Workspace::new();
    ws.cmd()
        .args([
            "create",
            "--name",
            "alena",
            "--network",
            "1",
            "--source-port",
            "65536",
            "--instance-port",
            "22",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid value for source port: 65536"));
}

#[test]
fn public_scheme_is_unsupported() {
    let ws = Workspace::new();
    ws.create(&["--scheme", "public"])
        .code(2)
        .stderr(predicate::str::contains("Only scheme of type Internal is supported"));
}

#[test]
fn public_source_network_is_rejected() {
    let ws = Workspace::new();
    ws.cmd()
        .args([
            "create",
            "--name",
            "alena",
            "--network",
            "3",
            "--guest-network",
            "1",
            "--source-port",
            "22",
            "--instance-port",
            "22",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Only traffic type Guest is supported"));
}

#[test]
fn missing_rule_exits_with_not_found() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["get", "2"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unable to find load balancer rule by id 2"));
    ws.cmd().args(["delete", "2"]).assert().code(4);
}

#[test]
fn missing_config_file_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["--config"])
        .arg(ws.dir.path().join("absent.toml"))
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}
