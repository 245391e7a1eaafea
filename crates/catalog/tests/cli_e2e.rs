#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
  "entities": [
    {"name": "Network", "attrs": [{"name": "cidr", "kind": "string"}]},
    {"name": "Server", "attrs": [
      {"name": "hostname", "kind": "string", "mandatory": true},
      {"name": "ports", "kind": "array_string"},
      {"name": "network", "kind": "object", "referral": ["Network"], "delete_in_chain": true}
    ]}
  ],
  "groups": ["admins"]
}"#;

fn catalog_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("catalog"));
    cmd.env("CATALOG_HOME", dir.as_os_str())
        .env_remove("CATALOG_USER")
        .env_remove("CATALOG_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    let schema = temp.path().join("schema.json");
    fs::write(&schema, SCHEMA).unwrap();
    catalog_cmd(temp.path())
        .args(["schema", schema.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Schema loaded: 2 entities"));
    temp
}

#[test]
fn test_entry_lifecycle_workflow() {
    let temp = setup();
    let dir = temp.path();

    catalog_cmd(dir)
        .args(["create", "Network", "net-a", "--set", "cidr=10.0.0.0/24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry created: Network/net-a"));

    // JSON output carries the entry id.
    let output = catalog_cmd(dir)
        .args(["--json", "view", "Network/net-a"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let net_id = parsed["snapshots"][0]["id"].as_u64().unwrap();

    catalog_cmd(dir)
        .args([
            "create",
            "Server",
            "web-01",
            "--attrs",
            &format!(r#"{{"hostname": "web-01.tokyo", "ports": ["80"], "network": {}}}"#, net_id),
        ])
        .assert()
        .success();

    catalog_cmd(dir)
        .args(["append", "Server/web-01", "ports", "443"])
        .assert()
        .success();

    catalog_cmd(dir)
        .args(["view", "Server/web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-01.tokyo"))
        .stdout(predicate::str::contains(r#"["80","443"]"#))
        .stdout(predicate::str::contains("net-a"));

    catalog_cmd(dir)
        .args(["referrers", "Network/net-a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server/web-01"));

    // Chained delete takes the orphaned network with it.
    catalog_cmd(dir)
        .args(["delete", "Server/web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry deleted: web-01"));
    catalog_cmd(dir)
        .args(["view", "Network/net-a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));

    catalog_cmd(dir)
        .args(["restore", "Server/web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry restored: web-01"));
    catalog_cmd(dir)
        .args(["view", "Network/net-a"])
        .assert()
        .success();
}

#[test]
fn test_search_and_history() {
    let temp = setup();
    let dir = temp.path();

    for (name, host) in [("web-01", "web-01.tokyo"), ("web-02", "web-02.osaka")] {
        catalog_cmd(dir)
            .args(["create", "Server", name, "--set", &format!("hostname={}", host)])
            .assert()
            .success();
    }

    catalog_cmd(dir)
        .args(["search", "-e", "Server", "-a", "hostname=osaka"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server/web-02"))
        .stdout(predicate::str::contains("web-01").not())
        .stdout(predicate::str::contains("1 entries"));

    catalog_cmd(dir)
        .args(["find", "tokyo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server/web-01"));

    catalog_cmd(dir)
        .args(["update", "Server/web-01", "--set", "hostname=web-01.kyoto"])
        .assert()
        .success();

    catalog_cmd(dir)
        .args(["history", "Server/web-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-01.tokyo -> web-01.kyoto"));
}

#[test]
fn test_validation_errors_exit_nonzero() {
    let temp = setup();
    let dir = temp.path();

    catalog_cmd(dir)
        .args(["create", "Server", "web-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation failed"));

    catalog_cmd(dir)
        .args(["view", "web-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid entry selector"));
}
