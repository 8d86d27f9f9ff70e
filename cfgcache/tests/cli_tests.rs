//! # CLI Tests
//!
//! Each command runs the real binary, so every step is a separate process
//! attaching to the same segment through the config file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    config: PathBuf,
}

impl Fixture {
    fn new(extra: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let token = dir.path().join("namespace");
        fs::write(&token, b"").unwrap();

        let config = dir.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "[shared]\nservice_name = \"cli-test\"\n\n[cache]\nnamespace_token = \"{}\"\nttl_seconds = 60\n{}",
                token.display(),
                extra
            ),
        )
        .unwrap();
        Self { _dir: dir, config }
    }

    fn run(&self, args: &[&str]) -> Output {
        cfgcache(&self.config, args)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        // Runs before `_dir` is removed, so the token still resolves.
        let _ = cfgcache(&self.config, &["purge"]);
    }
}

fn cfgcache(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cfgcache"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run cfgcache")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_put_then_get_across_invocations() {
    let fx = Fixture::new("");

    assert!(fx.run(&["put", "app.name", "MyApp"]).status.success());

    let out = fx.run(&["get", "app.name"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "MyApp\n");
}

#[test]
fn test_get_miss_exits_nonzero() {
    let fx = Fixture::new("");

    let out = fx.run(&["get", "missing.key"]);
    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_delete() {
    let fx = Fixture::new("");

    assert!(!fx.run(&["delete", "missing.key"]).status.success());
    assert!(fx.run(&["put", "db.host", "10.0.0.5"]).status.success());
    assert!(fx.run(&["delete", "db.host"]).status.success());
    assert!(!fx.run(&["get", "db.host"]).status.success());
}

#[test]
fn test_stats_is_json() {
    let fx = Fixture::new("segment_capacity_bytes = 4096\n");
    assert!(fx.run(&["put", "k", "v"]).status.success());

    let out = fx.run(&["stats"]);
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(stats["segment"]["total_size"], 4096);
    assert_eq!(stats["segment"]["slots"], 1);
    assert_eq!(stats["segment"]["lock_holders"], 1);
    assert_eq!(stats["lock_available"], 1);
    assert_eq!(stats["max_lock_holders"], 1);
}

#[test]
fn test_purge_empties_cache() {
    let fx = Fixture::new("");
    assert!(fx.run(&["put", "k", "v"]).status.success());

    assert!(fx.run(&["purge"]).status.success());
    assert!(!fx.run(&["get", "k"]).status.success());
}

#[test]
fn test_disabled_cache_rejects_commands() {
    let fx = Fixture::new("enabled = false\n");

    assert!(!fx.run(&["put", "k", "v"]).status.success());
    assert!(fx.run(&["purge"]).status.success());
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let out = cfgcache(&dir.path().join("absent.toml"), &["stats"]);
    assert!(!out.status.success());
}
