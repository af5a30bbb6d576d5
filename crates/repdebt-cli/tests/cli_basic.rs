//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a temporary config and ledger.

use std::path::{Path, PathBuf};
use std::process::Command;

struct Env {
    _dir: tempfile::TempDir,
    config: PathBuf,
    ledger: PathBuf,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        let ledger = dir.path().join("ledger.json");
        Self {
            _dir: dir,
            config,
            ledger,
        }
    }

    /// Run a CLI command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = Command::new(env!("CARGO_BIN_EXE_repdebt-cli"))
            .arg("--config")
            .arg(&self.config)
            .arg("--ledger")
            .arg(&self.ledger)
            .args(args)
            .env("RUST_LOG", "off")
            .output()
            .expect("Failed to execute CLI command");

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        (stdout, stderr, code)
    }

    fn ledger(&self) -> &Path {
        &self.ledger
    }
}

#[test]
fn test_stats_on_fresh_ledger() {
    let env = Env::new();
    let (stdout, _, code) = env.run(&["stats"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "No participant data yet.");
}

#[test]
fn test_register_report_and_me() {
    let env = Env::new();
    let (stdout, _, code) = env.run(&["register", "42", "Anna"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("joined"));

    let (_, _, code) = env.run(&["report", "42", "Anna", "15"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = env.run(&["me", "42"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Total reps: 15"));
    assert!(env.ledger().exists());
}

#[test]
fn test_report_rejects_non_positive_count() {
    let env = Env::new();
    let (_, stderr, code) = env.run(&["report", "42", "Anna", "-4"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("positive number"));

    let (stdout, _, _) = env.run(&["stats"]);
    assert_eq!(stdout.trim(), "No participant data yet.");
}

#[test]
fn test_me_for_stranger_fails() {
    let env = Env::new();
    let (_, stderr, code) = env.run(&["me", "999"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("haven't joined"));
}

#[test]
fn test_trigger_accrues_once_per_date() {
    let env = Env::new();
    env.run(&["register", "1", "Oleg"]);
    env.run(&["subscribe", "team-chat"]);

    let (stdout, _, code) = env.run(&["trigger", "morning", "--date", "2025-05-10"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("--> team-chat"));
    assert!(stdout.contains("Day 2: today's quota is 11 reps."));

    let (stdout, _, code) = env.run(&["trigger", "morning", "--date", "2025-05-10"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("already accrued"));

    let (stdout, _, _) = env.run(&["stats"]);
    assert!(stdout.contains("Oleg — 0 reps (debt: 11)"));
}

#[test]
fn test_config_set_get_validate() {
    let env = Env::new();
    let (_, _, code) = env.run(&["config", "set", "challenge.base_quota", "20"]);
    assert_eq!(code, 0);

    let (stdout, _, code) = env.run(&["config", "get", "challenge.base_quota"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "20");

    let (_, _, code) = env.run(&["config", "validate"]);
    assert_eq!(code, 0);

    let (_, _, code) = env.run(&["config", "set", "challenge.base_quota", "0"]);
    assert_eq!(code, 0);
    let (_, stderr, code) = env.run(&["config", "validate"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("base_quota"));
}
