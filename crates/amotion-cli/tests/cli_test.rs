//! Integration tests for the `amotion` CLI binary.
//!
//! Argument parsing, help output, completions and configuration errors,
//! all without a reachable unit.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// `amotion` with every `AMOTION_*` variable cleared and config
/// directories pointed at a path that does not exist.
fn amotion_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("amotion");
    cmd.env("HOME", "/tmp/amotion-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/amotion-cli-test-nonexistent")
        .env_remove("AMOTION_PROFILE")
        .env_remove("AMOTION_HOST")
        .env_remove("AMOTION_USERNAME")
        .env_remove("AMOTION_PASSWORD")
        .env_remove("AMOTION_OUTPUT")
        .env_remove("AMOTION_TIMEOUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = amotion_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    amotion_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("aMotion")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("onboard")),
    );
}

#[test]
fn test_version_flag() {
    amotion_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amotion"));
}

#[test]
fn test_completions_bash() {
    amotion_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_config_path_prints_location() {
    amotion_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

/// `amotion` reading a config file with one plaintext-password profile.
fn amotion_cmd_with_config(dir: &tempfile::TempDir) -> assert_cmd::Command {
    let config_dir = dir.path().join("amotion");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "default_profile = \"attic\"\n\n\
         [profiles.attic]\n\
         host = \"192.0.2.10\"\n\
         username = \"admin\"\n\
         password = \"hunter2\"\n\
         model = \"aMotion\"\n",
    )
    .unwrap();

    let mut cmd = amotion_cmd();
    cmd.env("HOME", dir.path()).env("XDG_CONFIG_HOME", dir.path());
    cmd
}

#[test]
fn test_config_show_masks_the_password() {
    let dir = tempfile::tempdir().unwrap();
    amotion_cmd_with_config(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[profiles.attic]")
                .and(predicate::str::contains("password = \"****\""))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_profiles_lists_names() {
    let dir = tempfile::tempdir().unwrap();
    amotion_cmd_with_config(&dir)
        .args(["--output", "plain", "config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("attic"));
}

fn write_malformed_config(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let config_dir = dir.path().join("amotion");
    std::fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("config.toml");
    std::fs::write(&path, "[profiles.attic\nhost = \"192.0.2.10\"\n").unwrap();
    path
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_malformed_config(&dir);

    let output = amotion_cmd()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("config loading failed"), "Expected parse error:\n{text}");
    assert!(!text.contains("No unit configured"), "Parse error was hidden:\n{text}");
}

#[test]
fn test_onboard_leaves_a_malformed_config_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_malformed_config(&dir);
    let before = std::fs::read_to_string(&path).unwrap();

    let output = amotion_cmd()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .args(["--username", "admin", "--password", "secret", "onboard", "192.0.2.10", "--plaintext"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_status_without_config_suggests_onboarding() {
    let output = amotion_cmd().arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("onboard"), "Expected onboarding hint:\n{text}");
}

#[test]
fn test_host_without_credentials_is_an_auth_error() {
    let output = amotion_cmd()
        .args(["--host", "192.0.2.10", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No credentials"), "Expected credentials error:\n{text}");
}

#[test]
fn test_unknown_profile_lists_available() {
    let output = amotion_cmd()
        .args(["--profile", "attic", "status"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("attic"), "Expected profile name in error:\n{text}");
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_set_requires_a_change() {
    amotion_cmd().arg("set").assert().code(2);
}

#[test]
fn test_set_rejects_unknown_mode() {
    amotion_cmd()
        .args(["set", "--mode", "turbo"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("turbo"));
}

#[test]
fn test_invalid_output_format() {
    amotion_cmd()
        .args(["--output", "xml", "status"])
        .assert()
        .code(2);
}
