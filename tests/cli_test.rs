//! Binary-level checks for argument parsing, config validation, and the
//! history commands.

use assert_cmd::Command;
use predicates::prelude::*;

mod common;

fn parley() -> Command {
    let mut cmd = Command::cargo_bin("parley").unwrap();
    cmd.env_remove("PARLEY_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("PARLEY_HISTORY_DB")
        .env_remove("PARLEY_MODEL")
        .env_remove("PARLEY_BASE_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    parley()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("send"))
        .stdout(predicate::str::contains("history"));
}

#[test]
fn test_history_list_on_empty_store() {
    parley()
        .args(["--ephemeral", "history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No chat history found."));
}

#[test]
fn test_history_list_uses_storage_path() {
    let tmp = tempfile::TempDir::new().unwrap();
    let db = tmp.path().join("history");
    parley()
        .arg("--storage-path")
        .arg(&db)
        .args(["history", "list"])
        .assert()
        .success();
    assert!(db.exists());
}

#[test]
fn test_history_show_unknown_id_fails() {
    parley()
        .args(["--ephemeral", "history", "show", "01UNKNOWN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_temp_dir, config_path) =
        common::temp_config_file("api:\n  timeout_seconds: 0\n");
    parley()
        .arg("--config")
        .arg(config_path)
        .args(["--ephemeral", "history", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_send_without_api_key_fails() {
    parley()
        .args(["--ephemeral", "send", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing API key"));
}
