mod support;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn teamdeck(dir: &TempDir) -> Command {
    let mut cmd = support::teamdeck_cmd();
    cmd.current_dir(dir.path());
    cmd.env_remove("TEAMDECK_ACTOR");
    cmd.env_remove("TEAMDECK_DATA_DIR");
    cmd
}

fn init_with_users(dir: &TempDir, users: &[&str]) {
    teamdeck(dir).arg("init").assert().success();
    for user in users {
        teamdeck(dir)
            .args(["user", "add", user, user])
            .assert()
            .success();
    }
}

#[test]
fn init_creates_layout_and_config() {
    let dir = tempfile::tempdir().unwrap();

    teamdeck(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("initialized data directory"));

    assert!(dir.path().join("teamdeck.toml").exists());
    assert!(dir.path().join("boards").is_dir());
    assert!(dir.path().join("users.json").exists());

    // Running again is a no-op.
    teamdeck(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(contains("nothing to do"));
}

#[test]
fn board_lifecycle_over_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["alice"]);

    teamdeck(&dir)
        .args(["board", "new", "Launch", "--actor", "alice"])
        .assert()
        .success()
        .stdout(contains("board new: created board_"));

    teamdeck(&dir)
        .args(["board", "ls", "--actor", "alice"])
        .assert()
        .success()
        .stdout(contains("1 board(s)"));
}

#[test]
fn json_output_uses_the_envelope() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["alice"]);

    teamdeck(&dir)
        .args(["board", "new", "Launch", "--actor", "alice", "--json"])
        .assert()
        .success()
        .stdout(contains("\"schema_version\": \"teamdeck.v1\""))
        .stdout(contains("\"status\": \"success\""))
        .stdout(contains("\"command\": \"board new\""));
}

#[test]
fn missing_actor_is_a_user_error() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &[]);

    teamdeck(&dir)
        .args(["board", "ls"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("actor is required"));
}

#[test]
fn actor_can_come_from_the_environment() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["alice"]);

    teamdeck(&dir)
        .env("TEAMDECK_ACTOR", "alice")
        .args(["board", "ls"])
        .assert()
        .success()
        .stdout(contains("0 board(s)"));
}

#[test]
fn missing_board_maps_to_exit_code_2_and_json_error() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["alice"]);

    teamdeck(&dir)
        .args(["board", "show", "board_missing", "--actor", "alice"])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error: Not found"));

    teamdeck(&dir)
        .args(["board", "show", "board_missing", "--actor", "alice", "--json"])
        .assert()
        .failure()
        .code(2)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("\"kind\": \"not_found\""));
}

#[test]
fn subtask_flow_over_the_cli() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["owner", "worker"]);

    let output = teamdeck(&dir)
        .args(["task", "new", "release", "--actor", "owner", "--json"])
        .output()
        .unwrap();
    let task_id = extract_id(&output.stdout, "task_");

    let output = teamdeck(&dir)
        .args([
            "task",
            "subtask-new",
            &task_id,
            "write notes",
            "--assignee",
            "worker",
            "--actor",
            "owner",
            "--json",
        ])
        .output()
        .unwrap();
    let subtask_id = extract_id(&output.stdout, "subtask_");

    teamdeck(&dir)
        .args(["task", "inbox", "--actor", "worker"])
        .assert()
        .success()
        .stdout(contains("[pending]"));

    teamdeck(&dir)
        .args(["task", "confirm", &subtask_id, "--actor", "worker"])
        .assert()
        .success()
        .stdout(contains("state: confirmed"));

    teamdeck(&dir)
        .args(["notify", "ls", "--actor", "owner"])
        .assert()
        .success()
        .stdout(contains("subtask confirmed"));
}

#[test]
fn quiet_suppresses_human_output() {
    let dir = tempfile::tempdir().unwrap();
    init_with_users(&dir, &["alice"]);

    let output = teamdeck(&dir)
        .args(["board", "new", "Launch", "--actor", "alice", "--quiet"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

/// Pull the first `"id": "<prefix>..."` value out of a JSON envelope
fn extract_id(stdout: &[u8], prefix: &str) -> String {
    let text = String::from_utf8_lossy(stdout);
    let needle = format!("\"{prefix}");
    let start = text
        .find(&needle)
        .unwrap_or_else(|| panic!("no id with prefix {prefix} in: {text}"))
        + 1;
    let rest = &text[start..];
    let end = rest.find('"').expect("unterminated id");
    rest[..end].to_string()
}
