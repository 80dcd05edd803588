use std::fs;
use std::process::{Command, Output};

fn demo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_command-tree-demo"))
        .args(args)
        .env_remove("COMMAND_TREE_SETTINGS")
        .output()
        .expect("failed to run command-tree-demo")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[test]
fn no_arguments_runs_default_command() {
    let out = demo(&[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "no tasks (all: false, limit: 10)");
}

#[test]
fn add_binds_values_and_options() {
    let out = demo(&["add", "Buy", "milk", "-t", "home", "-t", "errand", "-p", "HIGH"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out).trim(), "added: Buy milk [high] #home #errand");
}

#[test]
fn nested_command_and_alias() {
    let out = demo(&["CONFIG", "set", "editor", "vim"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "editor = vim");

    let out = demo(&["ls", "-a", "--json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(json["all"], true);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn parse_errors_exit_with_one() {
    let out = demo(&["add", "--bogus"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error: unknown option '--bogus'"), "stderr: {err}");
    assert!(err.contains("error: missing required value 'title'"), "stderr: {err}");
    assert!(stdout(&out).is_empty());
}

#[test]
fn validation_errors_are_reported() {
    let out = demo(&["list", "--json", "--plain"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("json, plain cannot be used together"));

    let out = demo(&["add", "x", "--due", "-1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("due: cannot be in the past"));
}

#[test]
fn group_without_subcommand_is_an_error() {
    let out = demo(&["config"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("choose a subcommand"));
}

// ---------------------------------------------------------------------------
// Help, version and schema
// ---------------------------------------------------------------------------

#[test]
fn help_and_version_exit_zero() {
    let out = demo(&["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("Usage: command-tree-demo <command> [options]"));
    assert!(text.contains("list"));

    let out = demo(&["help", "config", "set"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("Usage: command-tree-demo config set <key> <value>"));

    let out = demo(&["add", "-?"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("--priority, -p <normal|low|high>"));

    let out = demo(&["version"]);
    assert!(out.status.success());
    assert_eq!(
        stdout(&out).trim(),
        format!("command-tree-demo {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn schema_prints_visible_tree() {
    let out = demo(&["schema"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let names: Vec<&str> = json["commands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["list", "add", "config", "schema"]);
}

#[test]
fn settings_file_changes_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    fs::write(
        &path,
        "policy:\n  ignore_unknown_options: true\napp:\n  name: tasks\n  version: 9.9.9\n",
    )
    .unwrap();

    let out = Command::new(env!("CARGO_BIN_EXE_command-tree-demo"))
        .args(["list", "--bogus"])
        .env("COMMAND_TREE_SETTINGS", &path)
        .output()
        .expect("failed to run command-tree-demo");
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let out = Command::new(env!("CARGO_BIN_EXE_command-tree-demo"))
        .arg("--version")
        .env("COMMAND_TREE_SETTINGS", &path)
        .output()
        .expect("failed to run command-tree-demo");
    assert_eq!(stdout(&out).trim(), "tasks 9.9.9");
}
