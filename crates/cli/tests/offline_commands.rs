use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn scribe(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("scribe").expect("binary");
    cmd.arg("--root")
        .arg(root)
        .arg("--quiet")
        .env_remove("SCRIBE_API_KEY")
        .env_remove("GEMINI_API_KEY");
    cmd
}

fn run_json(root: &Path, args: &[&str]) -> Value {
    let output = scribe(root).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn parse_reports_metadata_and_steps() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("calc.txt"),
        "file: calc.py\ndependencies: math, os\nstep1: add two numbers\n    input: a, b\n",
    )
    .unwrap();

    let doc = run_json(temp.path(), &["parse", "calc.txt"]);

    assert_eq!(doc["metadata"]["file"], "calc.py");
    assert_eq!(doc["metadata"]["language"], "python");
    assert_eq!(doc["metadata"]["dependencies"], serde_json::json!(["math", "os"]));
    assert_eq!(doc["steps"][0]["id"], "step1");
    assert_eq!(doc["steps"][0]["details"][0], "    input: a, b");
}

#[test]
fn add_import_is_idempotent() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("app.py"), "import os\n\nprint(os.name)\n").unwrap();

    let first = run_json(temp.path(), &["edit", "add-import", "app.py", "import sys"]);
    let second = run_json(temp.path(), &["edit", "add-import", "app.py", "import sys"]);

    assert_eq!(first["outcome"]["inserted"], 1);
    assert_eq!(second["outcome"], "already_present");
    let source = fs::read_to_string(temp.path().join("app.py")).unwrap();
    assert_eq!(source.matches("import sys").count(), 1);
}

#[test]
fn update_replaces_only_the_named_function() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("m.py"),
        "def f():\n    return 1\n\ndef g():\n    return 2\n",
    )
    .unwrap();

    run_json(
        temp.path(),
        &["edit", "update", "m.py", "f", "--body", "def f():\n    return 10\n"],
    );

    assert_eq!(
        fs::read_to_string(temp.path().join("m.py")).unwrap(),
        "def f():\n    return 10\n\ndef g():\n    return 2\n"
    );
}

#[test]
fn rename_help_describes_functions_only() {
    let temp = tempdir().unwrap();
    scribe(temp.path())
        .args(["edit", "--help"])
        .assert()
        .success()
        .stdout(contains("Rename a function and its call sites"));
}

#[test]
fn missing_element_fails_and_leaves_file() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("m.py"), "def f():\n    pass\n").unwrap();

    scribe(temp.path())
        .args(["edit", "rename", "m.py", "nope", "other"])
        .assert()
        .failure();
    assert_eq!(
        fs::read_to_string(temp.path().join("m.py")).unwrap(),
        "def f():\n    pass\n"
    );
}

#[test]
fn diff_against_another_file() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("old.py"), "a = 1\n").unwrap();
    fs::write(temp.path().join("new.py"), "a = 1\nb = 2\n").unwrap();
    let old = temp.path().join("old.py");

    let record = run_json(
        temp.path(),
        &["diff", "new.py", "--against", old.to_str().unwrap()],
    );

    assert_eq!(record["total_changes"], 1);
    assert_eq!(record["added_lines"][0]["line"], 2);
    assert_eq!(record["baseline"], "snapshot");

    let first = run_json(temp.path(), &["diff", "new.py"]);
    assert_eq!(first["baseline"], "first_version_missing");
}

#[test]
fn init_config_and_pending() {
    let temp = tempdir().unwrap();

    run_json(temp.path(), &["init"]);
    assert!(temp.path().join(".scribe/config.toml").exists());
    scribe(temp.path()).arg("init").assert().failure();

    scribe(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("[oracle]"));

    assert_eq!(run_json(temp.path(), &["pending"]), serde_json::json!([]));
    assert_eq!(run_json(temp.path(), &["pending", "--clear"])["removed"], 0);
}

#[test]
fn backups_round_trip() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("a.py"), "v1\n").unwrap();

    let created = run_json(temp.path(), &["backup", "create", "--label", "manual"]);
    let id = created["id"].as_str().unwrap().to_string();
    fs::write(temp.path().join("a.py"), "v2\n").unwrap();

    let listed = run_json(temp.path(), &["backup", "list"]);
    assert_eq!(listed[0]["id"], id.as_str());
    run_json(temp.path(), &["backup", "restore", &id]);
    assert_eq!(fs::read_to_string(temp.path().join("a.py")).unwrap(), "v1\n");
}

#[test]
fn cache_stats_on_empty_workspace() {
    let temp = tempdir().unwrap();
    let stats = run_json(temp.path(), &["cache", "stats"]);
    assert_eq!(stats, serde_json::json!({ "entries": 0, "total_bytes": 0 }));
}

#[test]
fn generation_requires_an_api_key() {
    let temp = tempdir().unwrap();
    scribe(temp.path())
        .args(["generate", "make", "a", "calculator"])
        .assert()
        .failure()
        .stderr(contains("API key"));
}
