//! CLI tests for the `ps` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a config pointing at a temp template root and return its path.
fn write_config(temp: &TempDir) -> std::path::PathBuf {
    let config_path = temp.path().join("config.yml");
    let root = temp.path().join("templates");
    std::fs::write(
        &config_path,
        format!("templates_path: {}\n", root.display()),
    )
    .unwrap();
    config_path
}

fn ps(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ps").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_counts_on_empty_root() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    ps(&config)
        .arg("counts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates found"));
}

#[test]
fn test_add_list_render_remove_flow() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    ps(&config)
        .args([
            "add",
            "squad",
            "basic",
            "Q: {{ question }} ||| {{ answer }}",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added template"));

    ps(&config)
        .args(["list", "squad"])
        .assert()
        .success()
        .stdout(predicate::str::contains("basic"));

    ps(&config)
        .args(["counts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("squad"));

    ps(&config)
        .args([
            "render",
            "squad",
            "basic",
            r#"{"question": "2+2?", "answer": "4"}"#,
            "--no-truncate",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Q: 2+2?"))
        .stdout(predicate::str::contains("4"));

    ps(&config)
        .args(["remove", "squad", "basic"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed template"));

    ps(&config)
        .arg("counts")
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates found"));
}

#[test]
fn test_duplicate_add_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    ps(&config)
        .args(["add", "squad", "dup", "{{ q }} ||| {{ a }}"])
        .assert()
        .success();

    ps(&config)
        .args(["add", "squad", "dup", "{{ q }} ||| {{ a }}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_remove_unknown_template_fails() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);
    ps(&config)
        .args(["remove", "squad", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no template named"));
}

#[test]
fn test_export_writes_csv() {
    let temp = TempDir::new().unwrap();
    let config = write_config(&temp);

    ps(&config)
        .args(["add", "squad", "basic", "{{ q }} ||| {{ a }}"])
        .assert()
        .success();

    let out = temp.path().join("report.csv");
    ps(&config)
        .args(["export"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 templates"));

    let content = std::fs::read_to_string(&out).unwrap();
    assert!(content.starts_with("id,dataset,subset,name"));
}
