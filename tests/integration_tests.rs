//! Integration tests for the taskpilot CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Binary with a clean environment, run from an empty directory so no `.env` is picked up.
fn taskpilot(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("taskpilot");
    cmd.env_clear().current_dir(dir.path());
    cmd
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_subcommands() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("detect"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir).arg("--version").assert().success();
    }
}

mod config_command {
    use super::*;

    #[test]
    fn test_missing_required_key_fails() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir)
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("JIRA_HOST"));
    }

    #[test]
    fn test_env_file_values_are_redacted() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("automation.env"),
            "JIRA_HOST=jira.example.com\n\
             JIRA_USERNAME=bot@example.com\n\
             JIRA_API_TOKEN=supersecrettoken\n\
             JIRA_PROJECT_KEY=PROJ\n",
        )
        .unwrap();
        taskpilot(&dir)
            .args(["--env-file", "automation.env", "config"])
            .assert()
            .success()
            .stdout(predicate::str::contains("https://jira.example.com"))
            .stdout(predicate::str::contains("supe****"))
            .stdout(predicate::str::contains("supersecrettoken").not());
    }

    #[test]
    fn test_missing_env_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir)
            .args(["--env-file", "nope.env", "config"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nope.env"));
    }
}

mod detect_command {
    use super::*;

    #[test]
    fn test_detects_npm_project() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"scripts":{"test":"jest"}}"#).unwrap();
        taskpilot(&dir)
            .args(["detect", "."])
            .assert()
            .success()
            .stdout(predicate::str::contains("npm"))
            .stdout(predicate::str::contains("npm test"));
    }

    #[test]
    fn test_empty_directory_has_no_runner() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir)
            .args(["detect", "."])
            .assert()
            .success()
            .stdout(predicate::str::contains("none"));
    }

    #[test]
    fn test_maven_wins_over_gradle() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        fs::write(dir.path().join("mvnw"), "#!/bin/sh\n").unwrap();
        fs::write(dir.path().join("build.gradle"), "").unwrap();
        fs::write(dir.path().join("gradlew"), "#!/bin/sh\n").unwrap();
        taskpilot(&dir)
            .args(["detect", "."])
            .assert()
            .success()
            .stdout(predicate::str::contains("maven"));
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        taskpilot(&dir)
            .args(["detect", "does-not-exist"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not a directory"));
    }
}
