//! CLI integration tests for jsonapi-marshal binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("jsonapi-marshal"))
}

// Helper to create a temp document file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const VALID: &str = r#"{
    "data": {
        "id": "1",
        "type": "post",
        "attributes": { "title": "Hello" },
        "relationships": {
            "author": { "data": { "id": "9", "type": "person" } }
        }
    },
    "included": [{ "id": "9", "type": "person", "attributes": { "name": "Ann" } }],
    "jsonapi": { "version": "1.1" }
}"#;

mod lint_command {
    use super::*;

    #[test]
    fn valid_document_passes() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "post.json", VALID);

        cmd()
            .args(["lint", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 files checked, all passed"));
    }

    #[test]
    fn directory_with_failures() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "good.json", VALID);
        write_temp_file(&dir, "bad.json", r#"{ "meta": {} }"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("error[E002]"))
            .stdout(predicate::str::contains("1 passed, 1 failed"));
    }

    #[test]
    fn syntax_error() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "broken.json", "{ not valid json");

        cmd()
            .args(["lint", doc.to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E001"));
    }

    #[test]
    fn json_format() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "dup.json",
            r#"{
                "data": null,
                "included": [
                    { "id": "9", "type": "person" },
                    { "id": "9", "type": "person" }
                ]
            }"#,
        );

        let output = cmd()
            .args(["lint", doc.to_str().unwrap(), "--format", "json"])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(result["files_checked"], 1);
        assert_eq!(result["errors"], 1);
        assert_eq!(result["results"][0]["diagnostics"][0]["code"], "E004");
        assert_eq!(result["results"][0]["diagnostics"][0]["path"], "/included/1");
    }

    #[test]
    fn warnings_fail_only_in_strict_mode() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "repeat.json",
            r#"{
                "data": { "id": "1", "type": "post" },
                "included": [{ "id": "1", "type": "post" }]
            }"#,
        );

        cmd()
            .args(["lint", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("warning[W001]"));

        cmd()
            .args(["lint", doc.to_str().unwrap(), "--strict"])
            .assert()
            .code(1);
    }

    #[test]
    fn quiet_hides_passing_files() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "good.json", VALID);
        write_temp_file(&dir, "bad.json", r#"{ "data": { "id": "1" } }"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--quiet"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("bad.json"))
            .stdout(predicate::str::contains("good.json").not())
            .stdout(predicate::str::contains("Linting").not());
    }

    #[test]
    fn missing_path() {
        cmd()
            .args(["lint", "/nonexistent/docs"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod errors_command {
    use super::*;

    #[test]
    fn clean_document_has_no_errors() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "post.json", VALID);

        cmd()
            .args(["errors", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"errors":[]}"#));
    }

    #[test]
    fn diagnostics_become_error_objects() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "bad.json",
            r#"{ "data": { "id": "1", "type": "post", "attributes": { "_x": 1 } } }"#,
        );

        let output = cmd()
            .args(["errors", doc.to_str().unwrap(), "--jsonapi-version", "1.1"])
            .assert()
            .code(1)
            .get_output()
            .stdout
            .clone();

        let document: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let errors = document["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["status"], "400");
        assert_eq!(errors[0]["title"], "Document Error");
        assert_eq!(errors[0]["source"]["pointer"], "/data/attributes/_x");
        assert_eq!(document["jsonapi"]["version"], "1.1");
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "post.json", VALID);

        cmd()
            .args(["errors", doc.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn unsupported_version_flag() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "post.json", VALID);

        cmd()
            .args(["errors", doc.to_str().unwrap(), "--jsonapi-version", "2.0"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unsupported jsonapi version"));
    }

    #[test]
    fn missing_document() {
        cmd()
            .args(["errors", "/nonexistent/doc.json"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Check JSON:API documents"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("jsonapi-marshal"));
    }

    #[test]
    fn lint_help() {
        cmd()
            .args(["lint", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--format"))
            .stdout(predicate::str::contains("--strict"))
            .stdout(predicate::str::contains("--quiet"));
    }

    #[test]
    fn missing_subcommand() {
        cmd().assert().failure();
    }
}
