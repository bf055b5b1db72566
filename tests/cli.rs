//! CLI integration tests for the entities binary.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use entities::store::{SqliteStore, Store};
use entities::types::{AnnotationGraph, NewAnnotation, NewStudyStep, NewText};
use predicates::prelude::*;
use serde_json::Value;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("entities").expect("failed to find binary");
        cmd.current_dir(self.data_dir())
            .env("NO_COLOR", "1")
            .env_remove("ENTITIES_DATA_DIR")
            .env_remove("ENTITIES_TEXT_STORAGE");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn add_user(&self, username: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "user",
                "add",
                "--data-dir",
                &self.data_dir_str(),
                "--username",
                username,
                "--password",
                "correct horse",
                "--non-interactive",
            ])
            .assert()
    }

    fn open_store(&self) -> SqliteStore {
        SqliteStore::new(
            self.data_dir().join("entities.db"),
            self.data_dir().join("texts"),
        )
        .expect("failed to open store")
    }

    /// Adds a text with a blank-slate annotation through the library and
    /// returns the annotation id.
    fn seed_annotation(&self, username: &str) -> i64 {
        let store = self.open_store();
        let user = store
            .get_user_by_name(username)
            .expect("failed to look up user")
            .expect("user missing");

        let source = self.data_dir().join("seed.txt");
        std::fs::write(&source, "It is a truth universally acknowledged.").expect("write seed");
        let text = store
            .add_text(&NewText {
                md5sum: "0123456789abcdef",
                source: &source,
                title: "Seed",
                uploaded_by: user.id,
            })
            .expect("failed to add text")
            .text;

        store
            .add_annotation(&NewAnnotation {
                user_id: user.id,
                text_id: text.id,
                parent_annotation_id: None,
                graph: &AnnotationGraph::blank_slate(),
                method: "unannotated",
                method_metadata: None,
                label: None,
                automated_method_in_progress: false,
            })
            .expect("failed to add annotation")
    }
}

#[test]
fn test_init_creates_database() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Initialized database"));

    assert!(ctx.data_dir().join("entities.db").exists());
    assert!(ctx.data_dir().join("texts").is_dir());

    // Rerunning is harmless.
    ctx.init().success();
}

#[test]
fn test_user_add_requires_init() {
    let ctx = TestContext::new();

    ctx.add_user("lizzy")
        .failure()
        .stderr(predicate::str::contains("entities init"));
}

#[test]
fn test_user_add_and_duplicate() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("lizzy")
        .success()
        .stdout(predicate::str::contains("Created user \"lizzy\""));

    ctx.add_user("lizzy")
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let user = ctx
        .open_store()
        .get_user_by_name("lizzy")
        .unwrap()
        .expect("user stored");
    assert!(user.password.starts_with("$argon2id$"));
}

#[test]
fn test_user_add_non_interactive_requires_password() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.cmd()
        .args([
            "user",
            "add",
            "--data-dir",
            &ctx.data_dir_str(),
            "--username",
            "lizzy",
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password is required"));
}

#[test]
fn test_annotation_dump() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("lizzy").success();
    let annotation_id = ctx.seed_annotation("lizzy");

    let output = ctx
        .cmd()
        .args([
            "annotation",
            "dump",
            "--data-dir",
            &ctx.data_dir_str(),
            &annotation_id.to_string(),
        ])
        .output()
        .expect("failed to run command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8 output");
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let dumped: Value = serde_json::from_str(lines[0]).expect("failed to parse JSON");
    assert_eq!(dumped["annotation_id"], annotation_id);
    assert_eq!(dumped["method"], "unannotated");
    assert_eq!(dumped["annotation"]["last_entity_id"], 0);

    ctx.cmd()
        .args(["annotation", "dump", "--data-dir", &ctx.data_dir_str(), "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "\"annotation_id\":{annotation_id}"
        )));

    ctx.cmd()
        .args(["annotation", "dump", "--data-dir", &ctx.data_dir_str(), "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Annotation 999 not found"));
}

#[test]
fn test_study_dump() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("lizzy").success();

    let (study_id, study_data_id) = {
        let store = ctx.open_store();
        let user = store
            .get_user_by_name("lizzy")
            .expect("failed to look up user")
            .expect("user missing");
        let study_id = store
            .add_study("Logged study", None, None)
            .expect("failed to add study");
        let group_id = store
            .add_study_group(study_id, Some("A"))
            .expect("failed to add group");
        let step_id = store
            .add_study_step(&NewStudyStep {
                study_id,
                label: "Annotate",
                base_annotation_id: None,
                url: None,
            })
            .expect("failed to add step");
        let participant = store
            .add_study_participant(study_id, user.id, Some(group_id))
            .expect("failed to add participant");
        let study_data_id = store
            .add_study_data(
                participant,
                step_id,
                r#"[{"name":"pageload","timestamp":1},{"name":"blur","timestamp":2}]"#,
            )
            .expect("failed to add study data");
        (study_id, study_data_id)
    };

    let output = ctx
        .cmd()
        .args([
            "study",
            "dump",
            "--data-dir",
            &ctx.data_dir_str(),
            &study_id.to_string(),
        ])
        .output()
        .expect("failed to run command");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8 output");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("failed to parse JSON"))
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["study_data_id"], study_data_id);
    assert_eq!(events[0]["event_name"], "pageload");
    assert_eq!(events[1]["event_name"], "blur");
    assert_eq!(events[1]["participant_username"], "lizzy");
    assert_eq!(events[1]["participant_group_label"], "A");

    ctx.cmd()
        .args(["study", "dump", "--data-dir", &ctx.data_dir_str(), "999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Study 999 not found"));
}
