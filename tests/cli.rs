mod generation_stub;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use generation_stub::{Behavior, GenerationStub, StubConfig};

fn treatforge(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("treatforge").expect("binary builds");
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("utf-8 stdout")
}

fn create_treatment(data_dir: &Path, title: &str) -> String {
    stdout_of(treatforge(data_dir).args(["new", "--title", title]))
        .trim()
        .to_owned()
}

/// Chapter ids from `chapter list`, in display order.
fn chapter_ids(data_dir: &Path, treatment: &str) -> Vec<String> {
    stdout_of(treatforge(data_dir).args(["chapter", "list", "--treatment", treatment]))
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1).map(str::to_owned))
        .collect()
}

#[test]
fn new_list_and_export_flow() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");
    assert!(!id.is_empty());

    treatforge(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Night Drive"))
        .stdout(predicate::str::contains("12 chapters"));

    treatforge(dir.path())
        .args(["export", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Night Drive"))
        .stdout(predicate::str::contains("## INTRO"))
        .stdout(predicate::str::contains("## CONCLUSION"));
}

#[test]
fn chapter_management_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");

    let custom = stdout_of(treatforge(dir.path()).args([
        "chapter", "add", "--treatment", &id, "--title", "B-ROLL",
    ]))
    .trim()
    .to_owned();

    treatforge(dir.path())
        .args(["chapter", "list", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("B-ROLL  0 words  (custom)"));

    // Default chapters stay put; the custom one goes.
    let intro = chapter_ids(dir.path(), &id)[0].clone();
    treatforge(dir.path())
        .args(["chapter", "remove", "--treatment", &id, "--chapter", &intro])
        .assert()
        .success();
    treatforge(dir.path())
        .args(["chapter", "remove", "--treatment", &id, "--chapter", &custom])
        .assert()
        .success();

    treatforge(dir.path())
        .args(["chapter", "list", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("INTRO"))
        .stdout(predicate::str::contains("B-ROLL").not());
}

#[test]
fn settings_update_prints_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");

    treatforge(dir.path())
        .args([
            "settings",
            "--treatment",
            &id,
            "--tone",
            "poetic",
            "--genre",
            "cars",
            "--brief",
            "Electric sedan launch.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"POETIC\""))
        .stdout(predicate::str::contains("\"CARS\""))
        .stdout(predicate::str::contains("Electric sedan launch."));
}

#[test]
fn unknown_treatment_id_fails_with_a_message() {
    let dir = tempfile::tempdir().unwrap();
    treatforge(dir.path())
        .args(["export", "--treatment", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no treatment with id missing"));
}

#[test]
fn generate_chapter_stores_the_draft() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");
    let intro = chapter_ids(dir.path(), &id)[0].clone();

    let stub = GenerationStub::spawn(StubConfig {
        api_key: Some("secret".to_owned()),
        behavior: Behavior::Canned("The car glides through empty streets."),
    });

    treatforge(dir.path())
        .env("TREATFORGE_API_URL", &stub.base_url)
        .env("TREATFORGE_API_KEY", "secret")
        .args(["generate", "chapter", "--treatment", &id, "--chapter", &intro])
        .assert()
        .success()
        .stdout(predicate::str::contains("The car glides through empty streets."));

    treatforge(dir.path())
        .args(["export", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("The car glides through empty streets."));
}

#[test]
fn edit_apply_replaces_text_in_a_chapter() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");
    let intro = chapter_ids(dir.path(), &id)[0].clone();

    let stub = GenerationStub::spawn(StubConfig {
        api_key: None,
        behavior: Behavior::Canned("The car speeds through the city at night."),
    });
    treatforge(dir.path())
        .env("TREATFORGE_API_URL", &stub.base_url)
        .env("TREATFORGE_API_KEY", "k")
        .args(["generate", "chapter", "--treatment", &id, "--chapter", &intro])
        .assert()
        .success();

    treatforge(dir.path())
        .args([
            "edit",
            "apply",
            "--treatment",
            &id,
            "--chapter",
            &intro,
            "--old",
            "speeds through the city",
            "--new",
            "glides through empty streets",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("replaced text in block 0"));

    treatforge(dir.path())
        .args(["export", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "The car glides through empty streets at night.",
        ));

    treatforge(dir.path())
        .args([
            "edit",
            "apply",
            "--treatment",
            &id,
            "--chapter",
            &intro,
            "--old",
            "a phrase that never appears",
            "--new",
            "anything",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("text not found"));
}

#[test]
fn version_save_and_load_restore_chapters() {
    let dir = tempfile::tempdir().unwrap();
    let id = create_treatment(dir.path(), "Night Drive");
    let intro = chapter_ids(dir.path(), &id)[0].clone();

    let stub = GenerationStub::spawn(StubConfig {
        api_key: None,
        behavior: Behavior::Canned("First draft."),
    });
    treatforge(dir.path())
        .env("TREATFORGE_API_URL", &stub.base_url)
        .env("TREATFORGE_API_KEY", "k")
        .args(["generate", "chapter", "--treatment", &id, "--chapter", &intro])
        .assert()
        .success();

    let version = stdout_of(treatforge(dir.path()).args(["version", "save", "--treatment", &id]))
        .trim()
        .to_owned();

    treatforge(dir.path())
        .args([
            "edit", "apply", "--treatment", &id, "--chapter", &intro, "--old", "First draft.",
            "--new", "Second draft.",
        ])
        .assert()
        .success();

    treatforge(dir.path())
        .args(["version", "load", "--treatment", &id, "--version", &version])
        .assert()
        .success();

    treatforge(dir.path())
        .args(["export", "--treatment", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("First draft."));

    // The pre-load state was snapshotted, so two versions now exist.
    let listing = stdout_of(treatforge(dir.path()).args(["version", "list", "--treatment", &id]));
    assert_eq!(listing.lines().count(), 2, "got: {listing}");
}
