use boilerplates_cli::test_utils::TemplateFixture;
use predicates::prelude::*;

use crate::common::{TestProject, whoami};

#[test]
fn test_list_shows_templates_and_hides_drafts() {
    let project = TestProject::new();
    project.add(whoami());
    project.add(TemplateFixture::new("bucket", "terraform"));
    project.add(TemplateFixture::new("wip", "compose").draft());

    project
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("bucket"))
        .stdout(predicate::str::contains("wip").not())
        .stdout(predicate::str::contains("2 template(s)"));

    project
        .cmd()
        .args(["list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wip"))
        .stdout(predicate::str::contains("(draft)"));
}

#[test]
fn test_list_filters_by_kind() {
    let project = TestProject::new();
    project.add(whoami());
    project.add(TemplateFixture::new("bucket", "terraform"));

    project
        .cmd()
        .args(["list", "terraform"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bucket"))
        .stdout(predicate::str::contains("whoami").not());
}

#[test]
fn test_list_json() {
    let project = TestProject::new();
    project.add(whoami());

    let output = project.cmd().args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "whoami");
    assert_eq!(rows[0]["kind"], "compose");
    assert_eq!(rows[0]["schema"], "1.1");
    assert_eq!(rows[0]["status"], "published");
}

#[test]
fn test_broken_template_is_skipped() {
    let project = TestProject::new();
    project.add(whoami());
    let broken = project.fixture.library_path().join("compose/broken");
    std::fs::create_dir_all(&broken).unwrap();
    std::fs::write(broken.join("template.yaml"), "kind: compose\nmetadata:\n  name: x\n").unwrap();

    project
        .cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("whoami"))
        .stdout(predicate::str::contains("broken").not())
        .stderr(predicate::str::contains("Skipping template"));
}

#[test]
fn test_duplicate_ids_are_qualified() {
    let project = TestProject::new();
    project.add(whoami());
    let other = tempfile::TempDir::new().unwrap();
    whoami().write_to(&other.path().join("extra")).unwrap();

    project
        .cmd()
        .arg("--library")
        .arg(other.path().join("extra"))
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("whoami.default"));
}
