use boilerplates_cli::test_utils::TemplateFixture;
use predicates::prelude::*;

use crate::common::{TestProject, whoami};

#[test]
fn test_validate_all_templates() {
    let project = TestProject::new();
    project.add(whoami());
    project.add(
        TemplateFixture::new("stack", "kubernetes")
            .spec("general:\n  vars:\n    app_name:\n      default: web\n")
            .file("deployment.yaml.j2", "name: {{ app_name }}\n"),
    );

    project
        .cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ whoami"))
        .stdout(predicate::str::contains("✓ stack"))
        .stdout(predicate::str::contains("2 template(s) valid"));
}

#[test]
fn test_validate_fails_on_broken_template() {
    let project = TestProject::new();
    project.add(whoami());
    project.add(
        TemplateFixture::new("broken", "compose")
            .spec("general:\n  vars:\n    service_name:\n      default: app\n")
            .file("compose.yaml.j2", "name: {{ service_name | no_such_filter }}\n"),
    );

    project
        .cmd()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("✓ whoami"))
        .stdout(predicate::str::contains("✗ broken"))
        .stderr(predicate::str::contains("1 of 2 template(s) failed validation"));
}

#[test]
fn test_validate_single_template_and_kind() {
    let project = TestProject::new();
    project.add(whoami());
    let mut future = whoami().schema("2.0");
    future.id = "future".to_string();
    project.add(future);

    project.cmd().args(["validate", "whoami"]).assert().success();

    project
        .cmd()
        .args(["validate", "future"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("declares schema 2.0"));

    project
        .cmd()
        .args(["validate", "--kind", "terraform"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates to validate"));
}

#[test]
fn test_validate_warns_about_missing_values_and_bad_yaml() {
    let project = TestProject::new();
    project.add(
        TemplateFixture::new("loose", "compose")
            .file("compose.yaml.j2", "services: [{{ service_name }}\n"),
    );

    project
        .cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("service_name"))
        .stdout(predicate::str::contains("invalid YAML"));
}
