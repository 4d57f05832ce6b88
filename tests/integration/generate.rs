use boilerplates_cli::test_utils::TemplateFixture;
use predicates::prelude::*;

use crate::common::{TestProject, whoami};

#[test]
fn test_generate_renders_and_copies() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args(["generate", "whoami", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compose.yaml"))
        .stdout(predicate::str::contains("Start it with docker compose up -d in whoami"));

    let compose = project.read("out/compose.yaml");
    assert!(compose.contains("  whoami:\n"));
    assert!(compose.contains("restart: unless-stopped"));
    assert!(!compose.contains("traefik.http.routers"));
    assert_eq!(project.read("out/README.md"), "Static {{ not rendered }}\n");
    assert!(!project.path("out/compose.yaml.j2").exists());
}

#[test]
fn test_generate_defaults_to_template_directory_name() {
    let project = TestProject::new();
    project.add(whoami());

    project.cmd().args(["generate", "whoami"]).assert().success();
    assert!(project.path("whoami/compose.yaml").exists());
}

#[test]
fn test_caller_values_enable_sections() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args([
            "generate",
            "whoami",
            "out",
            "--var",
            "traefik_enabled=true",
            "--var",
            "traefik_host=app.example.org",
        ])
        .assert()
        .success();

    let compose = project.read("out/compose.yaml");
    assert!(compose.contains("rule=Host(`app.example.org`)"), "{compose}");
}

#[test]
fn test_value_precedence() {
    let project = TestProject::with_config("[defaults.compose]\nrestart_policy = \"always\"\n");
    project.add(whoami());

    project.cmd().args(["generate", "whoami", "saved"]).assert().success();
    assert!(project.read("saved/compose.yaml").contains("restart: always"));

    project
        .cmd()
        .args(["generate", "whoami", "caller", "--var", "restart_policy=no"])
        .assert()
        .success();
    assert!(project.read("caller/compose.yaml").contains("restart: no"));

    project.cmd().args(["generate", "whoami", "plain", "--no-defaults"]).assert().success();
    assert!(project.read("plain/compose.yaml").contains("restart: unless-stopped"));
}

#[test]
fn test_var_file() {
    let project = TestProject::new();
    project.add(whoami());
    std::fs::write(project.path("values.yaml"), "service_name: fromfile\nrestart_policy: always\n")
        .unwrap();

    project
        .cmd()
        .args(["generate", "whoami", "out", "--var-file", "values.yaml", "--var", "restart_policy=no"])
        .assert()
        .success();

    let compose = project.read("out/compose.yaml");
    assert!(compose.contains("  fromfile:\n"));
    assert!(compose.contains("restart: no"));
}

#[test]
fn test_invalid_value_is_rejected() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args(["generate", "whoami", "out", "--var", "restart_policy=sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("restart_policy"));
    assert!(!project.path("out").exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args(["generate", "whoami", "out", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("compose.yaml"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("2 new"));
    assert!(!project.path("out").exists());
}

#[test]
fn test_occupied_destination_needs_force() {
    let project = TestProject::new();
    project.add(whoami());
    std::fs::create_dir_all(project.path("out")).unwrap();
    std::fs::write(project.path("out/compose.yaml"), "old\n").unwrap();
    std::fs::write(project.path("out/notes.txt"), "mine\n").unwrap();

    project
        .cmd()
        .args(["generate", "whoami", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not empty"))
        .stderr(predicate::str::contains("--force"));
    assert_eq!(project.read("out/compose.yaml"), "old\n");

    project
        .cmd()
        .args(["generate", "whoami", "out", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overwrite"));

    project.cmd().args(["generate", "whoami", "out", "--force"]).assert().success();
    assert!(project.read("out/compose.yaml").contains("image: traefik/whoami"));
    assert_eq!(project.read("out/notes.txt"), "mine\n");
}

#[test]
fn test_render_errors_are_reported_together() {
    let project = TestProject::new();
    project.add(
        TemplateFixture::new("broken", "compose")
            .spec("general:\n  vars:\n    service_name:\n      default: app\n")
            .file("a.yaml.j2", "name: {{ service_name | no_such_filter }}\n")
            .file("b.yaml.j2", "{% if service_name %}\nunterminated\n"),
    );

    project
        .cmd()
        .args(["generate", "broken", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to render (2 error(s))"))
        .stderr(predicate::str::contains("a.yaml.j2"))
        .stderr(predicate::str::contains("b.yaml.j2"));
    assert!(!project.path("out").exists());
}

#[test]
fn test_undeclared_variable_is_a_load_error() {
    let project = TestProject::new();
    project.add(
        TemplateFixture::new("typo", "compose")
            .spec("general:\n  vars:\n    service_name:\n      default: app\n")
            .file("compose.yaml.j2", "name: {{ servce_name }}\n"),
    );

    project
        .cmd()
        .args(["generate", "typo", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("servce_name"))
        .stderr(predicate::str::contains("compose.yaml.j2"));
}

#[test]
fn test_incompatible_schema_is_rejected() {
    let project = TestProject::new();
    project.add(whoami().schema("2.0"));

    project
        .cmd()
        .args(["generate", "whoami", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("declares schema 2.0"))
        .stderr(predicate::str::contains("1.0, 1.1"));
}

#[test]
fn test_drafts_cannot_be_generated() {
    let project = TestProject::new();
    project.add(whoami().draft());

    project
        .cmd()
        .args(["generate", "whoami", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("draft"));
}

#[test]
fn test_unknown_template() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["generate", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template 'nope' not found"));
}

#[test]
fn test_empty_render_is_skipped() {
    let project = TestProject::new();
    project.add(whoami().file(
        "traefik.yaml.j2",
        "{% if traefik_enabled %}\nhost: {{ traefik_host }}\n{% endif %}\n",
    ));

    project
        .cmd()
        .args(["generate", "whoami", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped (empty)"));
    assert!(!project.path("out/traefik.yaml").exists());
}

#[test]
fn test_sensitive_values_are_generated() {
    let project = TestProject::new();
    project.add(
        TemplateFixture::new("db", "compose")
            .spec(
                "general:
  vars:
    service_name:
      default: db
database:
  required: true
  vars:
    db_password:
      type: str
      sensitive: true
      autogenerated: true
      autogenerated_length: 24
",
            )
            .file("secret.env.j2", "PASSWORD={{ db_password }}\n"),
    );

    project.cmd().args(["generate", "db", "out"]).assert().success();
    let secret = project.read("out/secret.env");
    let password = secret.trim().strip_prefix("PASSWORD=").unwrap();
    assert_eq!(password.len(), 24);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
}
