use boilerplates_cli::test_utils::TemplateFixture;
use predicates::prelude::*;

use crate::common::{TestProject, whoami};

#[test]
fn test_show_text_report() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args(["show", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains("whoami template"))
        .stdout(predicate::str::contains("base spec 1.1"))
        .stdout(predicate::str::contains("compose.yaml"))
        .stdout(predicate::str::contains("traefik_host"))
        .stdout(predicate::str::contains("(template)"))
        .stdout(predicate::str::contains("(module)"))
        .stdout(predicate::str::contains("container_name").not());
}

#[test]
fn test_show_json_orders_live_sections_first() {
    let project = TestProject::with_config("[defaults.compose]\nrestart_policy = \"always\"\n");
    project.add(whoami());

    let output = project.cmd().args(["show", "whoami", "--format", "json"]).output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(report["template"]["id"], "whoami");
    assert_eq!(report["base_schema"], "1.1");
    let sections = report["sections"].as_array().unwrap();
    assert_eq!(sections[0]["key"], "general");
    let last = sections.last().unwrap();
    assert_eq!(last["key"], "traefik");
    assert_eq!(last["satisfied"], false);

    let restart = sections[0]["variables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == "restart_policy")
        .unwrap();
    assert_eq!(restart["value"], "always");
    assert_eq!(restart["origin"], "module -> persisted");
}

#[test]
fn test_show_masks_sensitive_values() {
    let project = TestProject::new();
    project.add(
        TemplateFixture::new("db", "compose")
            .spec(
                "general:
  vars:
    service_name:
      default: db
    db_password:
      type: str
      sensitive: true
      default: hunter2
",
            )
            .file("secret.env.j2", "{{ service_name }} {{ db_password }}\n"),
    );

    project
        .cmd()
        .args(["show", "db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("********"))
        .stdout(predicate::str::contains("hunter2").not());
}
