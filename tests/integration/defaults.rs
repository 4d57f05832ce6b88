use predicates::prelude::*;

use crate::common::{TestProject, whoami};

#[test]
fn test_set_list_remove() {
    let project = TestProject::new();
    project.add(whoami());

    project
        .cmd()
        .args(["defaults", "set", "compose", "restart_policy", "always"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved compose restart_policy"));

    let config = project.read("config.toml");
    assert!(config.contains("[defaults.compose]"));
    assert!(config.contains("restart_policy = \"always\""));
    assert!(config.contains("[[libraries]]"));

    project
        .cmd()
        .args(["defaults", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[compose]"))
        .stdout(predicate::str::contains("restart_policy = \"always\""));

    project.cmd().args(["generate", "whoami", "out"]).assert().success();
    assert!(project.read("out/compose.yaml").contains("restart: always"));

    project.cmd().args(["defaults", "remove", "compose", "restart_policy"]).assert().success();
    assert!(!project.read("config.toml").contains("restart_policy"));

    project
        .cmd()
        .args(["defaults", "remove", "compose", "restart_policy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No saved default"));
}

#[test]
fn test_typed_values_and_unknown_names() {
    let project = TestProject::new();

    project
        .cmd()
        .args(["defaults", "set", "compose", "user_uid", "1001"])
        .assert()
        .success();
    assert!(project.read("config.toml").contains("user_uid = 1001"));

    project
        .cmd()
        .args(["defaults", "set", "compose", "my_custom_var", "x"])
        .assert()
        .success()
        .stderr(predicate::str::contains("not a compose module variable"));

    project
        .cmd()
        .args(["defaults", "set", "helm", "x", "y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown module kind 'helm'"));
}
