use boilerplates_cli::core::BoilerplateError;
use boilerplates_cli::schema::{ModuleRegistry, ModuleSpecCache, SpecDeclaration};
use boilerplates_cli::variables::{Origin, VariableCollection, VariableValue, merge_specs};
use serde_yaml::Value;
use std::collections::BTreeMap;

fn spec(yaml: &str) -> SpecDeclaration {
    SpecDeclaration::from_yaml(yaml).unwrap()
}

fn layer(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}

const MODULE: &str = "
general:
  vars:
    service_name: {type: str}
    restart_policy:
      type: enum
      options: [unless-stopped, always, 'no']
      default: unless-stopped
database:
  toggle: database_enabled
  vars:
    database_enabled: {type: bool, default: false}
    database_type:
      type: enum
      options: [postgres, mysql]
      default: postgres
    database_port: {type: int, default: 5432, needs: database_type=postgres}
backup:
  toggle: backup_enabled
  needs: database
  vars:
    backup_enabled: {type: bool, default: false}
    backup_schedule: {type: str, default: '@daily'}
";

fn merged(template: &str) -> VariableCollection {
    merge_specs(&spec(MODULE), &spec(template)).unwrap()
}

#[test]
fn test_layers_apply_in_precedence_order_regardless_of_call_order() {
    let mut vars = merged("general:\n  vars:\n    restart_policy:\n      default: always\n");
    assert_eq!(vars.variable("restart_policy").unwrap().origin(), Some(Origin::Template));

    vars.apply_values(&layer(&[("restart_policy", "no")]), Origin::Caller).unwrap();
    vars.apply_values(&layer(&[("restart_policy", "unless-stopped")]), Origin::Persisted).unwrap();

    let restart = vars.variable("restart_policy").unwrap();
    assert_eq!(restart.value, Some(VariableValue::Enum("no".into())));
    assert_eq!(restart.provenance(), &[Origin::Module, Origin::Template, Origin::Caller]);
}

#[test]
fn test_sections_order_by_needs() {
    let vars = merge_specs(
        &spec(MODULE),
        &spec("monitoring:\n  needs: backup\n  vars:\n    monitoring_target: {default: x}\n"),
    )
    .unwrap();
    let keys: Vec<&str> = vars.sections().iter().map(|s| s.key.as_str()).collect();
    let position = |k: &str| keys.iter().position(|x| *x == k).unwrap();
    assert!(position("database") < position("backup"));
    assert!(position("backup") < position("monitoring"));
}

#[test]
fn test_toggle_and_section_needs_gate_activity() {
    let mut vars = merged("");
    assert!(!vars.is_section_enabled("database"));
    assert!(!vars.is_variable_active("database_port"));
    assert!(!vars.render_context().contains_key("database_port"));
    assert!(!vars.render_context().contains_key("database_enabled"));

    vars.apply_values(&layer(&[("backup_enabled", "true")]), Origin::Caller).unwrap();
    assert!(vars.is_section_enabled("backup"));
    assert!(!vars.is_section_satisfied("backup"));

    vars.apply_values(&layer(&[("database_enabled", "yes")]), Origin::Caller).unwrap();
    assert!(vars.is_section_satisfied("database"));
    assert!(vars.is_section_satisfied("backup"));
    assert_eq!(vars.render_context()["database_port"], serde_json::json!(5432));

    vars.apply_values(&layer(&[("database_type", "mysql")]), Origin::Caller).unwrap();
    assert!(!vars.is_variable_active("database_port"));
}

#[test]
fn test_caller_bool_in_unmet_section_fails_validation() {
    let mut vars = merged("general:\n  vars:\n    service_name: {default: app}\n");
    vars.apply_values(&layer(&[("backup_enabled", "true")]), Origin::Caller).unwrap();
    vars.reset_disabled_bools();

    let Err(BoilerplateError::ValidationFailed { errors }) = vars.validate_all() else {
        panic!("expected validation failure");
    };
    assert!(errors.iter().any(|e| e.contains("backup_enabled") && e.contains("requires")), "{errors:?}");
}

#[test]
fn test_missing_values_are_all_reported() {
    let vars = merge_specs(
        &spec(MODULE),
        &spec("general:\n  vars:\n    hostname: {type: hostname}\n"),
    )
    .unwrap();
    let Err(BoilerplateError::ValidationFailed { errors }) = vars.validate_all() else {
        panic!("expected validation failure");
    };
    assert!(errors.iter().any(|e| e.starts_with("general.service_name")));
    assert!(errors.iter().any(|e| e.starts_with("general.hostname")));
}

#[test]
fn test_cycles_are_rejected_with_the_path() {
    let err = merge_specs(
        &spec(MODULE),
        &spec("a:\n  needs: b\n  vars:\n    a_v: {default: 1}\nb:\n  needs: a\n  vars:\n    b_v: {default: 1}\n"),
    )
    .unwrap_err();
    let BoilerplateError::DependencyCycle { cycle } = &err else {
        panic!("expected a cycle, got {err}");
    };
    assert!(cycle.contains(&"a".to_string()) && cycle.contains(&"b".to_string()));
    assert_eq!(cycle.first(), cycle.last());
}

#[test]
fn test_unknown_needs_target_is_rejected() {
    let err = merge_specs(&spec(MODULE), &spec("extra:\n  needs: nowhere\n  vars:\n    x: {default: 1}\n"))
        .unwrap_err();
    assert!(matches!(err, BoilerplateError::UnknownReference { .. }), "{err}");
}

#[test]
fn test_builtin_modules_and_cache() {
    let registry = ModuleRegistry::builtin();
    let mut kinds = registry.kinds();
    kinds.sort_unstable();
    assert_eq!(kinds, vec!["compose", "kubernetes", "terraform"]);

    let cache = ModuleSpecCache::new();
    let compose = registry.get("compose").unwrap();
    for version in compose.supported() {
        cache.get_or_load(compose, &version).unwrap();
        cache.get_or_load(compose, &version).unwrap();
    }
    assert_eq!(cache.stats(), (2, 2));
}
