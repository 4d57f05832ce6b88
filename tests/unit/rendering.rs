use boilerplates_cli::core::BoilerplateError;
use boilerplates_cli::templating::{
    FileAction, RenderErrorKind, TemplateBody, TemplateRenderer, plan_output, referenced_variables,
    sanitize, write_output,
};
use serde_json::json;
use tempfile::TempDir;

fn body(files: &[(&str, &str)]) -> (TempDir, TemplateBody) {
    let temp = TempDir::new().unwrap();
    for (path, content) in files {
        let target = temp.path().join(path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, content).unwrap();
    }
    let body = TemplateBody::load(temp.path()).unwrap();
    (temp, body)
}

fn context(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().unwrap().clone()
}

#[test]
fn test_scanner_ignores_locals_attributes_and_filters() {
    let source = "{% for port in ports %}{{ port.number | default(value=fallback) }}{% endfor %}\
                  {% set image = registry ~ '/app' %}{{ image }}{{ now() }}";
    let names: Vec<String> = referenced_variables(source).into_iter().collect();
    assert_eq!(names, vec!["fallback", "ports", "registry"]);
}

#[test]
fn test_render_is_deterministic_and_sanitized() {
    let (_temp, body) = body(&[(
        "compose.yaml.j2",
        "services:   \n\n\n\n  {{ name }}:\n    image: nginx\n",
    )]);
    let renderer = TemplateRenderer::new("t");
    let ctx = context(json!({"name": "web"}));

    let first = renderer.render(&body, &ctx).unwrap();
    let second = renderer.render(&body, &ctx).unwrap();
    assert_eq!(first.files[0].content, second.files[0].content);
    assert_eq!(
        String::from_utf8(first.files[0].content.clone()).unwrap(),
        "services:\n\n  web:\n    image: nginx\n"
    );
    assert_eq!(sanitize("services:\n\n  web:\n    image: nginx\n"), "services:\n\n  web:\n    image: nginx\n");
}

#[test]
fn test_includes_resolve_within_the_template() {
    let (_temp, body) = body(&[
        ("compose.yaml.j2", "{% include \"partials/labels.j2\" %}"),
        ("partials/labels.j2", "labels: {{ name }}\n"),
    ]);
    let output = TemplateRenderer::new("t").render(&body, &context(json!({"name": "web"}))).unwrap();
    let compose = output.files.iter().find(|f| f.path.ends_with("compose.yaml")).unwrap();
    assert_eq!(compose.content, b"labels: web\n");
}

#[test]
fn test_sandbox_blocks_environment_access() {
    let (_temp, body) = body(&[("x.txt.j2", "{{ get_env(name=\"HOME\") }}")]);
    let err = TemplateRenderer::new("t").render(&body, &serde_json::Map::new()).unwrap_err();
    let BoilerplateError::RenderFailed { errors, .. } = err else {
        panic!("expected render failure");
    };
    assert_eq!(errors[0].kind, RenderErrorKind::UnknownFunction);
    assert!(errors[0].message.contains("get_env"), "{}", errors[0].message);
}

#[test]
fn test_undefined_variable_diagnostic() {
    let (_temp, body) = body(&[("app.conf.j2", "a\nb\nhost={{ hostnme }}\n")]);
    let err = TemplateRenderer::new("t")
        .render(&body, &context(json!({"hostname": "x"})))
        .unwrap_err();
    let BoilerplateError::RenderFailed { errors, .. } = err else {
        panic!("expected render failure");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, RenderErrorKind::UndefinedVariable);
    assert_eq!(errors[0].line, Some(3));
    assert!(errors[0].suggestions.iter().any(|s| s.contains("hostname")));
    assert!(errors[0].context.iter().any(|l| l.is_error && l.number == 3));
}

#[test]
fn test_staged_write_and_plan() {
    let (_temp, body) = body(&[("a.txt.j2", "{{ v }}\n"), ("static.bin", "raw")]);
    let output = TemplateRenderer::new("t").render(&body, &context(json!({"v": 1}))).unwrap();

    let dest_root = TempDir::new().unwrap();
    let dest = dest_root.path().join("out");
    let plan = plan_output(&output, &dest).unwrap();
    assert!(!plan.destination_occupied);
    assert_eq!(plan.count(FileAction::Create), 2);
    assert!(!dest.exists());

    write_output(&output, &dest, false).unwrap();
    assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "1\n");
    assert_eq!(std::fs::read_to_string(dest.join("static.bin")).unwrap(), "raw");

    let again = plan_output(&output, &dest).unwrap();
    assert_eq!(again.count(FileAction::Unchanged), 2);
}
