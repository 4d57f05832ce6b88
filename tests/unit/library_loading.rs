use boilerplates_cli::library::{Library, discover, find_template, load_library};
use boilerplates_cli::resolver::{TemplateResolver, ValueLayers};
use boilerplates_cli::schema::{ModuleRegistry, ModuleSpecCache, SchemaVersion};
use boilerplates_cli::test_utils::{LibraryFixture, TemplateFixture, init_test_logging};
use boilerplates_cli::utils::ProgressBar;
use serde_yaml::Value;
use std::sync::Arc;

use crate::common::whoami;

fn resolver() -> TemplateResolver {
    TemplateResolver::new(Arc::new(ModuleRegistry::builtin()), Arc::new(ModuleSpecCache::new()))
}

#[tokio::test]
async fn test_load_resolve_finalize_render() {
    init_test_logging(None);
    let fixture = LibraryFixture::new().unwrap();
    fixture.add(whoami()).unwrap();

    let libraries = vec![Library::new("default", fixture.library_path())];
    let templates = load_library(&libraries, None, &ProgressBar::new(0, false)).await.unwrap();
    let descriptor = find_template(&templates, "whoami").unwrap();
    assert_eq!(descriptor.schema, Some(SchemaVersion::new(1, 1)));

    let mut resolved = resolver().resolve(descriptor).unwrap();
    assert_eq!(resolved.base_version, SchemaVersion::new(1, 1));
    assert!(resolved.variables.variable("container_name").is_none());
    assert!(resolved.variables.variable("traefik_enabled").is_some());

    let mut layers = ValueLayers::default();
    layers.caller.insert("traefik_enabled".into(), Value::Bool(true));
    resolved.finalize(&layers).unwrap();

    let output = resolved.render().unwrap();
    let compose = output.files.iter().find(|f| f.path.ends_with("compose.yaml")).unwrap();
    let text = String::from_utf8(compose.content.clone()).unwrap();
    assert!(text.contains("Host(`whoami.example.com`)"), "{text}");
    assert_eq!(
        resolved.next_steps().as_deref(),
        Some("Start it with docker compose up -d in whoami")
    );
}

#[tokio::test]
async fn test_templates_without_schema_use_oldest_base() {
    let fixture = LibraryFixture::new().unwrap();
    fixture
        .add(
            TemplateFixture::new("legacy", "compose")
                .spec("general:\n  vars:\n    service_name:\n      default: legacy\n")
                .file("compose.yaml.j2", "name: {{ service_name }}\n"),
        )
        .unwrap();

    let libraries = vec![Library::new("default", fixture.library_path())];
    let templates = load_library(&libraries, None, &ProgressBar::new(0, false)).await.unwrap();
    let resolved = resolver().resolve(&templates[0]).unwrap();
    assert_eq!(resolved.base_version, SchemaVersion::new(1, 0));
}

#[test]
fn test_discovery_skips_directories_without_metadata() {
    let fixture = LibraryFixture::new().unwrap();
    fixture.add(whoami()).unwrap();
    std::fs::create_dir_all(fixture.library_path().join("compose/not-a-template")).unwrap();

    let libraries = vec![
        Library::new("default", fixture.library_path()),
        Library::new("missing", fixture.root().join("does-not-exist")),
    ];
    let entries = discover(&libraries, None);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "compose");
}
