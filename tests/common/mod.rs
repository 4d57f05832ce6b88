//! Shared helpers for the test suites.

#![allow(dead_code)]

use assert_cmd::Command;
use boilerplates_cli::test_utils::{LibraryFixture, TemplateFixture};
use std::path::PathBuf;

/// A throwaway library plus a config file that points at it.
pub struct TestProject {
    pub fixture: LibraryFixture,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Config with the fixture library first, followed by `extra` TOML.
    pub fn with_config(extra: &str) -> Self {
        let fixture = LibraryFixture::new().unwrap();
        let library = fixture.library_path().display().to_string();
        fixture
            .write_config(&format!(
                "[[libraries]]\nname = \"default\"\npath = '{library}'\n\n{extra}"
            ))
            .unwrap();
        Self { fixture }
    }

    pub fn add(&self, template: TemplateFixture) -> PathBuf {
        self.fixture.add(template).unwrap()
    }

    /// The binary, isolated from the user's config and environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("boilerplates").unwrap();
        cmd.current_dir(self.fixture.root())
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--config")
            .arg(self.fixture.config_path())
            .arg("--no-progress");
        cmd
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.fixture.root().join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }
}

/// A compose template using the general and traefik sections.
pub fn whoami() -> TemplateFixture {
    TemplateFixture::new("whoami", "compose")
        .schema("1.1")
        .spec(
            "general:
  vars:
    service_name:
      default: whoami
traefik:
  vars:
    traefik_host:
      default: whoami.example.com
",
        )
        .file(
            "compose.yaml.j2",
            "services:
  {{ service_name }}:
    image: traefik/whoami
    restart: {{ restart_policy }}
{% if traefik_enabled %}
    labels:
      - traefik.http.routers.{{ service_name }}.rule=Host(`{{ traefik_host }}`)
{% endif %}
",
        )
        .file("README.md", "Static {{ not rendered }}\n")
        .next_steps("Start it with docker compose up -d in {{ service_name }}")
}
