//! Fixtures that write template directories and libraries to disk.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for one template directory.
#[derive(Clone, Debug)]
pub struct TemplateFixture {
    pub id: String,
    pub kind: String,
    pub schema: Option<String>,
    pub name: String,
    pub draft: bool,
    pub next_steps: Option<String>,
    /// YAML for the `spec:` block, unindented
    pub spec: Option<String>,
    /// Relative path and content
    pub files: Vec<(String, String)>,
}

impl TemplateFixture {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("{id} template"),
            id,
            kind: kind.into(),
            schema: None,
            draft: false,
            next_steps: None,
            spec: None,
            files: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn draft(mut self) -> Self {
        self.draft = true;
        self
    }

    pub fn next_steps(mut self, text: impl Into<String>) -> Self {
        self.next_steps = Some(text.into());
        self
    }

    pub fn spec(mut self, yaml: impl Into<String>) -> Self {
        self.spec = Some(yaml.into());
        self
    }

    pub fn file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    /// Contents of `template.yaml`.
    pub fn metadata_yaml(&self) -> String {
        let mut yaml = format!("kind: {}\n", self.kind);
        if let Some(schema) = &self.schema {
            yaml.push_str(&format!("schema: \"{schema}\"\n"));
        }
        yaml.push_str(&format!(
            "metadata:\n  name: {}\n  description: Test template {}\n  author: Test Author\n  \
             version: 1.0.0\n  date: \"2025-01-01\"\n  tags: [test]\n",
            self.name, self.id
        ));
        if self.draft {
            yaml.push_str("  draft: true\n");
        }
        if let Some(next_steps) = &self.next_steps {
            yaml.push_str("  next_steps: |\n");
            for line in next_steps.lines() {
                yaml.push_str(&format!("    {line}\n"));
            }
        }
        if let Some(spec) = &self.spec {
            yaml.push_str("spec:\n");
            for line in spec.lines() {
                yaml.push_str(&format!("  {line}\n"));
            }
        }
        yaml
    }

    /// Write under `<library>/<kind>/<id>/`, returning the template directory.
    pub fn write_to(&self, library: &Path) -> Result<PathBuf> {
        let dir = library.join(&self.kind).join(&self.id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create template dir {}", dir.display()))?;
        fs::write(dir.join("template.yaml"), self.metadata_yaml())?;
        for (path, content) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content)
                .with_context(|| format!("Failed to write fixture file {}", target.display()))?;
        }
        Ok(dir)
    }
}

/// A temporary library directory with a config file beside it.
pub struct LibraryFixture {
    temp: TempDir,
}

impl LibraryFixture {
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temp dir")?;
        fs::create_dir_all(temp.path().join("library"))?;
        Ok(Self { temp })
    }

    /// Root of the temporary area, usable for output directories.
    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn library_path(&self) -> PathBuf {
        self.temp.path().join("library")
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp.path().join("config.toml")
    }

    pub fn add(&self, template: TemplateFixture) -> Result<PathBuf> {
        template.write_to(&self.library_path())
    }

    /// Write `config.toml`; the fixture's library is not added automatically.
    pub fn write_config(&self, content: &str) -> Result<()> {
        fs::write(self.config_path(), content).context("Failed to write config fixture")
    }
}
