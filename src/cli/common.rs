//! State shared by the subcommands: config, libraries and the resolver.

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::CliConfig;
use crate::config::GlobalConfig;
use crate::library::{Library, find_template, load_library};
use crate::resolver::TemplateResolver;
use crate::schema::{ModuleRegistry, ModuleSpecCache};
use crate::templating::TemplateDescriptor;
use crate::utils::ProgressBar;

/// Everything a command needs after global flags are applied.
pub struct CommandContext {
    pub config_path: PathBuf,
    pub config: GlobalConfig,
    /// In priority order, `--library` paths first
    pub libraries: Vec<Library>,
    pub show_progress: bool,
    resolver: TemplateResolver,
}

impl CommandContext {
    pub async fn load(cli: &CliConfig) -> Result<Self> {
        let config_path = match &cli.config_path {
            Some(path) => path.clone(),
            None => GlobalConfig::default_path()?,
        };
        let config = GlobalConfig::load_from(&config_path).await?;

        let mut libraries: Vec<Library> =
            cli.libraries.iter().enumerate().map(|(i, path)| ad_hoc_library(i, path)).collect();
        libraries.extend(config.libraries()?);

        let resolver = TemplateResolver::new(
            Arc::new(ModuleRegistry::builtin()),
            Arc::new(ModuleSpecCache::new()),
        );

        Ok(Self {
            config_path,
            config,
            libraries,
            show_progress: !cli.no_progress,
            resolver,
        })
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    /// Load every template (of one kind, if given) from all libraries.
    pub async fn templates(&self, kind: Option<&str>) -> Result<Vec<TemplateDescriptor>> {
        let spinner = ProgressBar::new_spinner(self.show_progress);
        spinner.set_message("Loading templates");
        let result = load_library(&self.libraries, kind, &spinner).await;
        spinner.finish_and_clear();
        result
    }

    /// Find one template by id.
    pub async fn template(&self, id: &str) -> Result<TemplateDescriptor> {
        let templates = self.templates(None).await?;
        Ok(find_template(&templates, id)?.clone())
    }

    /// Saved defaults for `kind`, or nothing when `skip` is set.
    pub fn persisted_layer(
        &self,
        kind: &str,
        skip: bool,
    ) -> Result<BTreeMap<String, serde_yaml::Value>> {
        if skip {
            return Ok(BTreeMap::new());
        }
        self.config
            .defaults_for(kind)
            .with_context(|| format!("Invalid saved defaults in {}", self.config_path.display()))
    }
}

fn ad_hoc_library(index: usize, path: &Path) -> Library {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("local{}", index + 1));
    Library::new(name, path)
}

/// Print a yellow warning line to stderr.
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message);
}
