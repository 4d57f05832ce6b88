//! The user-wide configuration file.
//!
//! Stored as TOML at `<config dir>/boilerplates/config.toml` unless `--config` or
//! `BOILERPLATES_CONFIG` points elsewhere:
//!
//! ```toml
//! [[libraries]]
//! name = "default"
//! path = "~/boilerplates/library"
//!
//! [[libraries]]
//! name = "team"
//! path = "/srv/templates"
//!
//! [defaults.compose]
//! restart_policy = "always"
//! traefik_enabled = true
//! ```
//!
//! Libraries are listed in priority order. `[defaults.<kind>]` tables hold the
//! persisted value layer applied to every template of that kind.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::BoilerplateError;
use crate::library::Library;
use crate::utils::atomic_write;

/// One `[[libraries]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    /// May start with `~` or reference environment variables
    pub path: String,
}

impl LibraryConfig {
    /// Expand the path into a [`Library`].
    pub fn to_library(&self) -> Result<Library> {
        let expanded = shellexpand::full(&self.path)
            .with_context(|| format!("Failed to expand path of library '{}'", self.name))?;
        Ok(Library::new(&self.name, PathBuf::from(expanded.as_ref())))
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryConfig>,

    /// Persisted defaults, keyed by module kind then variable name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub defaults: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl GlobalConfig {
    /// Load from `path`; a missing file yields the empty configuration.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Self = toml::from_str(&content).map_err(|e| BoilerplateError::ConfigError {
            message: format!("{}: {}", path.display(), e.message()),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Write to `path` atomically, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error while saving config: {}", e))?
    }

    /// `<config dir>/boilerplates/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine the user config directory"))?;
        Ok(dir.join("boilerplates").join("config.toml"))
    }

    /// Library used when none is configured.
    pub fn default_library() -> Option<Library> {
        dirs::data_dir().map(|dir| Library::new("default", dir.join("boilerplates").join("library")))
    }

    /// Configured libraries in priority order, or the default one.
    pub fn libraries(&self) -> Result<Vec<Library>> {
        if self.libraries.is_empty() {
            return Ok(Self::default_library().into_iter().collect());
        }
        self.libraries.iter().map(LibraryConfig::to_library).collect()
    }

    /// The persisted value layer for templates of `kind`.
    pub fn defaults_for(&self, kind: &str) -> Result<BTreeMap<String, serde_yaml::Value>> {
        let Some(table) = self.defaults.get(kind) else {
            return Ok(BTreeMap::new());
        };
        table
            .iter()
            .map(|(name, value)| {
                let converted = serde_yaml::to_value(value).with_context(|| {
                    format!("Default '{name}' for '{kind}' cannot be used as a value")
                })?;
                Ok((name.clone(), converted))
            })
            .collect()
    }

    /// Store a persisted default. Returns the previous value.
    pub fn set_default(
        &mut self,
        kind: &str,
        name: &str,
        value: toml::Value,
    ) -> Option<toml::Value> {
        self.defaults.entry(kind.to_string()).or_default().insert(name.to_string(), value)
    }

    /// Remove a persisted default. Empty kind tables are dropped.
    pub fn remove_default(&mut self, kind: &str, name: &str) -> Option<toml::Value> {
        let table = self.defaults.get_mut(kind)?;
        let removed = table.remove(name);
        if table.is_empty() {
            self.defaults.remove(kind);
        }
        removed
    }

    fn check(&self) -> Result<(), BoilerplateError> {
        let mut seen = std::collections::HashSet::new();
        for library in &self.libraries {
            if library.name.trim().is_empty() {
                return Err(BoilerplateError::ConfigError {
                    message: "library entry with an empty name".to_string(),
                });
            }
            if !seen.insert(library.name.as_str()) {
                return Err(BoilerplateError::ConfigError {
                    message: format!("library '{}' is configured twice", library.name),
                });
            }
        }
        Ok(())
    }
}

/// Read a command-line value as a TOML literal, falling back to a string.
///
/// `true`, `8080` and `1.5` keep their types; anything else, including bare words,
/// is stored as text.
pub fn parse_default_value(raw: &str) -> toml::Value {
    match toml::from_str::<BTreeMap<String, toml::Value>>(&format!("value = {raw}")) {
        Ok(mut table) => match table.remove("value") {
            Some(value @ (toml::Value::Boolean(_) | toml::Value::Integer(_) | toml::Value::Float(_))) => {
                value
            }
            _ => toml::Value::String(raw.to_string()),
        },
        Err(_) => toml::Value::String(raw.to_string()),
    }
}
