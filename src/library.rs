//! Template libraries on disk.
//!
//! A library is a directory laid out as `<root>/<kind>/<template-id>/template.yaml`.
//! Libraries are searched in priority order. When several define the same id for a
//! kind, the first keeps the bare id and later ones are qualified as `id.library`.
//!
//! Loading a library reads only metadata files. Each is read on the blocking pool;
//! a template that fails to load is logged and skipped, never fatal to the batch.

use anyhow::{Context, Result};
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{METADATA_FILES, batch_operation_timeout};
use crate::core::BoilerplateError;
use crate::templating::TemplateDescriptor;
use crate::utils::ProgressBar;

/// A named library root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub root: PathBuf,
}

impl Library {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Kind directories present in this library.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = subdirectories(&self.root)
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .filter(|n| !n.starts_with('.'))
            .collect();
        kinds.sort();
        kinds
    }
}

/// A template directory found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub dir: PathBuf,
    pub library: String,
    /// Kind directory the template sits in
    pub kind: String,
    /// A higher-priority library already has this id
    pub needs_qualification: bool,
}

/// Find template directories, optionally for one kind, in library priority order.
pub fn discover(libraries: &[Library], kind: Option<&str>) -> Vec<LibraryEntry> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut entries = Vec::new();

    for library in libraries {
        if !library.root.is_dir() {
            warn!("Library '{}' not found at {}", library.name, library.root.display());
            continue;
        }
        for kind_name in library.kinds() {
            if kind.is_some_and(|k| k != kind_name) {
                continue;
            }
            let mut dirs = subdirectories(&library.root.join(&kind_name));
            dirs.sort();
            for dir in dirs {
                if !METADATA_FILES.iter().any(|f| dir.join(f).is_file()) {
                    continue;
                }
                let Some(id) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                    continue;
                };
                let needs_qualification = !seen.insert((kind_name.clone(), id));
                entries.push(LibraryEntry {
                    dir,
                    library: library.name.clone(),
                    kind: kind_name.clone(),
                    needs_qualification,
                });
            }
        }
    }

    debug!("Discovered {} template(s) in {} librar(ies)", entries.len(), libraries.len());
    entries
}

/// Load descriptors for `entries` concurrently, skipping failures.
pub async fn load_descriptors(
    entries: Vec<LibraryEntry>,
    progress: &ProgressBar,
) -> Result<Vec<TemplateDescriptor>> {
    let tasks = entries.into_iter().map(|entry| {
        let progress = progress.clone();
        async move {
            let dir = entry.dir.clone();
            let library = entry.library.clone();
            let result = tokio::task::spawn_blocking(move || TemplateDescriptor::load(&dir, &library))
                .await;
            progress.inc(1);
            (entry, result)
        }
    });

    let results = tokio::time::timeout(batch_operation_timeout(), join_all(tasks))
        .await
        .context("Timed out loading template metadata")?;

    let mut descriptors = Vec::with_capacity(results.len());
    for (entry, result) in results {
        match result {
            Ok(Ok(mut descriptor)) => {
                if descriptor.kind != entry.kind {
                    warn!(
                        "Template {} declares kind '{}' but sits under '{}'",
                        entry.dir.display(),
                        descriptor.kind,
                        entry.kind
                    );
                }
                if entry.needs_qualification {
                    descriptor.qualify();
                }
                descriptors.push(descriptor);
            }
            Ok(Err(e)) => warn!("Skipping template {}: {}", entry.dir.display(), e),
            Err(e) => warn!("Skipping template {}: task failed: {}", entry.dir.display(), e),
        }
    }
    Ok(descriptors)
}

/// Discover and load every template, optionally for one kind.
pub async fn load_library(
    libraries: &[Library],
    kind: Option<&str>,
    progress: &ProgressBar,
) -> Result<Vec<TemplateDescriptor>> {
    let entries = discover(libraries, kind);
    progress.set_message(format!("Loading {} template(s)", entries.len()));
    load_descriptors(entries, progress).await
}

/// Look a template up by id. Shadowed templates are found by their qualified id.
pub fn find_template<'a>(
    descriptors: &'a [TemplateDescriptor],
    id: &str,
) -> Result<&'a TemplateDescriptor, BoilerplateError> {
    descriptors.iter().find(|d| d.id == id).ok_or_else(|| BoilerplateError::TemplateNotFound {
        id: id.to_string(),
    })
}

fn subdirectories(path: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect()
}
