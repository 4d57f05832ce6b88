//! The file tree of a template, read only when rendering is requested.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use walkdir::WalkDir;

use super::scan::referenced_variables;
use crate::constants::{DYNAMIC_SUFFIX, METADATA_FILES};
use crate::core::{BoilerplateError, Result};

/// One file in a template tree.
#[derive(Debug)]
pub struct TemplateFile {
    /// Path relative to the template directory
    pub relative_path: PathBuf,
    /// Path relative to the output root, dynamic suffix stripped
    pub output_path: PathBuf,
    /// Rendered through the template engine rather than copied
    pub is_dynamic: bool,
    /// Unix permission bits of the source file
    pub mode: Option<u32>,
    source_path: PathBuf,
    content: OnceLock<String>,
}

impl TemplateFile {
    fn new(root: &Path, source_path: PathBuf, mode: Option<u32>) -> Result<Self> {
        let relative_path = source_path
            .strip_prefix(root)
            .map_err(|_| BoilerplateError::TemplateLoad {
                path: source_path.clone(),
                reason: format!("file is outside template directory {}", root.display()),
            })?
            .to_path_buf();

        let is_dynamic = relative_path
            .extension()
            .is_some_and(|ext| format!(".{}", ext.to_string_lossy()) == DYNAMIC_SUFFIX);
        let output_path =
            if is_dynamic { relative_path.with_extension("") } else { relative_path.clone() };

        Ok(Self {
            relative_path,
            output_path,
            is_dynamic,
            mode,
            source_path,
            content: OnceLock::new(),
        })
    }

    /// Absolute path of the source file.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Relative path with `/` separators, the name includes resolve against.
    pub fn template_name(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Text content, read from disk on first access.
    pub fn content(&self) -> Result<&str> {
        if let Some(content) = self.content.get() {
            return Ok(content.as_str());
        }
        let loaded = std::fs::read_to_string(&self.source_path).map_err(|e| {
            BoilerplateError::TemplateLoad {
                path: self.source_path.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(self.content.get_or_init(|| loaded).as_str())
    }
}

/// Every file of a template, excluding its metadata file.
#[derive(Debug)]
pub struct TemplateBody {
    root: PathBuf,
    files: Vec<TemplateFile>,
    /// Permission bits of subdirectories, keyed by relative path
    dir_modes: BTreeMap<PathBuf, u32>,
}

impl TemplateBody {
    /// Walk `root`, sorted by path so rendering order is stable.
    pub fn load(root: &Path) -> Result<Self> {
        let mut files = Vec::new();
        let mut dir_modes = BTreeMap::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| BoilerplateError::TemplateLoad {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_dir() {
                if entry.depth() > 0 {
                    let mode = entry.metadata().ok().as_ref().and_then(file_mode);
                    if let (Some(mode), Ok(relative)) = (mode, entry.path().strip_prefix(root)) {
                        dir_modes.insert(relative.to_path_buf(), mode);
                    }
                }
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.depth() == 1
                && METADATA_FILES.iter().any(|name| entry.file_name() == *name)
            {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| BoilerplateError::TemplateLoad {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
            files.push(TemplateFile::new(root, entry.into_path(), file_mode(&metadata))?);
        }

        tracing::debug!("Collected {} file(s) from {}", files.len(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
            files,
            dir_modes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[TemplateFile] {
        &self.files
    }

    pub fn dir_modes(&self) -> &BTreeMap<PathBuf, u32> {
        &self.dir_modes
    }

    pub fn dynamic_files(&self) -> impl Iterator<Item = &TemplateFile> {
        self.files.iter().filter(|f| f.is_dynamic)
    }

    pub fn static_files(&self) -> impl Iterator<Item = &TemplateFile> {
        self.files.iter().filter(|f| !f.is_dynamic)
    }

    /// Variables referenced by dynamic files, each mapped to the files using it.
    pub fn used_variables(&self) -> Result<BTreeMap<String, Vec<PathBuf>>> {
        let mut used: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for file in self.dynamic_files() {
            for name in referenced_variables(file.content()?) {
                used.entry(name).or_default().push(file.relative_path.clone());
            }
        }
        Ok(used)
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}
