//! Planning and writing rendered output.
//!
//! Nothing lands in the destination until every file has been written to a staging
//! directory next to it. A missing destination is created by renaming the staging
//! directory; an existing one receives per-file renames. Dry runs stop after
//! planning.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::renderer::RenderOutput;
use crate::constants::STAGING_PREFIX;
use crate::core::BoilerplateError;
use crate::utils::fs::{ensure_dir, is_empty_dir, set_mode, short_checksum};

/// What writing would do to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Create,
    Overwrite,
    Unchanged,
}

impl FileAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Overwrite => "overwrite",
            Self::Unchanged => "unchanged",
        }
    }
}

/// One output file in a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedFile {
    /// Relative to the destination
    pub path: PathBuf,
    pub size: usize,
    /// Short SHA-256 of the content
    pub digest: String,
    pub action: FileAction,
}

/// The full effect of writing a render result.
#[derive(Debug, Clone, Serialize)]
pub struct OutputPlan {
    pub destination: PathBuf,
    /// Destination exists and has entries
    pub destination_occupied: bool,
    pub files: Vec<PlannedFile>,
    /// Dynamic files that rendered empty
    pub skipped: Vec<PathBuf>,
}

impl OutputPlan {
    pub fn total_size(&self) -> usize {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn count(&self, action: FileAction) -> usize {
        self.files.iter().filter(|f| f.action == action).count()
    }
}

/// Compare rendered output with what is at `destination`, touching nothing.
pub fn plan_output(output: &RenderOutput, destination: &Path) -> Result<OutputPlan> {
    let destination_occupied = !is_empty_dir(destination)?;

    let files = output
        .files
        .iter()
        .map(|file| {
            let target = destination.join(&file.path);
            let action = if !target.exists() {
                FileAction::Create
            } else if fs::read(&target).is_ok_and(|existing| existing == file.content) {
                FileAction::Unchanged
            } else {
                FileAction::Overwrite
            };
            PlannedFile {
                path: file.path.clone(),
                size: file.content.len(),
                digest: short_checksum(&file.content),
                action,
            }
        })
        .collect();

    Ok(OutputPlan {
        destination: destination.to_path_buf(),
        destination_occupied,
        files,
        skipped: output.skipped.clone(),
    })
}

/// Write `output` under `destination` through a staging directory.
///
/// An occupied destination is an [`BoilerplateError::OutputConflict`] unless `force`
/// is set. Unix permission bits of source files and directories are applied to the
/// files and directories this call creates.
pub fn write_output(output: &RenderOutput, destination: &Path, force: bool) -> Result<OutputPlan> {
    let plan = plan_output(output, destination)?;
    if plan.destination_occupied && !force {
        return Err(BoilerplateError::OutputConflict {
            path: destination.to_path_buf(),
        }
        .into());
    }
    if destination.exists() && !destination.is_dir() {
        anyhow::bail!("Destination is not a directory: {}", destination.display());
    }

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&parent)?;

    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(&parent)
        .with_context(|| format!("Failed to create staging directory in {}", parent.display()))?;

    for file in &output.files {
        let staged = staging.path().join(&file.path);
        if let Some(dir) = staged.parent() {
            ensure_dir(dir)?;
        }
        fs::write(&staged, &file.content)
            .with_context(|| format!("Failed to stage {}", file.path.display()))?;
        if let Some(mode) = file.mode {
            set_mode(&staged, mode)?;
        }
    }

    if !destination.exists() {
        for (dir, mode) in &output.dir_modes {
            let staged = staging.path().join(dir);
            if staged.is_dir() {
                set_mode(&staged, *mode)?;
            }
        }
        set_mode(staging.path(), 0o755)?;
        fs::rename(staging.path(), destination).with_context(|| {
            format!("Failed to move output into place at {}", destination.display())
        })?;
        tracing::info!("Wrote {} file(s) to new directory {}", output.files.len(), destination.display());
        return Ok(plan);
    }

    let created_dirs: Vec<(PathBuf, u32)> = output
        .dir_modes
        .iter()
        .map(|(dir, mode)| (destination.join(dir), *mode))
        .filter(|(dir, _)| !dir.exists())
        .collect();

    for file in &output.files {
        let target = destination.join(&file.path);
        if let Some(dir) = target.parent() {
            ensure_dir(dir)?;
        }
        if target.is_dir() {
            anyhow::bail!("Cannot replace directory {} with a file", target.display());
        }
        fs::rename(staging.path().join(&file.path), &target)
            .with_context(|| format!("Failed to move {} into place", file.path.display()))?;
    }
    // existing directories keep their permissions
    for (dir, mode) in &created_dirs {
        if dir.is_dir() {
            set_mode(dir, *mode)?;
        }
    }
    tracing::info!("Wrote {} file(s) to {}", output.files.len(), destination.display());

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templating::renderer::RenderedFile;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn output(files: &[(&str, &str)]) -> RenderOutput {
        RenderOutput {
            files: files
                .iter()
                .map(|(path, content)| RenderedFile {
                    path: PathBuf::from(path),
                    source: PathBuf::from(format!("{path}.j2")),
                    content: content.as_bytes().to_vec(),
                    mode: None,
                })
                .collect(),
            skipped: Vec::new(),
            dir_modes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_write_to_new_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let rendered = output(&[("compose.yaml", "a: 1\n"), ("config/app.conf", "x\n")]);

        let plan = write_output(&rendered, &dest, false).unwrap();
        assert_eq!(plan.count(FileAction::Create), 2);
        assert_eq!(fs::read_to_string(dest.join("config/app.conf")).unwrap(), "x\n");

        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_occupied_destination_requires_force() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("compose.yaml"), "old\n").unwrap();
        fs::write(temp.path().join("keep.txt"), "keep\n").unwrap();
        let rendered = output(&[("compose.yaml", "new\n")]);

        let err = write_output(&rendered, temp.path(), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BoilerplateError>(),
            Some(BoilerplateError::OutputConflict { .. })
        ));
        assert_eq!(fs::read_to_string(temp.path().join("compose.yaml")).unwrap(), "old\n");

        let plan = write_output(&rendered, temp.path(), true).unwrap();
        assert_eq!(plan.count(FileAction::Overwrite), 1);
        assert_eq!(fs::read_to_string(temp.path().join("compose.yaml")).unwrap(), "new\n");
        assert!(temp.path().join("keep.txt").exists());
    }

    #[test]
    fn test_plan_touches_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("same.txt"), "same\n").unwrap();
        let rendered = output(&[("same.txt", "same\n"), ("new.txt", "new\n")]);

        let plan = plan_output(&rendered, temp.path()).unwrap();
        assert!(plan.destination_occupied);
        assert_eq!(plan.count(FileAction::Unchanged), 1);
        assert_eq!(plan.count(FileAction::Create), 1);
        assert_eq!(plan.files[1].digest.len(), 12);
        assert_eq!(plan.total_size(), 9);
        assert!(!temp.path().join("new.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_modes_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let mut rendered = output(&[("run.sh", "#!/bin/sh\n")]);
        rendered.files[0].mode = Some(0o755);

        write_output(&rendered, &dest, false).unwrap();
        let mode = fs::metadata(dest.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_modes_mirror_source() {
        use std::os::unix::fs::PermissionsExt;
        let dir_mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let mut rendered = output(&[("secrets/db.env", "x\n"), ("conf/app.conf", "y\n")]);
        rendered.dir_modes.insert(PathBuf::from("secrets"), 0o700);
        rendered.dir_modes.insert(PathBuf::from("conf"), 0o750);

        write_output(&rendered, &dest, false).unwrap();
        assert_eq!(dir_mode(&dest.join("secrets")), 0o700);
        assert_eq!(dir_mode(&dest.join("conf")), 0o750);

        let existing = TempDir::new().unwrap();
        fs::create_dir(existing.path().join("conf")).unwrap();
        fs::set_permissions(existing.path().join("conf"), fs::Permissions::from_mode(0o755)).unwrap();
        write_output(&rendered, existing.path(), true).unwrap();
        assert_eq!(dir_mode(&existing.path().join("conf")), 0o755);
        assert_eq!(dir_mode(&existing.path().join("secrets")), 0o700);
    }
}
