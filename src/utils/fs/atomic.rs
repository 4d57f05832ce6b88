//! Atomic file writes using a temp-and-rename strategy.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::dirs::ensure_dir;

/// Write bytes to `path` so readers see either the old or the new content.
///
/// The content goes to a sibling `.tmp` file, is synced, then renamed over the target.
/// Parent directories are created.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;
        file.sync_all().context("Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;
    Ok(())
}
