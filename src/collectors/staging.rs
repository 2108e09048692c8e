use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::config::FileGroup;

/// Resolve a discovered path against the current directory without touching
/// the filesystem.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = env::current_dir().context("Failed to resolve current directory")?;
        Ok(cwd.join(path))
    }
}

/// Compute where a source file lands inside the staging directory.
///
/// The destination directory is `staging[/folderPrefix]/label`. With the
/// full-path policy the file keeps its root-stripped absolute path below
/// that, so same-named files from different directories never collide; with
/// the basename policy collisions are possible and the last writer wins.
pub fn destination_path(
    staging_dir: &Path,
    group: &FileGroup,
    source: &Path,
    use_full_path_default: bool,
) -> PathBuf {
    let mut dest_dir = staging_dir.to_path_buf();
    if let Some(prefix) = &group.folder_prefix {
        dest_dir.push(prefix);
    }
    dest_dir.push(&group.label);

    if group.use_full_path.unwrap_or(use_full_path_default) {
        // Drop the root (and drive prefix on Windows) so the absolute source
        // path re-roots below the destination directory.
        let rel: PathBuf = source
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        dest_dir.join(rel)
    } else {
        dest_dir.join(source.file_name().unwrap_or_default())
    }
}

/// Copy one discovered file into the staging directory.
///
/// Parent directories are created first; the copy itself only happens for
/// regular files, anything else is skipped. A failed copy is fatal for the
/// run. Returns the staged path, or `None` when the match was skipped.
pub fn stage_file(
    staging_dir: &Path,
    group: &FileGroup,
    source: &Path,
    use_full_path_default: bool,
) -> Result<Option<PathBuf>> {
    let dest = destination_path(staging_dir, group, source, use_full_path_default);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).context(format!(
            "Failed to create staging directory {}",
            parent.display()
        ))?;
    }

    let is_regular_file = fs::metadata(source)
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_regular_file {
        debug!("skipping non-regular file: {}", source.display());
        return Ok(None);
    }

    fs::copy(source, &dest).context(format!(
        "Failed to copy {} to {}",
        source.display(),
        dest.display()
    ))?;
    Ok(Some(dest))
}
