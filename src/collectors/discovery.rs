use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glob::glob;
use log::debug;

use crate::config::FileGroup;

/// Discover the files of one group.
///
/// Expands the group's glob pattern, sorts the matches by modification time
/// when date ordering resolves true, and drops every path matched by one of
/// the group's exclusion patterns. Non-regular files are left in the result;
/// they are skipped later at copy time.
pub fn discover(group: &FileGroup, sort_by_date_default: bool) -> Result<Vec<PathBuf>> {
    let mut matches = expand(&group.path)?;

    if group.sort_files_by_date.unwrap_or(sort_by_date_default) {
        matches.sort_by_key(|path| modified_time(path));
    }

    let excluded = resolve_excludes(&group.excludes)?;
    matches.retain(|path| !excluded.contains(path));

    Ok(matches)
}

/// Expand the exclusion patterns of a group into a concrete path set.
pub fn resolve_excludes(patterns: &[String]) -> Result<HashSet<PathBuf>> {
    let mut excluded = HashSet::new();
    for pattern in patterns {
        for path in expand(pattern)? {
            debug!("file {} will be excluded from processing", path.display());
            excluded.insert(path);
        }
    }
    Ok(excluded)
}

/// Expand one glob pattern, skipping matches that cannot be read.
pub fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).context(format!("Invalid glob pattern: {}", pattern))?;

    let mut matches = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => debug!("Skipping unreadable glob match: {}", e),
        }
    }
    Ok(matches)
}

fn modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
