use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, error};

use crate::collectors::discovery;
use crate::config::{CollectorConfig, FileGroup};

/// Pre-flight free-disk-space guard.
///
/// Sums the on-disk size of every file the run would collect and fails the
/// run before any copy when the output filesystem cannot hold it. When the
/// check is disabled this is a no-op.
pub fn ensure_free_space(config: &CollectorConfig, label_filter: &[String]) -> Result<()> {
    if !config.check_disk_space {
        debug!("disk space check is disabled");
        return Ok(());
    }
    debug!("disk space check is enabled");

    let total_size = projected_size(&config.files, label_filter)?;
    let free_space = fs2::available_space(&config.output_location).context(format!(
        "Failed to query free space at {}",
        config.output_location.display()
    ))?;
    let required_space = required_space(total_size, config.required_disk_space_ratio);

    if exceeds_free_space(total_size, free_space) {
        error!(
            "there is not enough free space for file collection - free space: {}, required space: {}",
            free_space, required_space
        );
        bail!(
            "insufficient disk space at {} (free: {}, required: {})",
            config.output_location.display(),
            free_space,
            required_space
        );
    }

    debug!(
        "free disk space: {}, required disk space: {}",
        free_space, required_space
    );
    Ok(())
}

/// Total byte size of every glob match of every filtered group.
///
/// Exclusion patterns are deliberately not applied here; the guard may
/// overestimate but never underestimates.
pub fn projected_size(groups: &[FileGroup], label_filter: &[String]) -> Result<u64> {
    let mut total = 0u64;
    for group in groups {
        if !group.enabled(label_filter) {
            continue;
        }
        for path in discovery::expand(&group.path)? {
            total += file_size(&path);
        }
    }
    Ok(total)
}

/// Free space demanded by the configured ratio, used for reporting.
pub fn required_space(total_size: u64, ratio: f64) -> u64 {
    (total_size as f64 * ratio) as u64
}

/// The gate compares the raw projected total against free space; the
/// ratio-scaled value is reported but not compared.
pub fn exceeds_free_space(total_size: u64, free_space: u64) -> bool {
    total_size > free_space
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}
