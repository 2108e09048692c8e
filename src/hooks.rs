//! External hook script invocation.
//!
//! Hooks are opaque commands run synchronously at fixed points of a run.
//! The exit status is returned to the caller; the pipeline logs non-zero
//! exits and continues, while a script that cannot be spawned at all aborts
//! the run as a configuration error.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};

/// Run one hook script with the given positional arguments, blocking until
/// it exits.
pub fn run_hook<I, S>(script: &Path, args: I) -> Result<ExitStatus>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(script)
        .args(args)
        .status()
        .context(format!("Failed to invoke hook script {}", script.display()))
}
