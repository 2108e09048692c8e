use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::{debug, info, warn};

use crate::collectors::{discovery, disk, rewrite, staging};
use crate::config::{CollectorConfig, RuleSet};
use crate::constants::{RUN_TIMESTAMP_FORMAT, STAGING_SUBDIR};
use crate::hooks;
use crate::sink::{FluentSink, Forwarder};
use crate::utils::compress;

/// Identity and working location of a single collection run.
///
/// The identifier combines a sub-second wall-clock timestamp with the
/// hostname, which keeps staging directories of successive runs apart
/// without any cross-process coordination.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub id: String,
    pub hostname: String,
    pub staging_dir: PathBuf,
}

impl RunContext {
    pub fn new(output_location: &Path) -> Result<Self> {
        let timestamp = Local::now().format(RUN_TIMESTAMP_FORMAT).to_string();
        let hostname = hostname::get()
            .map_err(|e| anyhow!("Failed to get hostname: {}", e))?
            .to_string_lossy()
            .replace('.', "-");

        let id = format!("{}-{}", timestamp, hostname);
        let staging_dir = output_location.join(STAGING_SUBDIR).join(&id);

        Ok(RunContext {
            id,
            hostname,
            staging_dir,
        })
    }
}

/// Execute one full collection run.
pub fn run_collection(
    config: &CollectorConfig,
    label_filter: &[String],
    rules: &RuleSet,
) -> Result<()> {
    let ctx = RunContext::new(&config.output_location)?;
    run_with_context(config, label_filter, rules, &ctx)
}

/// Execute a run against a pre-built context. Split out so tests can pin the
/// run identifier and staging location.
pub fn run_with_context(
    config: &CollectorConfig,
    label_filter: &[String],
    rules: &RuleSet,
    ctx: &RunContext,
) -> Result<()> {
    info!("Starting collection run {}", ctx.id);

    if let Some(script) = &config.pre_process_script {
        invoke_hook("preProcess", script, &[ctx.staging_dir.as_os_str()])?;
    }

    fs::create_dir_all(&ctx.staging_dir).context(format!(
        "Failed to create staging directory {}",
        ctx.staging_dir.display()
    ))?;

    disk::ensure_free_space(config, label_filter)?;

    let mut forwarder = config.fluent_processor.as_ref().map(|fluent| {
        Forwarder::new(
            FluentSink::new(&fluent.host, fluent.port, &fluent.tag),
            fluent.message_field.clone(),
            fluent.include_time,
        )
    });

    for group in &config.files {
        if !group.enabled(label_filter) {
            continue;
        }

        let files = discovery::discover(group, config.sort_files_by_date)?;
        info!("Collecting {} files for label '{}'", files.len(), group.label);

        for file in files {
            let source = staging::absolute(&file)?;
            debug!("process file: {}", source.display());

            let Some(staged) =
                staging::stage_file(&ctx.staging_dir, group, &source, config.use_full_path)?
            else {
                continue;
            };

            rewrite::rewrite_file(&staged, rules)?;

            if let Some(script) = &config.process_file_script {
                invoke_hook(
                    "processFile",
                    script,
                    &[staged.as_os_str(), OsStr::new(&group.label)],
                )?;
            }

            if let Some(fwd) = forwarder.as_mut() {
                if let Err(e) = fwd.forward_file(&group.label, &source, &staged) {
                    warn!("Failed to forward {} to sink: {}", staged.display(), e);
                }
            }

            if config.delete_processed_temp_files_one_by_one {
                fs::remove_file(&staged).context(format!(
                    "Failed to remove processed file {}",
                    staged.display()
                ))?;
            }
        }
    }

    if let Some(script) = &config.process_files_folder_script {
        invoke_hook("processFilesFolder", script, &[ctx.staging_dir.as_os_str()])?;
    }

    let artifact = if config.compress {
        let output_base = config.output_location.join(&ctx.id);
        Some(compress::make_archive(
            &ctx.staging_dir,
            &output_base,
            config.compress_format,
        )?)
    } else {
        info!("skipping file compression");
        None
    };

    if config.delete_processed_temp_files {
        fs::remove_dir_all(&ctx.staging_dir).context(format!(
            "Failed to remove staging directory {}",
            ctx.staging_dir.display()
        ))?;
    } else {
        info!(
            "keep processed files in '{}' folder",
            ctx.staging_dir.display()
        );
    }

    if let (Some(artifact), Some(script)) = (&artifact, &config.output_script) {
        invoke_hook("output", script, &[artifact.as_os_str()])?;
        if config.delete_compressed_file {
            fs::remove_file(artifact).context(format!(
                "Failed to remove compressed file {}",
                artifact.display()
            ))?;
        }
    }

    if let Some(fwd) = forwarder {
        if let Err(e) = fwd.close() {
            warn!("Failed to close sink connection: {}", e);
        }
    }

    info!("Collection run {} completed", ctx.id);
    Ok(())
}

/// Exit codes of hooks are surfaced as warnings only; failure to spawn a
/// hook at all is a configuration error and aborts the run.
fn invoke_hook(name: &str, script: &Path, args: &[&OsStr]) -> Result<()> {
    debug!("Invoking {} hook: {}", name, script.display());
    let status = hooks::run_hook(script, args.iter().copied())?;
    if !status.success() {
        warn!("{} hook {} exited with {}", name, script.display(), status);
    }
    Ok(())
}
