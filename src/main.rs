use std::fs::File;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use filecollector::cli::Args;
use filecollector::collectors::run;
use filecollector::config::{load_config, LoggerConfig, RuleSet};

fn main() {
    let args = Args::parse();

    if let Err(e) = try_main(&args) {
        // Config loading can fail before the logger exists.
        if log::log_enabled!(log::Level::Error) {
            error!("{:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        process::exit(1);
    }
}

fn try_main(args: &Args) -> Result<()> {
    let config = load_config(&args.config)?;
    initialize_logging(config.logger.as_ref())?;
    debug!("Loaded configuration from {}", args.config.display());

    let rules = RuleSet::compile(&config.rules)?;
    let labels = args.filtered_labels();

    run::run_collection(&config, &labels, &rules)
}

/// Initialize logging from the configuration's logger section: terminal
/// output always, plus a log file when one is configured.
fn initialize_logging(config: Option<&LoggerConfig>) -> Result<()> {
    let level = config
        .and_then(|c| c.level.as_deref())
        .map(parse_level)
        .unwrap_or(LevelFilter::Info);

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(file) = config.and_then(|c| c.file.as_ref()) {
        let handle = File::create(file)
            .context(format!("Failed to open log file: {}", file.display()))?;
        loggers.push(WriteLogger::new(level, Config::default(), handle));
    }

    CombinedLogger::init(loggers).context("Failed to initialize logger")?;
    Ok(())
}

fn parse_level(raw: &str) -> LevelFilter {
    match raw.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}
