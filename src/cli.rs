use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for the filecollector tool.
///
/// The configuration file drives everything; the only runtime knob is an
/// optional label filter that restricts the run to a subset of the
/// configured file groups.
#[derive(Parser, Debug)]
#[clap(name = "filecollector", about = "Collect files to a single archive")]
pub struct Args {
    /// Path to the collector configuration file
    #[clap(short, long)]
    pub config: PathBuf,

    /// Comma separated list of labels for filtering files for collection
    #[clap(short, long)]
    pub labels: Option<String>,
}

impl Args {
    /// Split the `--labels` option into individual labels.
    ///
    /// An absent or empty option yields an empty list, which disables
    /// filtering entirely.
    pub fn filtered_labels(&self) -> Vec<String> {
        match &self.labels {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }
}
