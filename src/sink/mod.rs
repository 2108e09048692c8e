//! Structured-log sink forwarding.
//!
//! A [`Sink`] is an external ingestion endpoint that receives one record per
//! forwarded line. Delivery is best-effort: a failed emit is logged and
//! never aborts the run, and the connection is closed exactly once at the
//! very end of the run.

mod fluent;

pub use fluent::FluentSink;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::warn;

use crate::constants::LABEL_WILDCARD;

/// External structured-log ingestion endpoint.
pub trait Sink {
    /// Emit one record under `tag`, optionally with a capture timestamp
    /// (seconds since the epoch).
    fn emit(
        &mut self,
        tag: &str,
        fields: &HashMap<String, String>,
        timestamp: Option<u64>,
    ) -> Result<()>;

    /// Close the underlying connection.
    fn close(&mut self) -> Result<()>;
}

/// Resolve the record name for a file.
///
/// A wildcard in the label is substituted with the original source path,
/// path separators replaced by dots, giving each file its own record name.
pub fn record_name(label: &str, source: &Path) -> String {
    if label.contains(LABEL_WILDCARD) {
        let dotted = source
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, ".");
        label.replace(LABEL_WILDCARD, &dotted)
    } else {
        label.to_string()
    }
}

/// Streams staged files to a sink, line by line.
pub struct Forwarder<S: Sink> {
    sink: S,
    message_field: String,
    include_time: bool,
}

impl<S: Sink> Forwarder<S> {
    pub fn new(sink: S, message_field: impl Into<String>, include_time: bool) -> Self {
        Forwarder {
            sink,
            message_field: message_field.into(),
            include_time,
        }
    }

    /// Emit one record per line of the staged file.
    ///
    /// Per-line delivery failures are logged and skipped; only a failure to
    /// read the staged file itself is returned to the caller (who logs it
    /// and continues with the next file).
    pub fn forward_file(&mut self, label: &str, source: &Path, staged: &Path) -> Result<()> {
        let name = record_name(label, source);
        let file = File::open(staged)
            .context(format!("Failed to open staged file {}", staged.display()))?;

        for line in BufReader::new(file).lines() {
            let line =
                line.context(format!("Failed to read line from {}", staged.display()))?;
            let mut fields = HashMap::new();
            fields.insert(self.message_field.clone(), line);
            let timestamp = self.include_time.then(now_epoch);

            if let Err(e) = self.sink.emit(&name, &fields, timestamp) {
                warn!("Failed to forward line to sink: {}", e);
            }
        }
        Ok(())
    }

    /// Close the sink connection. Called once, after all files.
    pub fn close(mut self) -> Result<()> {
        self.sink.close()
    }
}

fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
