//! Global constants for the filecollector application.
//!
//! This module centralizes default values so configuration changes stay in
//! one place.

/// Subdirectory of the output location that holds per-run staging directories
pub const STAGING_SUBDIR: &str = "tmp";

/// Timestamp format used for run identifiers (sub-second precision)
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%6f";

/// Suffix appended to an archive path while it is being written
pub const PARTIAL_ARCHIVE_SUFFIX: &str = "partial";

/// Default free-disk-space ratio required before collection starts
pub const DEFAULT_DISK_SPACE_RATIO: f64 = 1.0;

/// Default Fluentd forward endpoint host
pub const DEFAULT_FLUENT_HOST: &str = "localhost";

/// Default Fluentd forward endpoint port
pub const DEFAULT_FLUENT_PORT: u16 = 24224;

/// Default record field that carries the forwarded line
pub const DEFAULT_MESSAGE_FIELD: &str = "message";

/// Wildcard marker in a label that is replaced with the source path
pub const LABEL_WILDCARD: char = '*';
