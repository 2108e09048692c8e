use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::rules::RewriteRule;
use crate::constants::{
    DEFAULT_DISK_SPACE_RATIO, DEFAULT_FLUENT_HOST, DEFAULT_FLUENT_PORT, DEFAULT_MESSAGE_FIELD,
};

/// Top-level configuration document. Everything lives under the `collector`
/// key; its absence is a fatal configuration error.
#[derive(Debug, Serialize, Deserialize, Clone)]
struct ConfigFile {
    collector: CollectorConfig,
}

/// Archive format for the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressFormat {
    #[default]
    Zip,
    Tar,
    Gztar,
    Bztar,
}

impl CompressFormat {
    /// File extension of the produced artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            CompressFormat::Zip => "zip",
            CompressFormat::Tar => "tar",
            CompressFormat::Gztar => "tar.gz",
            CompressFormat::Bztar => "tar.bz2",
        }
    }
}

/// Unknown format values fall back to zip rather than failing the run.
fn compress_format_or_zip<'de, D>(deserializer: D) -> Result<CompressFormat, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.as_str() {
        "tar" => CompressFormat::Tar,
        "gztar" => CompressFormat::Gztar,
        "bztar" => CompressFormat::Bztar,
        _ => CompressFormat::Zip,
    })
}

/// One labelled set of files to collect.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FileGroup {
    pub label: String,
    /// Glob pattern selecting the group's files.
    pub path: String,
    /// Glob patterns whose matches are dropped from the group.
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Extra directory inserted between the staging root and the label.
    #[serde(default)]
    pub folder_prefix: Option<String>,
    /// Per-group override of the global full-path policy.
    #[serde(default)]
    pub use_full_path: Option<bool>,
    /// Per-group override of the global date-ordering policy.
    #[serde(default)]
    pub sort_files_by_date: Option<bool>,
}

impl FileGroup {
    /// A group participates iff the filter is empty or names its label.
    pub fn enabled(&self, label_filter: &[String]) -> bool {
        label_filter.is_empty() || label_filter.iter().any(|l| l == &self.label)
    }
}

/// Logger section of the configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<String>,
    /// Accepted for compatibility; simplelog renders its own line format.
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Fluentd forward endpoint settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FluentConfig {
    #[serde(default = "default_fluent_host")]
    pub host: String,
    #[serde(default = "default_fluent_port")]
    pub port: u16,
    /// Base tag prepended to every record name.
    #[serde(default)]
    pub tag: String,
    /// Accepted for compatibility with existing configurations.
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default = "default_message_field")]
    pub message_field: String,
    #[serde(default)]
    pub include_time: bool,
}

/// Parsed, validated view of a collection run.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CollectorConfig {
    pub output_location: PathBuf,
    #[serde(default)]
    pub output_script: Option<PathBuf>,
    #[serde(default)]
    pub pre_process_script: Option<PathBuf>,
    #[serde(default)]
    pub process_file_script: Option<PathBuf>,
    #[serde(default)]
    pub process_files_folder_script: Option<PathBuf>,
    pub files: Vec<FileGroup>,
    #[serde(default = "default_true")]
    pub use_full_path: bool,
    #[serde(default, deserialize_with = "compress_format_or_zip")]
    pub compress_format: CompressFormat,
    #[serde(default = "default_true")]
    pub sort_files_by_date: bool,
    #[serde(default = "default_true")]
    pub compress: bool,
    #[serde(default = "default_true")]
    pub delete_processed_temp_files: bool,
    #[serde(default)]
    pub delete_processed_temp_files_one_by_one: bool,
    #[serde(default)]
    pub delete_compressed_file: bool,
    #[serde(default = "default_true")]
    pub check_disk_space: bool,
    #[serde(default = "default_disk_space_ratio")]
    pub required_disk_space_ratio: f64,
    #[serde(default)]
    pub rules: Vec<RewriteRule>,
    #[serde(default)]
    pub logger: Option<LoggerConfig>,
    #[serde(default)]
    pub fluent_processor: Option<FluentConfig>,
}

fn default_true() -> bool {
    true
}

fn default_disk_space_ratio() -> f64 {
    DEFAULT_DISK_SPACE_RATIO
}

fn default_fluent_host() -> String {
    DEFAULT_FLUENT_HOST.to_string()
}

fn default_fluent_port() -> u16 {
    DEFAULT_FLUENT_PORT
}

fn default_message_field() -> String {
    DEFAULT_MESSAGE_FIELD.to_string()
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<CollectorConfig> {
    let content = fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;

    let config: ConfigFile = serde_yaml::from_str(&content)
        .context(format!("Failed to parse config file: {}", path.display()))?;

    Ok(config.collector)
}
