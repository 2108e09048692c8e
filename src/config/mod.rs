//! Configuration management for collection runs.
//!
//! The YAML document is deserialized into a strongly typed schema once at
//! startup; every optional key has its default applied here so the rest of
//! the pipeline never reasons about missing fields.

mod collector_config;
mod rules;

pub use collector_config::{
    load_config, CollectorConfig, CompressFormat, FileGroup, FluentConfig, LoggerConfig,
};
pub use rules::{RewriteRule, RuleSet};
