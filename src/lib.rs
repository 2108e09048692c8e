//! # filecollector
//!
//! Collects files scattered across a filesystem according to a declarative
//! YAML configuration, optionally redacts their contents, packages them into
//! a single archive, and optionally forwards each line to a Fluentd-style
//! log sink.
//!
//! ## Overview
//!
//! A run is one pass over the configured file groups: expand each group's
//! glob pattern, copy the matches into a per-run staging directory, apply
//! the configured rewrite rules line by line, then compress the staging
//! directory into one deliverable artifact.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use filecollector::config::{load_config, RuleSet};
//! use filecollector::collectors::run;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = load_config(Path::new("collector.yaml"))?;
//! let rules = RuleSet::compile(&config.rules)?;
//! run::run_collection(&config, &[], &rules)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Configuration schema, loading and validation
//! - [`collectors`]: Discovery, staging, rewriting and the run pipeline
//! - [`utils`]: Archive building
//! - [`sink`]: Structured-log sink forwarding
//! - [`hooks`]: External script invocation
//! - [`constants`]: Application-wide defaults

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Configuration schema, loading and validation
pub mod config;

/// File discovery, staging, rewriting and the run pipeline
pub mod collectors;

/// Utility functions for archive building
pub mod utils;

/// Structured-log sink forwarding
pub mod sink;

/// External hook script invocation
pub mod hooks;

/// Application constants and default values
pub mod constants;
