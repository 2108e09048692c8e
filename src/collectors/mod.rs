//! The collection pipeline: discovery, disk-space guard, staging, line
//! rewriting and run orchestration.

/// Glob expansion, date ordering and exclusion handling
pub mod discovery;

/// Pre-flight free-disk-space guard
pub mod disk;

/// Per-line rewrite-rule application
pub mod rewrite;

/// Run orchestration and per-run context
pub mod run;

/// Destination mapping and staging-copy handling
pub mod staging;
