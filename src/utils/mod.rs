//! Utility modules.

/// Archive building for the collected staging directory
pub mod compress;
