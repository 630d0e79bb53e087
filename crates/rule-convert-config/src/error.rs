// crates/rule-convert-config/src/error.rs
// ============================================================================
// Module: Config Errors
// Description: Error taxonomy for credential and settings resolution.
// Purpose: Surface configuration failures before any network activity.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Error taxonomy for credential and settings resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors.
///
/// # Invariants
/// - Every variant is fatal for the run and is raised before remote calls.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading configuration inputs.
    #[error("config io error: {0}")]
    Io(String),
    /// YAML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Worker count outside the accepted range.
    #[error("parallel workers must be between {min} and {max} (got {value})")]
    InvalidWorkerCount {
        /// Rejected value.
        value: i64,
        /// Minimum accepted value.
        min: usize,
        /// Maximum accepted value.
        max: usize,
    },
    /// A required value was not supplied.
    #[error("missing required value: {0}")]
    Missing(&'static str),
    /// Rules directory does not exist.
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    /// Rules path exists but is not a directory.
    #[error("path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}
