// crates/rule-convert-config/src/settings.rs
// ============================================================================
// Module: Run Settings
// Description: Validated settings for one conversion run.
// Purpose: Enforce worker bounds and directory checks before any I/O fan-out.
// Dependencies: dirs
// ============================================================================

//! ## Overview
//! [`RunSettings`] is the validated form of everything a conversion run needs
//! besides credentials. Construction checks are ordered so that the worker
//! count is rejected before the filesystem is touched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default remote tool-invocation endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://mcp.limacharlie.io/mcp";
/// Default token endpoint used by setup verification.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://jwt.limacharlie.io";
/// Default rules directory offered by interactive prompts.
pub const DEFAULT_RULES_DIR: &str = "./rules";
/// Name of the default output directory inside the rules directory.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "output";
/// Minimum number of parallel workers.
pub const MIN_WORKERS: usize = 1;
/// Maximum number of parallel workers.
pub const MAX_WORKERS: usize = 50;
/// Default number of parallel workers.
pub const DEFAULT_WORKERS: usize = 10;

// ============================================================================
// SECTION: Worker Count
// ============================================================================

/// Number of concurrent conversion workers, always within 1..=50.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Validates a raw worker count.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorkerCount`] when `value` is outside 1..=50.
    pub fn new(value: i64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidWorkerCount {
            value,
            min: MIN_WORKERS,
            max: MAX_WORKERS,
        };
        let count = usize::try_from(value).map_err(|_| invalid())?;
        if !(MIN_WORKERS ..= MAX_WORKERS).contains(&count) {
            return Err(invalid());
        }
        Ok(Self(count))
    }

    /// Returns the worker count.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for WorkerCount {
    fn default() -> Self {
        Self(DEFAULT_WORKERS)
    }
}

// ============================================================================
// SECTION: Run Settings
// ============================================================================

/// Validated settings for a conversion run.
///
/// # Invariants
/// - `rules_dir` existed and was a directory at construction time.
/// - `platform` and `endpoint` are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Source platform name (e.g. `okta`).
    pub platform: String,
    /// Directory holding the source rules.
    pub rules_dir: PathBuf,
    /// Directory receiving converted rules and the report.
    pub output_dir: PathBuf,
    /// Worker pool size.
    pub workers: WorkerCount,
    /// Remote tool-invocation endpoint.
    pub endpoint: String,
}

impl RunSettings {
    /// Validates and assembles run settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the platform or endpoint is empty, the
    /// endpoint is not an HTTP(S) URL, or the rules directory is missing.
    pub fn new(
        platform: &str,
        rules_dir: PathBuf,
        output_dir: Option<PathBuf>,
        workers: WorkerCount,
        endpoint: &str,
    ) -> Result<Self, ConfigError> {
        let platform = platform.trim();
        if platform.is_empty() {
            return Err(ConfigError::Missing("platform"));
        }
        let endpoint = validate_endpoint(endpoint)?;
        validate_rules_dir(&rules_dir)?;
        let output_dir = resolve_output_dir(&rules_dir, output_dir);
        Ok(Self {
            platform: platform.to_string(),
            rules_dir,
            output_dir,
            workers,
            endpoint,
        })
    }
}

/// Validates that `path` exists and is a directory.
///
/// # Errors
///
/// Returns [`ConfigError::DirectoryNotFound`] or [`ConfigError::NotADirectory`].
pub fn validate_rules_dir(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::DirectoryNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Resolves a typed directory answer: a leading `~` becomes the home
/// directory, and paths that exist are made absolute.
#[must_use]
pub fn resolve_user_path(answer: &str) -> PathBuf {
    resolve_user_path_with(answer, dirs::home_dir().as_deref())
}

/// [`resolve_user_path`] with an explicit home directory.
#[must_use]
pub fn resolve_user_path_with(answer: &str, home: Option<&Path>) -> PathBuf {
    let expanded = match (answer.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with(['/', std::path::MAIN_SEPARATOR]) => {
            home.join(rest.trim_start_matches(['/', std::path::MAIN_SEPARATOR]))
        }
        _ => PathBuf::from(answer),
    };
    fs::canonicalize(&expanded).unwrap_or(expanded)
}

/// Resolves the output directory, defaulting to `<rules_dir>/output`.
#[must_use]
pub fn resolve_output_dir(rules_dir: &Path, output_dir: Option<PathBuf>) -> PathBuf {
    output_dir.unwrap_or_else(|| rules_dir.join(DEFAULT_OUTPUT_DIR_NAME))
}

/// Validates an HTTP(S) endpoint string.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for empty or non-HTTP(S) values.
pub fn validate_endpoint(endpoint: &str) -> Result<String, ConfigError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Missing("endpoint"));
    }
    let lower = endpoint.to_ascii_lowercase();
    if !(lower.starts_with("https://") || lower.starts_with("http://")) {
        return Err(ConfigError::Invalid(format!("endpoint must be an http(s) url: {endpoint}")));
    }
    Ok(endpoint.to_string())
}
