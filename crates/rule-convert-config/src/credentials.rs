// crates/rule-convert-config/src/credentials.rs
// ============================================================================
// Module: Credential Discovery
// Description: Locates organization credentials from env vars or a home file.
// Purpose: Resolve the bearer credential without prompting when possible.
// Dependencies: dirs, serde, serde_yaml
// ============================================================================

//! ## Overview
//! Credentials are discovered in a fixed order: the `LC_OID` / `LC_API_KEY`
//! environment variables, then the YAML file `~/.limacharlie` with top-level
//! `oid` and `api_key` keys. A missing, unreadable, or malformed file is
//! treated as "no credentials" so the caller can fall back to prompting.
//!
//! ## Invariants
//! - Both halves of a credential must be non-empty for it to be returned.
//! - The API key never appears in `Debug` output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable carrying the organization identifier.
pub const OID_ENV_VAR: &str = "LC_OID";
/// Environment variable carrying the API key.
pub const API_KEY_ENV_VAR: &str = "LC_API_KEY";
/// Credentials file name inside the user's home directory.
pub const CREDENTIALS_FILE_NAME: &str = ".limacharlie";
/// Maximum credentials file size in bytes.
pub(crate) const MAX_CREDENTIALS_FILE_SIZE: usize = 1024 * 1024;
/// Number of characters kept at each end of a masked API key.
const MASK_VISIBLE_CHARS: usize = 4;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Organization credentials for the remote rule-generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Organization identifier.
    pub oid: String,
    /// API key.
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("oid", &self.oid)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Builds credentials from raw values, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when either value is empty.
    pub fn new(oid: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let oid = oid.into().trim().to_string();
        let api_key = api_key.into().trim().to_string();
        if oid.is_empty() {
            return Err(ConfigError::Missing("organization id"));
        }
        if api_key.is_empty() {
            return Err(ConfigError::Missing("api key"));
        }
        Ok(Self {
            oid,
            api_key,
        })
    }

    /// Returns the bearer credential in `<api-key>:<organization-id>` form.
    #[must_use]
    pub fn bearer_token(&self) -> String {
        format!("{}:{}", self.api_key, self.oid)
    }

    /// Returns the API key masked for display.
    #[must_use]
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }
}

/// Where a set of credentials was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Explicit command-line flags.
    CommandLine,
    /// The `LC_OID` / `LC_API_KEY` environment variables.
    Environment,
    /// A credentials file on disk.
    ConfigFile(PathBuf),
    /// Interactive prompts.
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandLine => f.write_str("command-line arguments"),
            Self::Environment => f.write_str("environment variables"),
            Self::ConfigFile(path) => write!(f, "{}", path.display()),
            Self::Prompt => f.write_str("interactive prompt"),
        }
    }
}

/// Credentials paired with their discovery source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCredentials {
    /// Resolved credentials.
    pub credentials: Credentials,
    /// Where they were found.
    pub source: CredentialSource,
}

/// On-disk credentials file layout. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    /// Default organization identifier.
    #[serde(default)]
    oid: Option<String>,
    /// Default API key.
    #[serde(default)]
    api_key: Option<String>,
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Returns the default credentials file path (`~/.limacharlie`).
#[must_use]
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CREDENTIALS_FILE_NAME))
}

/// Discovers credentials from the process environment and the default file.
#[must_use]
pub fn discover_credentials() -> Option<DiscoveredCredentials> {
    let path = default_credentials_path();
    discover_credentials_with(|key| std::env::var(key).ok(), path.as_deref())
}

/// Discovers credentials using an injected environment lookup and file path.
///
/// Environment variables win when both are non-empty; otherwise the file is
/// consulted. File errors are swallowed.
pub fn discover_credentials_with<F>(env: F, file: Option<&Path>) -> Option<DiscoveredCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let env_oid = env(OID_ENV_VAR);
    let env_api_key = env(API_KEY_ENV_VAR);
    if let (Some(oid), Some(api_key)) = (env_oid, env_api_key)
        && let Ok(credentials) = Credentials::new(oid, api_key)
    {
        return Some(DiscoveredCredentials {
            credentials,
            source: CredentialSource::Environment,
        });
    }

    let path = file?;
    let credentials = load_credentials_file(path).ok().flatten()?;
    Some(DiscoveredCredentials {
        credentials,
        source: CredentialSource::ConfigFile(path.to_path_buf()),
    })
}

/// Loads top-level credentials from a YAML credentials file.
///
/// Returns `Ok(None)` when the file does not exist or lacks either key.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file cannot be read, exceeds the size
/// limit, or is not valid YAML.
pub fn load_credentials_file(path: &Path) -> Result<Option<Credentials>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
    if bytes.len() > MAX_CREDENTIALS_FILE_SIZE {
        return Err(ConfigError::Invalid("credentials file exceeds size limit".to_string()));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let parsed: CredentialsFile =
        serde_yaml::from_slice(&bytes).map_err(|err| ConfigError::Parse(err.to_string()))?;
    match (parsed.oid, parsed.api_key) {
        (Some(oid), Some(api_key)) => Ok(Credentials::new(oid, api_key).ok()),
        _ => Ok(None),
    }
}

// ============================================================================
// SECTION: Masking
// ============================================================================

/// Masks an API key, keeping only the first and last four characters.
///
/// Keys of eight characters or fewer are fully masked.
#[must_use]
pub fn mask_api_key(api_key: &str) -> String {
    let count = api_key.chars().count();
    if count <= MASK_VISIBLE_CHARS * 2 {
        return "****".to_string();
    }
    let head: String = api_key.chars().take(MASK_VISIBLE_CHARS).collect();
    let tail: String = api_key.chars().skip(count - MASK_VISIBLE_CHARS).collect();
    format!("{head}****{tail}")
}
