// crates/rule-convert-config/src/lib.rs
// ============================================================================
// Module: Rule Convert Config Library
// Description: Credential discovery and validated run settings.
// Purpose: Single source of truth for credentials and conversion run limits.
// Dependencies: dirs, serde, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! `rule-convert-config` resolves the organization credentials used to reach
//! the remote rule-generation service and validates the settings of a single
//! conversion run. Validation fails closed before any network activity.
//!
//! Security posture: credential files and CLI inputs are untrusted; secrets
//! are never rendered unmasked by this crate.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod credentials;
pub mod error;
pub mod settings;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::*;
pub use error::ConfigError;
pub use settings::*;
