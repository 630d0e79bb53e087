// crates/rule-convert-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Provides message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings for future localization support.
// Dependencies: Standard library collections and formatting utilities.
// ============================================================================

//! ## Overview
//! The Rule Convert CLI stores user-facing strings in a small translation
//! catalog to enforce consistent messaging and to prepare for future locales.
//! All runtime output should be routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself to avoid panics.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries loaded into the localized message bundle.
pub(crate) const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "rule-convert {version}"),
    ("main.banner.title", "LIMACHARLIE RULE CONVERSION TOOL"),
    ("verify.banner.title", "LIMACHARLIE SETUP VERIFICATION"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("config.invalid", "ERROR: {error}"),
    (
        "config.confirmation_required",
        "ERROR: the data ingestion confirmation cannot be asked in non-interactive mode. Pass \
         --skip-confirmation once the platform adapter is ingesting data.",
    ),
    ("prompt.required", "This field is required. Please enter a value."),
    ("prompt.yes_no", "Please answer 'yes' or 'no'"),
    ("credentials.found", "✓ Found LimaCharlie credentials from {source}"),
    ("credentials.oid", "  Organization ID: {oid}"),
    ("credentials.api_key", "  API Key: {api_key}"),
    ("credentials.confirm", "Use these credentials? (yes/no) [yes]"),
    ("credentials.accepted", "✓ Using detected credentials"),
    ("credentials.declined", "Credentials declined. Please enter manually."),
    ("credentials.intro", "First, we need your LimaCharlie credentials."),
    (
        "credentials.intro_hint",
        "You can find these in the LimaCharlie web interface under Access Management > REST API",
    ),
    ("credentials.prompt.oid", "Enter your LimaCharlie Organization ID (OID)"),
    ("credentials.prompt.api_key", "Enter your LimaCharlie API Key"),
    (
        "platform.intro",
        "Enter the source platform name. This should match the platform you've\nconfigured in \
         LimaCharlie (e.g., 'okta', 'crowdstrike', 'windows', 'linux').",
    ),
    ("platform.prompt", "Enter the source platform name"),
    ("rules_dir.intro", "Enter the path to the directory containing your source rules."),
    ("rules_dir.prompt", "Enter the rules directory path"),
    ("ingestion.header", "IMPORTANT: Data Ingestion Verification"),
    (
        "ingestion.body",
        "The AI conversion tools require that you have already configured the\n'{platform}' \
         platform/adapter in LimaCharlie and that data is actively\nbeing ingested. The tools \
         analyze your actual data schema to generate\naccurate detection rules.\n\nHave you:\n  \
         1. Set up the '{platform}' adapter/sensor in LimaCharlie?\n  2. Verified events are \
         flowing in the Timeline?\n  3. Waited at least 5-10 minutes for data collection?",
    ),
    ("ingestion.question", "Have you completed these steps? (yes/no)"),
    (
        "ingestion.declined",
        "Exiting. Please set up data ingestion first, then run the conversion again.",
    ),
    ("run.rules_dir", "Processing rules from: {path}"),
    ("run.output_dir", "Output directory: {path}"),
    ("run.event_log_failed", "Failed to open event log {path}: {error}"),
    ("run.client_failed", "ERROR: Failed to initialize MCP client: {error}"),
    ("run.no_files", "No rule files found in {path}"),
    ("run.processing", "Processing {count} rule file(s) with {workers} parallel workers:"),
    ("run.progress.success", "[{completed}/{total}] {file} ... ✓ Success"),
    ("run.progress.failure", "[{completed}/{total}] {file} ... ✗ {error}"),
    ("run.batch_failed", "ERROR: conversion run failed: {error}"),
    ("run.interrupted", "Conversion interrupted by user."),
    ("run.report_failed", "ERROR: {error}"),
    ("tools.discovering", "Discovering MCP tools..."),
    ("tools.found", "✓ Found {tool}"),
    ("tools.missing", "✗ Warning: {tool} tool not found"),
    ("tools.discovery_failed", "✗ Error discovering tools: {error}"),
    (
        "tools.missing_guidance",
        "ERROR: Required tools not found on MCP server.\nPlease ensure:\n  1. You have AI features \
         enabled in your LimaCharlie organization\n  2. Your API key has proper permissions\n  3. \
         The MCP server is accessible\n\nContact LimaCharlie support if issues persist.",
    ),
    ("summary.title", "Conversion Complete!"),
    ("summary.converted", "Converted: {success}/{total} rules"),
    ("summary.failed", "Failed: {failed}/{total} rules"),
    ("summary.report", "See {path} for details"),
    ("verify.init_failed", "ERROR: Failed to initialize setup checks: {error}"),
    ("verify.check.pass", "[PASS] {name}: {detail}"),
    ("verify.check.fail", "[FAIL] {name}: {detail}"),
    ("verify.summary", "{passed}/{total} checks passed"),
    ("verify.ok", "Setup verified. Ready to convert rules."),
    (
        "verify.failed",
        "Setup verification failed. Resolve the failing checks above and run --verify again.",
    ),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the English fallback catalog while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static English catalog used by the CLI.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
///
/// # Returns
///
/// A localized [`String`] with placeholders substituted.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
