// crates/rule-convert-cli/src/lib.rs
// ============================================================================
// Module: Rule Convert CLI Library
// Description: Shared helpers for the Rule Convert command-line interface.
// Purpose: Provide reusable components (i18n, prompts) for the CLI binary and tests.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities: the message catalog and
//! the interactive prompter. The binary entry point (`src/main.rs`) imports
//! these helpers to keep all user-facing output consistent.
//!
//! Security posture: CLI inputs are untrusted and must be validated; API keys
//! are only ever displayed masked.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
/// Line-oriented interactive prompts.
pub mod prompt;
