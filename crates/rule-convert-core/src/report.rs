// crates/rule-convert-core/src/report.rs
// ============================================================================
// Module: Run Report
// Description: Plain-text summary of a conversion run.
// Purpose: Persist totals, duration, and per-file errors next to the outputs.
// Dependencies: time, thiserror
// ============================================================================

//! ## Overview
//! Renders and writes `report.txt`. The layout is fixed so that operators can
//! diff reports across runs: a header, the generation time and duration, a
//! summary block, an error block when any file failed, and a footer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::batch::RunStatistics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the run report inside the output directory.
pub const REPORT_FILE_NAME: &str = "report.txt";
/// Width of the report rules.
const RULE_WIDTH: usize = 70;
/// Timestamp layout of the `Generated:` line.
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report rendering and persistence failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Timestamp formatting failed.
    #[error("report timestamp formatting failed: {0}")]
    Format(String),
    /// Report file could not be written.
    #[error("failed to write report {path}: {error}")]
    Write {
        /// Report path.
        path: PathBuf,
        /// Underlying error text.
        error: String,
    },
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Current local time, or UTC when the local offset is unavailable.
#[must_use]
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Renders the report text.
///
/// # Errors
///
/// Returns [`ReportError::Format`] when the timestamp cannot be formatted.
pub fn render_report(
    statistics: &RunStatistics,
    generated_at: OffsetDateTime,
    duration: Duration,
) -> Result<String, ReportError> {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let generated = generated_at
        .format(TIMESTAMP_FORMAT)
        .map_err(|err| ReportError::Format(err.to_string()))?;

    let mut lines = vec![
        heavy.clone(),
        "RULE CONVERSION REPORT".to_string(),
        heavy.clone(),
        String::new(),
        format!("Generated: {generated}"),
        format!("Duration: {:.2} seconds", duration.as_secs_f64()),
        String::new(),
        "SUMMARY".to_string(),
        light.clone(),
        format!("Total rules processed: {}", statistics.total),
        format!("Successfully converted: {}", statistics.success),
        format!("Failed conversions: {}", statistics.failed),
        format!("Success rate: {:.1}%", statistics.success_rate()),
        String::new(),
    ];

    if !statistics.errors.is_empty() {
        lines.push("ERRORS".to_string());
        lines.push(light);
        for error in &statistics.errors {
            lines.push(format!("\nFile: {}", error.file));
            lines.push(format!("Error: {}", error.error));
        }
        lines.push(String::new());
    }

    lines.push(heavy.clone());
    lines.push("END OF REPORT".to_string());
    lines.push(heavy);
    Ok(lines.join("\n"))
}

/// Writes report text to `<output_dir>/report.txt` and returns the path.
///
/// # Errors
///
/// Returns [`ReportError::Write`] when the file cannot be written.
pub fn write_report(output_dir: &Path, content: &str) -> Result<PathBuf, ReportError> {
    let path = output_dir.join(REPORT_FILE_NAME);
    fs::write(&path, content).map_err(|err| ReportError::Write {
        path: path.clone(),
        error: err.to_string(),
    })?;
    Ok(path)
}
