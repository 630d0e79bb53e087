// crates/rule-convert-core/src/batch.rs
// ============================================================================
// Module: Batch Driver
// Description: Bounded parallel conversion of every rule file in a directory.
// Purpose: Fan conversions out to a worker pool and aggregate their outcomes.
// Dependencies: tokio, thiserror
// ============================================================================

//! ## Overview
//! [`BatchRunner`] discovers eligible rule files, converts each one on a task
//! gated by a semaphore sized to the worker count, and collects outcomes in
//! completion order. Per-file failures become failed outcomes; only
//! directory-level problems surface as [`BatchError`]. Statistics are updated
//! under a mutex that is never held across I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use rule_convert_config::WorkerCount;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::audit::BatchSummaryEvent;
use crate::audit::ConversionEvent;
use crate::audit::EventSink;
use crate::convert::RuleConverter;
use crate::interfaces::ToolInvoker;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Failure reason recorded for empty or whitespace-only inputs.
pub const EMPTY_FILE_ERROR: &str = "Empty file";
/// Failure reason recorded when a conversion fails without a message.
pub const GENERIC_FAILURE: &str = "Conversion failed";
/// Extension of converted output files.
pub const OUTPUT_EXTENSION: &str = "yaml";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Directory-level batch failures.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The rules directory could not be listed.
    #[error("failed to read rules directory {path}: {error}")]
    ReadDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying error text.
        error: String,
    },
    /// The output directory could not be created.
    #[error("failed to create output directory {path}: {error}")]
    CreateOutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying error text.
        error: String,
    },
}

// ============================================================================
// SECTION: Outcomes and Statistics
// ============================================================================

/// Result of converting one file.
///
/// # Invariants
/// - Success means both fragments are present and `error` is `None`.
/// - Failure means `error` is a non-empty message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    /// Source file path.
    pub source: PathBuf,
    /// Detection fragment on success.
    pub detection: Option<String>,
    /// Response fragment on success.
    pub response: Option<String>,
    /// Written output path on success.
    pub output: Option<PathBuf>,
    /// Failure reason.
    pub error: Option<String>,
}

impl ConversionOutcome {
    /// Builds a successful outcome.
    #[must_use]
    pub const fn success(
        source: PathBuf,
        detection: String,
        response: String,
        output: PathBuf,
    ) -> Self {
        Self {
            source,
            detection: Some(detection),
            response: Some(response),
            output: Some(output),
            error: None,
        }
    }

    /// Builds a failed outcome; a blank message becomes a generic one.
    #[must_use]
    pub fn failure(source: PathBuf, message: impl Into<String>) -> Self {
        let message = message.into();
        let message =
            if message.trim().is_empty() { GENERIC_FAILURE.to_string() } else { message };
        Self {
            source,
            detection: None,
            response: None,
            output: None,
            error: Some(message),
        }
    }

    /// Returns true when both fragments were produced and written.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none() && self.detection.is_some() && self.response.is_some()
    }

    /// Returns the source file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name_of(&self.source)
    }
}

/// One failed file in the run statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    /// Source file name.
    pub file: String,
    /// Failure reason.
    pub error: String,
}

/// Aggregate counts for a run.
///
/// # Invariants
/// - `success + failed <= total`, with equality once every file completed.
/// - `errors` is in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Files discovered.
    pub total: usize,
    /// Files converted.
    pub success: usize,
    /// Files that failed.
    pub failed: usize,
    /// Per-file failures.
    pub errors: Vec<FileError>,
}

impl RunStatistics {
    /// Creates empty statistics for `total` files.
    #[must_use]
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            success: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// Records one completed file.
    pub fn record(&mut self, outcome: &ConversionOutcome) {
        if outcome.is_success() {
            self.success = self.success.saturating_add(1);
            return;
        }
        self.failed = self.failed.saturating_add(1);
        self.errors.push(FileError {
            file: outcome.file_name(),
            error: outcome.error.clone().unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        });
    }

    /// Success percentage with the denominator clamped to at least one.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = f64::from(u32::try_from(self.total.max(1)).unwrap_or(u32::MAX));
        let success = f64::from(u32::try_from(self.success).unwrap_or(u32::MAX));
        success / total * 100.0
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Final statistics.
    pub statistics: RunStatistics,
    /// Outcomes in completion order.
    pub outcomes: Vec<ConversionOutcome>,
    /// Wall-clock duration of the batch.
    pub duration: Duration,
}

// ============================================================================
// SECTION: Progress
// ============================================================================

/// Receives one notification per completed file.
pub trait ProgressSink: Send + Sync {
    /// Called with the completion ordinal (1-based), the total, and the outcome.
    fn file_completed(&self, completed: usize, total: usize, outcome: &ConversionOutcome);
}

/// Progress sink that ignores notifications.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn file_completed(&self, _completed: usize, _total: usize, _outcome: &ConversionOutcome) {}
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Lists eligible rule files in `input_dir`, sorted by name.
///
/// Eligible files are regular files (symlinks followed) whose names do not
/// start with `.`. Directories are never listed, so an output directory nested
/// in `input_dir` is excluded. The scan runs on the blocking thread pool.
///
/// # Errors
///
/// Returns [`BatchError::ReadDir`] when the directory cannot be listed.
pub async fn discover_rule_files(input_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let dir = input_dir.to_path_buf();
    tokio::task::spawn_blocking(move || scan_rule_dir(&dir)).await.map_err(|err| {
        BatchError::ReadDir {
            path: input_dir.to_path_buf(),
            error: err.to_string(),
        }
    })?
}

/// Synchronous directory scan behind [`discover_rule_files`].
fn scan_rule_dir(input_dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let read_error = |err: std::io::Error| BatchError::ReadDir {
        path: input_dir.to_path_buf(),
        error: err.to_string(),
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if file_name_of(&path).starts_with('.') {
            continue;
        }
        if fs::metadata(&path).is_ok_and(|meta| meta.is_file()) {
            files.push(path);
        }
    }
    files.sort_by_key(|path| path.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(files)
}

/// Returns the output path for `source` inside `output_dir`.
#[must_use]
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let stem =
        source.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
    output_dir.join(format!("{stem}.{OUTPUT_EXTENSION}"))
}

/// Lossy file name of a path.
fn file_name_of(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default()
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs conversions over a directory with bounded parallelism.
pub struct BatchRunner<T: ?Sized> {
    /// Shared converter.
    converter: Arc<RuleConverter<T>>,
    /// Worker pool size.
    workers: WorkerCount,
    /// Event sink for conversion and summary events.
    events: Arc<dyn EventSink>,
}

impl<T> BatchRunner<T>
where
    T: ToolInvoker + ?Sized + 'static,
{
    /// Creates a runner.
    pub fn new(
        converter: Arc<RuleConverter<T>>,
        workers: WorkerCount,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            converter,
            workers,
            events,
        }
    }

    /// Converts every eligible file in `input_dir`, writing into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError`] when the input directory cannot be listed or the
    /// output directory cannot be created. Per-file failures never error.
    pub async fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<BatchSummary, BatchError> {
        let started = Instant::now();
        tokio::fs::create_dir_all(output_dir).await.map_err(|err| {
            BatchError::CreateOutputDir {
                path: output_dir.to_path_buf(),
                error: err.to_string(),
            }
        })?;
        let files = discover_rule_files(input_dir).await?;
        let total = files.len();
        let statistics = Arc::new(Mutex::new(RunStatistics::new(total)));
        let semaphore = Arc::new(Semaphore::new(self.workers.get()));
        let mut tasks = JoinSet::new();
        let mut sources = HashMap::with_capacity(total);

        for source in files {
            let converter = Arc::clone(&self.converter);
            let semaphore = Arc::clone(&semaphore);
            let statistics = Arc::clone(&statistics);
            let events = Arc::clone(&self.events);
            let output_dir = output_dir.to_path_buf();
            let task_source = source.clone();
            let handle = tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return ConversionOutcome::failure(task_source, "worker pool closed");
                };
                let outcome = convert_file(&converter, &task_source, &output_dir, &*events).await;
                statistics.lock().unwrap_or_else(PoisonError::into_inner).record(&outcome);
                outcome
            });
            sources.insert(handle.id(), source);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, outcome)) => outcome,
                Err(err) => {
                    let source = sources.remove(&err.id()).unwrap_or_default();
                    let outcome =
                        ConversionOutcome::failure(source, format!("worker failed: {err}"));
                    statistics.lock().unwrap_or_else(PoisonError::into_inner).record(&outcome);
                    outcome
                }
            };
            progress.file_completed(outcomes.len().saturating_add(1), total, &outcome);
            outcomes.push(outcome);
        }

        let statistics = statistics.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let duration = started.elapsed();
        self.events.record_batch(&BatchSummaryEvent::new(
            statistics.total,
            statistics.success,
            statistics.failed,
            duration,
        ));
        Ok(BatchSummary {
            statistics,
            outcomes,
            duration,
        })
    }
}

/// Converts one file; every failure becomes a failed outcome.
async fn convert_file<T>(
    converter: &RuleConverter<T>,
    source: &Path,
    output_dir: &Path,
    events: &dyn EventSink,
) -> ConversionOutcome
where
    T: ToolInvoker + ?Sized,
{
    let started = Instant::now();
    let file_name = file_name_of(source);
    let outcome = match tokio::fs::read_to_string(source).await {
        Err(err) => ConversionOutcome::failure(source.to_path_buf(), err.to_string()),
        Ok(text) if text.trim().is_empty() => {
            ConversionOutcome::failure(source.to_path_buf(), EMPTY_FILE_ERROR)
        }
        Ok(text) => match converter.convert(&file_name, &text).await {
            Err(err) => ConversionOutcome::failure(source.to_path_buf(), err.to_string()),
            Ok(rule) => match rule.to_dr_rule_yaml() {
                Err(err) => ConversionOutcome::failure(source.to_path_buf(), err.to_string()),
                Ok(document) => {
                    let output = output_path_for(source, output_dir);
                    match tokio::fs::write(&output, document).await {
                        Ok(()) => ConversionOutcome::success(
                            source.to_path_buf(),
                            rule.detection,
                            rule.response,
                            output,
                        ),
                        Err(err) => {
                            ConversionOutcome::failure(source.to_path_buf(), err.to_string())
                        }
                    }
                }
            },
        },
    };
    events.record_conversion(&ConversionEvent::new(
        file_name,
        started.elapsed(),
        outcome.output.as_ref().map(|path| path.display().to_string()),
        outcome.error.clone(),
    ));
    outcome
}
