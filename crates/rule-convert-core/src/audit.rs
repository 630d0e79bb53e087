// crates/rule-convert-core/src/audit.rs
// ============================================================================
// Module: Conversion Event Logging
// Description: Structured events for tool calls, file conversions, and batches.
// Purpose: Emit redacted JSON-line events without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Event payloads and sinks for conversion runs. Sinks write one JSON object
//! per line to stderr or to an append-only file; the no-op sink discards
//! everything. Events carry file names, tool names, sizes, and outcomes, never
//! credentials or rule contents.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome label shared by all events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// Operation succeeded.
    Ok,
    /// Operation failed.
    Error,
}

/// One remote tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Tool name.
    pub tool: String,
    /// Source rule file name.
    pub file: String,
    /// Size of the query argument in bytes.
    pub query_bytes: usize,
    /// Advertised size of a linked result payload, when the result was a link.
    pub resource_bytes: Option<u64>,
    /// Call outcome.
    pub outcome: EventOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
    /// Failure reason when the call failed.
    pub error: Option<String>,
}

/// Inputs for [`ToolCallEvent::new`].
#[derive(Debug, Clone)]
pub struct ToolCallEventParams {
    /// Tool name.
    pub tool: String,
    /// Source rule file name.
    pub file: String,
    /// Size of the query argument in bytes.
    pub query_bytes: usize,
    /// Advertised size of a linked result payload.
    pub resource_bytes: Option<u64>,
    /// Wall-clock duration.
    pub duration: Duration,
    /// Failure reason when the call failed.
    pub error: Option<String>,
}

/// One rule file conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Source rule file name.
    pub file: String,
    /// Conversion outcome.
    pub outcome: EventOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
    /// Written output path on success.
    pub output: Option<String>,
    /// Failure reason when the conversion failed.
    pub error: Option<String>,
}

/// End-of-run totals.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummaryEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Files considered.
    pub total: usize,
    /// Files converted.
    pub success: usize,
    /// Files that failed.
    pub failed: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// Milliseconds since the Unix epoch, or zero when the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Outcome label for an optional error.
const fn outcome_for(error: Option<&String>) -> EventOutcome {
    if error.is_some() { EventOutcome::Error } else { EventOutcome::Ok }
}

impl ToolCallEvent {
    /// Creates a tool call event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ToolCallEventParams) -> Self {
        Self {
            event: "tool_call",
            timestamp_ms: now_ms(),
            outcome: outcome_for(params.error.as_ref()),
            tool: params.tool,
            file: params.file,
            query_bytes: params.query_bytes,
            resource_bytes: params.resource_bytes,
            duration_ms: params.duration.as_millis(),
            error: params.error,
        }
    }
}

impl ConversionEvent {
    /// Creates a conversion event with a consistent timestamp.
    #[must_use]
    pub fn new(
        file: String,
        duration: Duration,
        output: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            event: "rule_conversion",
            timestamp_ms: now_ms(),
            outcome: outcome_for(error.as_ref()),
            file,
            duration_ms: duration.as_millis(),
            output,
            error,
        }
    }
}

impl BatchSummaryEvent {
    /// Creates a batch summary event with a consistent timestamp.
    #[must_use]
    pub fn new(total: usize, success: usize, failed: usize, duration: Duration) -> Self {
        Self {
            event: "batch_summary",
            timestamp_ms: now_ms(),
            total,
            success,
            failed,
            duration_ms: duration.as_millis(),
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Event sink interface.
pub trait EventSink: Send + Sync {
    /// Records a tool call.
    fn record_tool_call(&self, event: &ToolCallEvent);

    /// Records a file conversion.
    fn record_conversion(&self, event: &ConversionEvent);

    /// Records end-of-run totals.
    fn record_batch(&self, _event: &BatchSummaryEvent) {}
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl StderrEventSink {
    /// Writes one event line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl EventSink for StderrEventSink {
    fn record_tool_call(&self, event: &ToolCallEvent) {
        Self::emit(event);
    }

    fn record_conversion(&self, event: &ConversionEvent) {
        Self::emit(event);
    }

    fn record_batch(&self, event: &BatchSummaryEvent) {
        Self::emit(event);
    }
}

/// Event sink that appends JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one event line and flushes.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl EventSink for FileEventSink {
    fn record_tool_call(&self, event: &ToolCallEvent) {
        self.emit(event);
    }

    fn record_conversion(&self, event: &ConversionEvent) {
        self.emit(event);
    }

    fn record_batch(&self, event: &BatchSummaryEvent) {
        self.emit(event);
    }
}

/// No-op event sink.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record_tool_call(&self, _event: &ToolCallEvent) {}

    fn record_conversion(&self, _event: &ConversionEvent) {}
}
