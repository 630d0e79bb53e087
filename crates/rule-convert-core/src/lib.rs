// crates/rule-convert-core/src/lib.rs
// ============================================================================
// Module: Rule Convert Core Library
// Description: Remote tool client, result unwrapping, and batch conversion.
// Purpose: Turn third-party detection rules into detection+response documents.
// Dependencies: reqwest, serde, serde_json, serde_yaml, tokio, time, thiserror
// ============================================================================

//! ## Overview
//! `rule-convert-core` drives conversion of detection rules through a remote
//! tool-invocation server spoken to over JSON-RPC 2.0. Each rule file costs
//! two sequential tool calls (detection, then response); a bounded worker
//! pool processes a directory of files concurrently and aggregates results.
//!
//! Security posture: tool results and fetched resources are untrusted; bodies
//! are size-limited and credentials are never written to events or reports.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod batch;
pub mod convert;
pub mod extract;
pub mod interfaces;
pub mod mcp_client;
pub mod report;
pub mod setup;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::EventSink;
pub use audit::FileEventSink;
pub use audit::NoopEventSink;
pub use audit::StderrEventSink;
pub use batch::BatchError;
pub use batch::BatchRunner;
pub use batch::BatchSummary;
pub use batch::ConversionOutcome;
pub use batch::ProgressSink;
pub use batch::RunStatistics;
pub use convert::ConversionError;
pub use convert::ConvertedRule;
pub use convert::RuleConverter;
pub use extract::ToolOutput;
pub use extract::extract_yaml;
pub use interfaces::ResourceFetcher;
pub use interfaces::ToolInvoker;
pub use mcp_client::McpClient;
pub use mcp_client::McpClientConfig;
pub use mcp_client::McpClientError;
pub use mcp_client::ToolDescriptor;
