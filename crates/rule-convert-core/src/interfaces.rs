// crates/rule-convert-core/src/interfaces.rs
// ============================================================================
// Module: Rule Conversion Interfaces
// Description: Backend-agnostic seams for tool invocation and resource fetches.
// Purpose: Decouple conversion orchestration from the HTTP client.
// Dependencies: async-trait, serde_json
// ============================================================================

//! ## Overview
//! The converter only needs two capabilities from the remote side: invoke a
//! named tool with JSON arguments, and download a linked resource. Both are
//! traits so the orchestrator can be driven by in-process fakes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::mcp_client::McpClient;
use crate::mcp_client::McpClientError;

// ============================================================================
// SECTION: Interfaces
// ============================================================================

/// Downloads resources referenced by tool results.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches `url` and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the download fails.
    async fn fetch_resource(&self, url: &str) -> Result<String, McpClientError>;
}

/// Invokes named remote tools.
#[async_trait]
pub trait ToolInvoker: ResourceFetcher {
    /// Calls `name` with `arguments` and returns the raw result value.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the call fails.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpClientError>;
}

// ============================================================================
// SECTION: MCP Implementations
// ============================================================================

#[async_trait]
impl ResourceFetcher for McpClient {
    async fn fetch_resource(&self, url: &str) -> Result<String, McpClientError> {
        Self::fetch_resource(self, url).await
    }
}

#[async_trait]
impl ToolInvoker for McpClient {
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpClientError> {
        Self::call_tool(self, name, arguments).await
    }
}
