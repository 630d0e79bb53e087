// crates/rule-convert-core/src/mcp_client.rs
// ============================================================================
// Module: MCP Client
// Description: Streamable-HTTP JSON-RPC client for remote rule-generation tools.
// Purpose: List and invoke remote tools and fetch linked result resources.
// Dependencies: reqwest, serde, serde_json, rule-convert-config
// ============================================================================

//! ## Overview
//! A minimal JSON-RPC 2.0 client for the remote tool-invocation server. Every
//! request is an HTTP POST carrying a bearer credential and the organization
//! header; replies arrive either as a single JSON envelope or as an event
//! stream whose `data: ` lines carry envelopes. The first session identifier
//! the server hands back is remembered and echoed on later requests.
//!
//! Security posture: server replies are untrusted; bodies are size-limited,
//! redirects are refused on the RPC channel, and credentials never appear in
//! errors or debug output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::OnceLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::redirect::Policy;
use rule_convert_config::Credentials;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum response body size accepted from the server or a linked resource.
pub const MAX_MCP_RESPONSE_BYTES: usize = 16 * 1024 * 1024;
/// Per-request budget for JSON-RPC calls; rule generation is slow.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(300);
/// Per-request budget for linked resource downloads.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirects followed when fetching a linked resource.
pub const MAX_FETCH_REDIRECTS: usize = 5;
/// Header carrying the server-assigned session identifier.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";
/// Header carrying the organization identifier.
pub const ORGANIZATION_HEADER: &str = "x-lc-oid";
/// Accept header value for streamable-HTTP replies.
const ACCEPT_VALUE: &str = "application/json, text/event-stream";
/// Prefix of event-stream lines that carry a payload.
const SSE_DATA_PREFIX: &str = "data: ";
/// Maximum characters of a non-2xx body echoed into errors.
const ERROR_PREVIEW_CHARS: usize = 512;

// ============================================================================
// SECTION: Types
// ============================================================================

/// MCP client configuration.
///
/// # Invariants
/// - `endpoint` is an absolute HTTP(S) URL.
/// - `credentials` are never rendered by `Debug`.
#[derive(Clone)]
pub struct McpClientConfig {
    /// JSON-RPC endpoint URL.
    pub endpoint: String,
    /// Organization credentials used for every request.
    pub credentials: Credentials,
    /// Per-request budget for JSON-RPC calls.
    pub rpc_timeout: Duration,
    /// Per-request budget for linked resource downloads.
    pub fetch_timeout: Duration,
}

impl McpClientConfig {
    /// Builds a configuration with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for McpClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClientConfig")
            .field("endpoint", &self.endpoint)
            .field("oid", &self.credentials.oid)
            .field("api_key", &"<redacted>")
            .field("rpc_timeout", &self.rpc_timeout)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish()
    }
}

/// MCP client errors.
///
/// # Invariants
/// - String payloads are user-facing and may include untrusted server text.
#[derive(Debug, Error)]
pub enum McpClientError {
    /// Configuration error.
    #[error("mcp client config error: {0}")]
    Config(String),
    /// Transport error, including non-2xx statuses and timeouts.
    #[error("mcp transport error: {0}")]
    Transport(String),
    /// JSON serialization error.
    #[error("mcp json error: {0}")]
    Json(String),
    /// Protocol parsing error.
    #[error("mcp protocol error: {0}")]
    Protocol(String),
    /// JSON-RPC error object returned by the server.
    #[error("MCP error {code}: {message}")]
    Rpc {
        /// Server error code.
        code: i64,
        /// Server error message.
        message: String,
    },
    /// Reply content type is neither JSON nor an event stream.
    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),
    /// Response size exceeds limits.
    #[error("mcp response exceeds size limit ({actual} > {limit})")]
    ResponseTooLarge {
        /// Actual size in bytes.
        actual: usize,
        /// Maximum size in bytes.
        limit: usize,
    },
}

/// Tool metadata returned by `tools/list`.
///
/// # Invariants
/// - Values are untrusted and unvalidated.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// JSON schema of the tool input.
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// MCP client bound to one endpoint and one set of credentials.
///
/// # Invariants
/// - Request ids are strictly increasing, starting at 1.
/// - The session id is set at most once, from the first reply that carries it.
pub struct McpClient {
    /// RPC client; never follows redirects.
    rpc: Client,
    /// Resource client; follows a bounded number of redirects.
    fetch: Client,
    /// JSON-RPC endpoint URL.
    endpoint: String,
    /// Organization credentials.
    credentials: Credentials,
    /// Last issued request id.
    last_id: AtomicU64,
    /// Server-assigned session identifier.
    session_id: OnceLock<String>,
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("endpoint", &self.endpoint)
            .field("session_id", &self.session_id.get())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: JSON-RPC Structures
// ============================================================================

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    /// JSON-RPC version tag.
    jsonrpc: &'static str,
    /// Request identifier.
    id: u64,
    /// Method name to invoke.
    method: &'a str,
    /// Parameters payload.
    params: Value,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// Optional result payload.
    #[serde(default)]
    result: Option<Value>,
    /// Optional error payload.
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    /// Error code provided by the server.
    #[serde(default)]
    code: i64,
    /// Error message provided by the server.
    #[serde(default)]
    message: String,
}

impl From<JsonRpcError> for McpClientError {
    fn from(error: JsonRpcError) -> Self {
        Self::Rpc {
            code: error.code,
            message: error.message,
        }
    }
}

/// Reply body encodings accepted from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyEncoding {
    /// Single JSON envelope.
    Json,
    /// Event stream of `data: ` lines.
    EventStream,
}

// ============================================================================
// SECTION: Client
// ============================================================================

impl McpClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the endpoint is empty or an HTTP client
    /// cannot be constructed.
    pub fn new(config: McpClientConfig) -> Result<Self, McpClientError> {
        let endpoint = config.endpoint.trim().to_string();
        if endpoint.is_empty() {
            return Err(McpClientError::Config("endpoint is required".to_string()));
        }
        let rpc = Client::builder()
            .timeout(config.rpc_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        let fetch = Client::builder()
            .timeout(config.fetch_timeout)
            .redirect(Policy::limited(MAX_FETCH_REDIRECTS))
            .build()
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        Ok(Self {
            rpc,
            fetch,
            endpoint,
            credentials: config.credentials,
            last_id: AtomicU64::new(0),
            session_id: OnceLock::new(),
        })
    }

    /// Returns the endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the session identifier recorded from the server, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.get().map(String::as_str)
    }

    /// Calls `tools/list` and returns the advertised tools.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpClientError> {
        let result = self.send_request("tools/list", Value::Object(Map::new())).await?;
        let Some(tools) = result.get("tools") else {
            return Ok(Vec::new());
        };
        serde_json::from_value(tools.clone())
            .map_err(|err| McpClientError::Json(format!("invalid tools/list payload: {err}")))
    }

    /// Calls `tools/call` and returns the raw result value.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when the transport or parsing fails, or the
    /// server returns a JSON-RPC error.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, McpClientError> {
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        self.send_request("tools/call", params).await
    }

    /// Downloads a linked resource with a plain GET.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] on transport failure, a non-2xx status, an
    /// oversized body, or a body that is not UTF-8.
    pub async fn fetch_resource(&self, url: &str) -> Result<String, McpClientError> {
        let response = self
            .fetch
            .get(url)
            .send()
            .await
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        let status = response.status();
        let body = read_response_body_with_limit(response, MAX_MCP_RESPONSE_BYTES).await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        String::from_utf8(body)
            .map_err(|_| McpClientError::Protocol("resource body was not valid utf-8".to_string()))
    }

    /// Sends a JSON-RPC request and returns its `result` member.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when transport, decoding, or the server fails.
    async fn send_request(&self, method: &str, params: Value) -> Result<Value, McpClientError> {
        let id = self.next_request_id()?;
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|err| McpClientError::Json(format!("jsonrpc serialization failed: {err}")))?;
        let response = self
            .rpc
            .post(&self.endpoint)
            .headers(self.headers()?)
            .body(payload)
            .send()
            .await
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        let status = response.status();
        let encoding = reply_encoding(response.headers().get(CONTENT_TYPE));
        let session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response_body_with_limit(response, MAX_MCP_RESPONSE_BYTES).await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        if let Some(session) = session.filter(|value| !value.is_empty()) {
            let _ = self.session_id.set(session);
        }
        match encoding {
            Ok(ReplyEncoding::Json) => decode_json_reply(&body),
            Ok(ReplyEncoding::EventStream) => parse_sse_body(&body),
            Err(content_type) => Err(McpClientError::UnexpectedContentType(content_type)),
        }
    }

    /// Reserves the next request id.
    fn next_request_id(&self) -> Result<u64, McpClientError> {
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| McpClientError::Protocol("json-rpc request id overflow".to_string()))?;
        previous
            .checked_add(1)
            .ok_or_else(|| McpClientError::Protocol("json-rpc request id overflow".to_string()))
    }

    /// Builds request headers for the RPC channel.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError`] when header values are invalid.
    fn headers(&self) -> Result<HeaderMap, McpClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        let bearer = format!("Bearer {}", self.credentials.bearer_token());
        let header = HeaderValue::from_str(&bearer)
            .map_err(|_| McpClientError::Config("invalid bearer token header".to_string()))?;
        headers.insert(AUTHORIZATION, header);
        let header = HeaderValue::from_str(&self.credentials.oid)
            .map_err(|_| McpClientError::Config("invalid organization header".to_string()))?;
        headers.insert(ORGANIZATION_HEADER, header);
        if let Some(session) = self.session_id.get() {
            let header = HeaderValue::from_str(session)
                .map_err(|_| McpClientError::Protocol("invalid session id header".to_string()))?;
            headers.insert(SESSION_HEADER, header);
        }
        Ok(headers)
    }
}

// ============================================================================
// SECTION: Reply Decoding
// ============================================================================

/// Classifies a reply content type; unknown types are returned verbatim.
fn reply_encoding(content_type: Option<&HeaderValue>) -> Result<ReplyEncoding, String> {
    let raw = content_type.and_then(|value| value.to_str().ok()).unwrap_or_default();
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.starts_with("application/json") {
        Ok(ReplyEncoding::Json)
    } else if normalized.starts_with("text/event-stream") {
        Ok(ReplyEncoding::EventStream)
    } else {
        Err(raw.to_string())
    }
}

/// Decodes a single JSON-RPC envelope.
///
/// A missing `result` member decodes as an empty object.
///
/// # Errors
///
/// Returns [`McpClientError`] when the body is not an envelope or carries an
/// error object.
pub fn decode_json_reply(body: &[u8]) -> Result<Value, McpClientError> {
    let response: JsonRpcResponse = serde_json::from_slice(body)
        .map_err(|err| McpClientError::Protocol(format!("invalid json-rpc response: {err}")))?;
    if let Some(error) = response.error {
        return Err(error.into());
    }
    Ok(response.result.unwrap_or_else(|| Value::Object(Map::new())))
}

/// Scans an event-stream body for the first envelope with a result or error.
///
/// Lines without the `data: ` prefix, and data lines that are not JSON
/// objects, are skipped. A stream with no usable envelope yields an empty
/// object.
///
/// # Errors
///
/// Returns [`McpClientError`] when the body is not UTF-8 or the first usable
/// envelope carries an error object.
pub fn parse_sse_body(body: &[u8]) -> Result<Value, McpClientError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| McpClientError::Protocol("sse response was not valid utf-8".to_string()))?;
    for line in text.lines() {
        let Some(data) = line.strip_prefix(SSE_DATA_PREFIX) else {
            continue;
        };
        let Ok(Value::Object(mut envelope)) = serde_json::from_str::<Value>(data) else {
            continue;
        };
        if let Some(result) = envelope.remove("result") {
            return Ok(result);
        }
        if let Some(error) = envelope.remove("error") {
            let error: JsonRpcError = serde_json::from_value(error).unwrap_or(JsonRpcError {
                code: 0,
                message: "malformed error object".to_string(),
            });
            return Err(error.into());
        }
    }
    Ok(Value::Object(Map::new()))
}

// ============================================================================
// SECTION: HTTP Helpers
// ============================================================================

/// Builds a transport error for a non-2xx status with a bounded body preview.
fn status_error(status: u16, body: &[u8]) -> McpClientError {
    let preview: String =
        String::from_utf8_lossy(body).trim().chars().take(ERROR_PREVIEW_CHARS).collect();
    McpClientError::Transport(format!("http status {status}: {preview}"))
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_response_body_with_limit(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, McpClientError> {
    let mut body = Vec::new();
    let mut total: usize = 0;
    while let Some(chunk) =
        response.chunk().await.map_err(|err| McpClientError::Transport(err.to_string()))?
    {
        let next_total =
            total.checked_add(chunk.len()).ok_or(McpClientError::ResponseTooLarge {
                actual: usize::MAX,
                limit,
            })?;
        if next_total > limit {
            return Err(McpClientError::ResponseTooLarge {
                actual: next_total,
                limit,
            });
        }
        body.extend_from_slice(&chunk);
        total = next_total;
    }
    Ok(body)
}
