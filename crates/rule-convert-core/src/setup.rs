// crates/rule-convert-core/src/setup.rs
// ============================================================================
// Module: Setup Verification
// Description: Pre-flight checks for credentials, server reachability, tools.
// Purpose: Diagnose environment problems before a batch is started.
// Dependencies: reqwest, serde, url
// ============================================================================

//! ## Overview
//! Three independent checks, each producing a [`SetupCheck`]:
//! - credentials are exchanged for a token at the token endpoint
//! - the tool server origin answers any HTTP request
//! - `tools/list` succeeds and advertises both generation tools
//!
//! Checks never abort each other; the caller decides how to present them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderValue;
use rule_convert_config::Credentials;
use serde::Serialize;
use url::Url;
use url::form_urlencoded;

use crate::convert::missing_required_tools;
use crate::mcp_client::McpClient;
use crate::mcp_client::McpClientError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Per-request budget for the credential and reachability checks.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request budget for the tool listing check.
pub const TOOLS_CHECK_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum characters of a failing response echoed into check details.
const DETAIL_PREVIEW_CHARS: usize = 200;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identifies a setup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupCheckKind {
    /// Token exchange with the organization credentials.
    ApiCredentials,
    /// Tool server reachability.
    McpServer,
    /// Required tools advertised by the server.
    McpTools,
}

impl SetupCheckKind {
    /// Returns a stable display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ApiCredentials => "API credentials",
            Self::McpServer => "MCP server",
            Self::McpTools => "MCP tools",
        }
    }
}

/// Result of one setup check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupCheck {
    /// Which check ran.
    pub name: SetupCheckKind,
    /// Whether it passed.
    pub passed: bool,
    /// Human-readable detail.
    pub detail: String,
}

impl SetupCheck {
    /// Builds a passing check.
    fn pass(name: SetupCheckKind, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: true,
            detail: detail.into(),
        }
    }

    /// Builds a failing check.
    fn fail(name: SetupCheckKind, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: detail.into(),
        }
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Runs setup checks against one token endpoint and one tool server.
pub struct SetupVerifier {
    /// HTTP client for the credential and reachability checks.
    client: Client,
    /// Token exchange endpoint.
    token_endpoint: String,
    /// Organization credentials.
    credentials: Credentials,
}

impl SetupVerifier {
    /// Creates a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`McpClientError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        token_endpoint: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, McpClientError> {
        let client = Client::builder()
            .timeout(CHECK_TIMEOUT)
            .build()
            .map_err(|err| McpClientError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            token_endpoint: token_endpoint.into(),
            credentials,
        })
    }

    /// Exchanges the credentials for a token; passes on HTTP 200.
    pub async fn check_credentials(&self) -> SetupCheck {
        let kind = SetupCheckKind::ApiCredentials;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("oid", &self.credentials.oid)
            .append_pair("secret", &self.credentials.api_key)
            .finish();
        let response = self
            .client
            .post(&self.token_endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))
            .body(body)
            .send()
            .await;
        match response {
            Ok(response) if response.status().as_u16() == 200 => {
                SetupCheck::pass(kind, "token obtained")
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let text = response.text().await.unwrap_or_default();
                SetupCheck::fail(kind, format!("http status {status}: {}", preview(&text)))
            }
            Err(err) => SetupCheck::fail(kind, err.to_string()),
        }
    }

    /// Sends a GET to the origin of `endpoint`; any HTTP response passes.
    pub async fn check_server(&self, endpoint: &str) -> SetupCheck {
        let kind = SetupCheckKind::McpServer;
        let origin = match Url::parse(endpoint) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(err) => return SetupCheck::fail(kind, format!("invalid endpoint: {err}")),
        };
        match self.client.get(&origin).send().await {
            Ok(response) => {
                SetupCheck::pass(kind, format!("reachable (http {})", response.status().as_u16()))
            }
            Err(err) => SetupCheck::fail(kind, err.to_string()),
        }
    }

    /// Runs every check in order.
    pub async fn verify(&self, mcp: &McpClient) -> Vec<SetupCheck> {
        vec![
            self.check_credentials().await,
            self.check_server(mcp.endpoint()).await,
            check_tools(mcp).await,
        ]
    }
}

/// Lists tools and requires both generation tools.
pub async fn check_tools(mcp: &McpClient) -> SetupCheck {
    let kind = SetupCheckKind::McpTools;
    match mcp.list_tools().await {
        Ok(tools) => {
            let missing = missing_required_tools(&tools);
            if missing.is_empty() {
                SetupCheck::pass(kind, format!("{} tools available", tools.len()))
            } else {
                SetupCheck::fail(kind, format!("missing tools: {}", missing.join(", ")))
            }
        }
        Err(err) => SetupCheck::fail(kind, err.to_string()),
    }
}

/// Bounded preview of a response body.
fn preview(text: &str) -> String {
    text.trim().chars().take(DETAIL_PREVIEW_CHARS).collect()
}
