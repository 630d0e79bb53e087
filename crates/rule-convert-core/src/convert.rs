// crates/rule-convert-core/src/convert.rs
// ============================================================================
// Module: Conversion Orchestrator
// Description: Two-step detection/response generation for one rule file.
// Purpose: Produce a merged detection-and-response document per input rule.
// Dependencies: serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! [`RuleConverter`] turns one source rule into a detection fragment and then,
//! with that fragment as context, into a response fragment. The two calls are
//! strictly sequential. [`merge_dr_rule`] combines both fragments into a single
//! YAML document with `detect` ahead of `respond`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use serde_yaml::Mapping;
use serde_yaml::Value as YamlValue;
use thiserror::Error;

use crate::audit::EventSink;
use crate::audit::ToolCallEvent;
use crate::audit::ToolCallEventParams;
use crate::extract::ToolOutput;
use crate::extract::extract_output;
use crate::interfaces::ToolInvoker;
use crate::mcp_client::McpClientError;
use crate::mcp_client::ToolDescriptor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Remote tool that generates the detection component.
pub const DETECTION_TOOL: &str = "generate_dr_rule_detection";
/// Remote tool that generates the response component.
pub const RESPOND_TOOL: &str = "generate_dr_rule_respond";
/// Tools a server must advertise before conversion starts.
pub const REQUIRED_TOOLS: [&str; 2] = [DETECTION_TOOL, RESPOND_TOOL];
/// Top-level key of the detection section in merged documents.
pub const DETECT_KEY: &str = "detect";
/// Top-level key of the response section in merged documents.
pub const RESPOND_KEY: &str = "respond";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Per-file conversion failures.
///
/// # Invariants
/// - Messages are user-facing and end up verbatim in the run report.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The remote call failed.
    #[error(transparent)]
    Server(#[from] McpClientError),
    /// The tool reported an error in its result.
    #[error("MCP tool error: {0}")]
    Tool(String),
    /// A linked resource could not be downloaded.
    #[error("Failed to fetch resource from link: {0}")]
    ResourceFetch(String),
    /// The detection tool produced nothing usable.
    #[error("Detection tool returned no YAML content")]
    NoDetection,
    /// The response tool produced nothing usable.
    #[error("Response tool returned no YAML content")]
    NoResponse,
    /// A structured value could not be rendered as YAML.
    #[error("yaml rendering failed: {0}")]
    Yaml(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Both generated fragments for one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedRule {
    /// Detection fragment as YAML text.
    pub detection: String,
    /// Response fragment as YAML text.
    pub response: String,
}

impl ConvertedRule {
    /// Merges both fragments into one document.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Yaml`] when the merged document cannot be rendered.
    pub fn to_dr_rule_yaml(&self) -> Result<String, ConversionError> {
        merge_dr_rule(&self.detection, &self.response)
    }
}

/// Converts rules for one source platform through a tool invoker.
pub struct RuleConverter<T: ?Sized> {
    /// Remote tool backend.
    tools: Arc<T>,
    /// Source platform name embedded in every query.
    platform: String,
    /// Event sink for tool call events.
    events: Arc<dyn EventSink>,
}

impl<T: ToolInvoker + ?Sized> RuleConverter<T> {
    /// Creates a converter for `platform`.
    pub fn new(tools: Arc<T>, platform: impl Into<String>, events: Arc<dyn EventSink>) -> Self {
        Self {
            tools,
            platform: platform.into(),
            events,
        }
    }

    /// Returns the source platform name.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Converts one rule into detection and response fragments.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when either call fails or yields nothing.
    pub async fn convert(
        &self,
        rule_filename: &str,
        rule_text: &str,
    ) -> Result<ConvertedRule, ConversionError> {
        let query = detection_query(&self.platform, rule_filename, rule_text);
        let detection = self
            .generate(DETECTION_TOOL, query, rule_filename)
            .await?
            .ok_or(ConversionError::NoDetection)?;
        let query = respond_query(&self.platform, rule_filename, rule_text, &detection);
        let response = self
            .generate(RESPOND_TOOL, query, rule_filename)
            .await?
            .ok_or(ConversionError::NoResponse)?;
        Ok(ConvertedRule {
            detection,
            response,
        })
    }

    /// Calls one generation tool and unwraps its result.
    async fn generate(
        &self,
        tool: &str,
        query: String,
        rule_filename: &str,
    ) -> Result<Option<String>, ConversionError> {
        let started = Instant::now();
        let query_bytes = query.len();
        let (outcome, resource_bytes) =
            match self.tools.call_tool(tool, json!({ "query": query })).await {
                Ok(result) => {
                    let output = ToolOutput::classify(result);
                    let resource_bytes = output.resource_size();
                    (extract_output(output, self.tools.as_ref()).await, resource_bytes)
                }
                Err(err) => (Err(ConversionError::from(err)), None),
            };
        let outcome = outcome.map(|text| text.filter(|fragment| !fragment.trim().is_empty()));
        self.events.record_tool_call(&ToolCallEvent::new(ToolCallEventParams {
            tool: tool.to_string(),
            file: rule_filename.to_string(),
            query_bytes,
            resource_bytes,
            duration: started.elapsed(),
            error: outcome.as_ref().err().map(ToString::to_string),
        }));
        outcome
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Builds the detection-generation instruction.
#[must_use]
pub fn detection_query(platform: &str, rule_filename: &str, rule_text: &str) -> String {
    format!(
        "Convert this {platform} security detection rule to LimaCharlie D&R detection \
         format.\n\nRule name: {rule_filename}\nPlatform: {platform}\n\nOriginal \
         rule:\n{rule_text}\n\nGenerate the detection component in LimaCharlie D&R YAML format."
    )
}

/// Builds the response-generation instruction with the detection as context.
#[must_use]
pub fn respond_query(
    platform: &str,
    rule_filename: &str,
    rule_text: &str,
    detection: &str,
) -> String {
    format!(
        "Convert this {platform} security detection rule to LimaCharlie D&R response \
         format.\n\nRule name: {rule_filename}\nPlatform: {platform}\n\nOriginal \
         rule:\n{rule_text}\n\nDetection component:\n{detection}\n\nGenerate the response \
         component in LimaCharlie D&R YAML format."
    )
}

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges detection and response fragments into one block-style document.
///
/// Each fragment is parsed as YAML; a fragment that does not parse is kept as
/// a plain string.
///
/// # Errors
///
/// Returns [`ConversionError::Yaml`] when the merged document cannot be rendered.
pub fn merge_dr_rule(detection: &str, response: &str) -> Result<String, ConversionError> {
    let mut document = Mapping::new();
    document.insert(YamlValue::String(DETECT_KEY.to_string()), parse_fragment(detection));
    document.insert(YamlValue::String(RESPOND_KEY.to_string()), parse_fragment(response));
    serde_yaml::to_string(&YamlValue::Mapping(document))
        .map_err(|err| ConversionError::Yaml(err.to_string()))
}

/// Parses a fragment, falling back to its raw text.
fn parse_fragment(fragment: &str) -> YamlValue {
    serde_yaml::from_str(fragment).unwrap_or_else(|_| YamlValue::String(fragment.to_string()))
}

// ============================================================================
// SECTION: Tool Discovery
// ============================================================================

/// Returns the required tools missing from `tools`, in declaration order.
#[must_use]
pub fn missing_required_tools(tools: &[ToolDescriptor]) -> Vec<&'static str> {
    REQUIRED_TOOLS
        .into_iter()
        .filter(|required| !tools.iter().any(|tool| tool.name == *required))
        .collect()
}
