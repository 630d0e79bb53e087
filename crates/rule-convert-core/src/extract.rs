// crates/rule-convert-core/src/extract.rs
// ============================================================================
// Module: Result Unwrapping
// Description: Normalize arbitrarily-shaped tool results into YAML fragments.
// Purpose: Give the converter one text fragment per tool call.
// Dependencies: serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Rule-generation tools answer in several shapes: plain text, an object with
//! `structuredContent`, a link to an externally stored payload, a loose object
//! with one of several well-known fields, or an error. [`ToolOutput`] names
//! each shape; [`ToolOutput::classify`] decides the shape in a fixed priority
//! order and [`extract_yaml`] turns it into text, following links when needed.
//!
//! Security posture: tool results and linked bodies are untrusted. Linked
//! bodies are parsed best-effort and never executed or schema-checked.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::convert::ConversionError;
use crate::interfaces::ResourceFetcher;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fields that carry a rule fragment inside structured payloads.
pub const FRAGMENT_FIELDS: [&str; 2] = ["detection", "respond"];
/// Top-level fields scanned, in order, when no structured payload matched.
pub const FALLBACK_FIELDS: [&str; 7] =
    ["detection", "respond", "yaml", "content", "result", "data", "output"];
/// Key holding the structured payload of a tool result.
const STRUCTURED_CONTENT: &str = "structuredContent";
/// Key holding an externally stored payload location.
const RESOURCE_LINK: &str = "resource_link";
/// Key holding the externally stored payload size.
const RESOURCE_SIZE: &str = "resource_size";
/// Key holding the success flag that accompanies a resource link.
const SUCCESS: &str = "success";
/// Key holding an error payload.
const ERROR: &str = "error";

// ============================================================================
// SECTION: Types
// ============================================================================

/// A rule fragment found inside a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Already-rendered YAML text.
    Text(String),
    /// Structured value to render as YAML.
    Structured(Map<String, Value>),
}

impl Fragment {
    /// Builds a fragment from a value; only strings and objects qualify.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Object(map) => Some(Self::Structured(map.clone())),
            _ => None,
        }
    }

    /// Renders the fragment as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::Yaml`] when a structured value cannot be rendered.
    pub fn into_yaml(self) -> Result<String, ConversionError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Structured(map) => render_yaml(&Value::Object(map)),
        }
    }
}

/// Shapes a tool result can take, in decision order.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Result is plain text.
    Text(String),
    /// Result carries a top-level error.
    ToolError(String),
    /// Structured payload points at an externally stored body.
    StructuredLink {
        /// Download location.
        url: String,
        /// Advertised size in bytes, when reported.
        size: Option<u64>,
    },
    /// Structured payload carries a fragment field.
    StructuredFragment(Fragment),
    /// Structured payload carries an error.
    StructuredError(String),
    /// A well-known top-level field carries a fragment.
    Field(Fragment),
    /// No known field; the whole object is the fragment.
    Raw(Map<String, Value>),
    /// Nothing usable.
    Empty,
}

impl ToolOutput {
    /// Classifies a raw tool result. The first matching shape wins.
    #[must_use]
    pub fn classify(result: Value) -> Self {
        let map = match result {
            Value::String(text) => return Self::Text(text),
            Value::Object(map) => map,
            _ => return Self::Empty,
        };
        if let Some(error) = map.get(ERROR) {
            return Self::ToolError(error_text(error));
        }
        if let Some(Value::Object(structured)) = map.get(STRUCTURED_CONTENT)
            && let Some(shape) = classify_structured(structured)
        {
            return shape;
        }
        for field in FALLBACK_FIELDS {
            if let Some(fragment) = map.get(field).and_then(Fragment::from_value) {
                return Self::Field(fragment);
            }
        }
        if map.is_empty() { Self::Empty } else { Self::Raw(map) }
    }

    /// Advertised size of a linked payload, when the result is a link.
    #[must_use]
    pub const fn resource_size(&self) -> Option<u64> {
        match self {
            Self::StructuredLink {
                size, ..
            } => *size,
            _ => None,
        }
    }
}

/// Classifies the `structuredContent` object, if it matches any shape.
fn classify_structured(structured: &Map<String, Value>) -> Option<ToolOutput> {
    if let Some(link) = structured.get(RESOURCE_LINK)
        && structured.get(SUCCESS).is_some_and(is_truthy)
    {
        return Some(ToolOutput::StructuredLink {
            url: link.as_str().map_or_else(|| link.to_string(), str::to_string),
            size: structured.get(RESOURCE_SIZE).and_then(Value::as_u64),
        });
    }
    for field in FRAGMENT_FIELDS {
        if let Some(fragment) = structured.get(field).and_then(Fragment::from_value) {
            return Some(ToolOutput::StructuredFragment(fragment));
        }
    }
    structured.get(ERROR).map(|error| ToolOutput::StructuredError(error_text(error)))
}

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Extracts a YAML fragment from a tool result.
///
/// Returns `Ok(None)` when the result holds nothing usable.
///
/// # Errors
///
/// Returns [`ConversionError`] when the result reports an error, a linked
/// resource cannot be fetched, or a structured value cannot be rendered.
pub async fn extract_yaml<F>(result: Value, fetcher: &F) -> Result<Option<String>, ConversionError>
where
    F: ResourceFetcher + ?Sized,
{
    extract_output(ToolOutput::classify(result), fetcher).await
}

/// Extracts a YAML fragment from an already classified tool result.
///
/// # Errors
///
/// Same as [`extract_yaml`].
pub async fn extract_output<F>(
    output: ToolOutput,
    fetcher: &F,
) -> Result<Option<String>, ConversionError>
where
    F: ResourceFetcher + ?Sized,
{
    match output {
        ToolOutput::Text(text) => Ok(Some(text)),
        ToolOutput::ToolError(message) | ToolOutput::StructuredError(message) => {
            Err(ConversionError::Tool(message))
        }
        ToolOutput::StructuredLink {
            url, ..
        } => {
            let body = fetcher
                .fetch_resource(&url)
                .await
                .map_err(|err| ConversionError::ResourceFetch(err.to_string()))?;
            interpret_resource_body(&body).map(Some)
        }
        ToolOutput::StructuredFragment(fragment) | ToolOutput::Field(fragment) => {
            fragment.into_yaml().map(Some)
        }
        ToolOutput::Raw(map) => render_yaml(&Value::Object(map)).map(Some),
        ToolOutput::Empty => Ok(None),
    }
}

/// Interprets a downloaded resource body.
///
/// JSON objects yield their fragment field or are rendered whole; a JSON
/// string yields its contents; anything else is returned verbatim as YAML.
/// That includes valid JSON arrays, numbers, and booleans: they are not
/// re-scanned for structured or top-level fragment fields the way a tool
/// result is, so a body like `[1, 2]` comes back as the text `[1, 2]`.
///
/// # Errors
///
/// Returns [`ConversionError::Yaml`] when a structured value cannot be rendered.
pub fn interpret_resource_body(body: &str) -> Result<String, ConversionError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            for field in FRAGMENT_FIELDS {
                if let Some(fragment) = map.get(field).and_then(Fragment::from_value) {
                    return fragment.into_yaml();
                }
            }
            render_yaml(&Value::Object(map))
        }
        Ok(Value::String(text)) => Ok(text),
        Ok(_) | Err(_) => Ok(body.to_string()),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a JSON value as block-style YAML.
fn render_yaml(value: &Value) -> Result<String, ConversionError> {
    serde_yaml::to_string(value).map_err(|err| ConversionError::Yaml(err.to_string()))
}

/// Renders an error payload as a message.
fn error_text(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// JSON truthiness: false, null, zero, and empty strings or containers are false.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
