//! Tool invocation protocol types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound tool invocation: `{name, arguments}`.
///
/// The bearer token travels out of band (Authorization header or session).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Registered tool name
    #[serde(alias = "tool_name")]
    pub name: String,
    /// Tool arguments, validated against the tool's input schema
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Which side of the call is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or unknown request from the caller
    Caller,
    /// Authentication or authorization rejection
    Auth,
    /// Backend, data source, or internal failure
    Upstream,
}

/// Structured error `{kind, message, category}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Stable error code (e.g. `UNKNOWN_TOOL`, `FORBIDDEN`)
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    pub category: ErrorCategory,
}

impl ErrorEnvelope {
    /// Create a new envelope
    pub fn new(kind: impl Into<String>, message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            category,
        }
    }
}

/// Public view of a registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
