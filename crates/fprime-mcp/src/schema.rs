//! Tool input schemas

use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::ToolError;

/// A compiled JSON Schema (draft 2020-12) for tool arguments
pub struct InputSchema {
    raw: Value,
    validator: Validator,
}

impl InputSchema {
    /// Compile `schema`; a schema that does not compile is a registration error
    pub fn compile(schema: Value) -> Result<Self, ToolError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&schema)
            .map_err(|err| ToolError::Internal(format!("invalid input schema: {err}")))?;
        Ok(Self {
            raw: schema,
            validator,
        })
    }

    /// The schema document, as published in the tool listing
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// Check `arguments`, collecting every violation
    pub fn validate(&self, arguments: &Value) -> Result<(), ToolError> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(ToolError::InvalidArguments(messages.join("; ")))
        }
    }
}

impl std::fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSchema").field("raw", &self.raw).finish()
    }
}

/// `{"type":"object","properties":{},"additionalProperties":false}`
pub fn no_arguments() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}
