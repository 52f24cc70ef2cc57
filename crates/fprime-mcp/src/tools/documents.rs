//! Document tools with no backend yet

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::registry::{CallContext, ToolHandler};
use crate::ToolError;

pub const FILTER_DOCUMENTS: &str = "filter_documents";
pub const QUERY_DOCUMENT: &str = "query_document";

pub fn filter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": {"type": "string"},
            "qualifiers": {"type": "object"}
        }
    })
}

pub fn query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "document_id": {"type": "string", "minLength": 1},
            "question": {"type": "string", "minLength": 1},
            "qualifiers": {"type": "object"}
        },
        "required": ["document_id", "question"]
    })
}

/// Always answers `NotImplemented`
pub struct DocumentStub {
    message: &'static str,
}

impl DocumentStub {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

#[async_trait]
impl ToolHandler for DocumentStub {
    async fn call(&self, _ctx: &CallContext, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::NotImplemented(self.message.to_string()))
    }
}
