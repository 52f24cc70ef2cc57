//! `therapeutics_landscape`

use async_trait::async_trait;
use base64::Engine;
use fprime_landscape::{export_xlsx, Aggregator};
use fprime_types::TherapeuticsQuery;
use serde::Serialize;
use serde_json::{json, Value};

use crate::registry::{CallContext, ToolHandler};
use crate::ToolError;

pub const NAME: &str = "therapeutics_landscape";
pub const DESCRIPTION: &str = "Search Box document metadata, scraped company websites and the \
    GlobalData pipeline for companies working on a target, indication or molecule type. \
    Set export=true to attach the result as an Excel workbook.";

pub const EXPORT_FILE_NAME: &str = "therapeutics_landscape.xlsx";
const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub fn input_schema() -> Value {
    let criterion = json!({"type": ["string", "null"]});
    json!({
        "type": "object",
        "properties": {
            "target_gene": criterion,
            "indication": criterion,
            "molecule_type": criterion,
            "export": {"type": "boolean", "default": false}
        },
        "anyOf": [
            present("target_gene"),
            present("indication"),
            present("molecule_type")
        ],
        "additionalProperties": false
    })
}

/// Schema branch satisfied when `field` holds a non-blank string
fn present(field: &str) -> Value {
    json!({
        "required": [field],
        "properties": {
            field: {"type": "string", "pattern": "\\S"}
        }
    })
}

/// Attached spreadsheet
#[derive(Debug, Serialize)]
pub struct ExportAttachment {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub encoding: &'static str,
    pub data: String,
}

pub struct LandscapeTool {
    aggregator: Aggregator,
}

impl LandscapeTool {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl ToolHandler for LandscapeTool {
    async fn call(&self, ctx: &CallContext, arguments: Value) -> Result<Value, ToolError> {
        let query: TherapeuticsQuery = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        tracing::debug!(subject = ?ctx.subject(), export = query.export, "Landscape query");

        let result = self.aggregator.aggregate(&query).await?;
        let mut body =
            serde_json::to_value(result.as_ref()).map_err(|e| ToolError::Internal(e.to_string()))?;

        if query.export {
            let for_export = result.clone();
            let bytes = tokio::task::spawn_blocking(move || export_xlsx(&for_export))
                .await
                .map_err(|e| ToolError::Internal(e.to_string()))??;
            let attachment = ExportAttachment {
                file_name: EXPORT_FILE_NAME,
                content_type: XLSX_CONTENT_TYPE,
                encoding: "base64",
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            };
            if let Value::Object(map) = &mut body {
                map.insert(
                    "export".to_string(),
                    serde_json::to_value(attachment).map_err(|e| ToolError::Internal(e.to_string()))?,
                );
            }
        }
        Ok(body)
    }
}
