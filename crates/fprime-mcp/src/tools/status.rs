//! Service status tools

use async_trait::async_trait;
use fprime_landscape::Aggregator;
use serde_json::{json, Value};

use crate::registry::{CallContext, ToolHandler};
use crate::ToolError;

pub const SERVER_HEALTH: &str = "server_health";
pub const ADMIN_STATS: &str = "admin_stats";

pub struct ServerHealthTool {
    service_name: String,
    environment: String,
}

impl ServerHealthTool {
    pub fn new(service_name: String, environment: String) -> Self {
        Self {
            service_name,
            environment,
        }
    }
}

#[async_trait]
impl ToolHandler for ServerHealthTool {
    async fn call(&self, _ctx: &CallContext, _arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "name": self.service_name,
            "env": self.environment,
            "ok": true
        }))
    }
}

pub struct AdminStatsTool {
    tools: Vec<String>,
    aggregator: Aggregator,
}

impl AdminStatsTool {
    pub fn new(tools: Vec<String>, aggregator: Aggregator) -> Self {
        Self { tools, aggregator }
    }
}

#[async_trait]
impl ToolHandler for AdminStatsTool {
    async fn call(&self, _ctx: &CallContext, _arguments: Value) -> Result<Value, ToolError> {
        let cache = self.aggregator.cache_stats().await;
        Ok(json!({
            "tools": self.tools,
            "tool_count": self.tools.len(),
            "landscape_cache": cache,
            "source_precedence": self.aggregator.precedence(),
        }))
    }
}
