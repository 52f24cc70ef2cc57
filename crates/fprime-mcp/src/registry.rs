//! Tool registry and dispatcher

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fprime_auth_core::{authorize, Authenticator};
use fprime_types::{AuthToken, AuthorizationPolicy, ToolInfo};
use serde_json::Value;
use tracing::instrument;

use crate::schema::InputSchema;
use crate::ToolError;

/// Per-call context handed to a handler
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Validated caller token; `None` for public tools
    pub token: Option<AuthToken>,
}

impl CallContext {
    pub fn new(token: Option<AuthToken>) -> Self {
        Self { token }
    }

    /// Raw bearer string, for forwarding to backends
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_ref().map(AuthToken::raw)
    }

    pub fn subject(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.claims().subject.as_str())
    }
}

/// Tool implementation
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, ctx: &CallContext, arguments: Value) -> Result<Value, ToolError>;
}

/// A registered tool
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Arc<InputSchema>,
    pub policy: AuthorizationPolicy,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        policy: AuthorizationPolicy,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, ToolError> {
        Ok(Self {
            name: name.into(),
            description: description.into(),
            input_schema: Arc::new(InputSchema::compile(input_schema)?),
            policy,
            handler,
        })
    }

    /// Public listing entry
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.as_value().clone(),
        }
    }

    fn visible_to(&self, caller: Option<&AuthToken>) -> bool {
        if self.policy.is_public() {
            return true;
        }
        caller.is_some_and(|token| authorize(token.capabilities(), &self.policy).allowed())
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Owns every tool descriptor for the process lifetime
#[derive(Clone)]
pub struct ToolRegistry {
    authenticator: Arc<dyn Authenticator>,
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            tools: BTreeMap::new(),
        }
    }

    /// Add a tool; names are unique
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), ToolError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(ToolError::DuplicateTool(descriptor.name));
        }
        tracing::debug!(tool = %descriptor.name, policy = %descriptor.policy, "Registered tool");
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Tools the caller may invoke, sorted by name. Tools the caller's
    /// policy denies are left out.
    pub fn list(&self, caller: Option<&AuthToken>) -> Vec<ToolInfo> {
        self.tools
            .values()
            .filter(|d| d.visible_to(caller))
            .map(ToolDescriptor::info)
            .collect()
    }

    /// Dispatch one call: lookup, argument validation, authentication and
    /// authorization, then a single handler invocation. Nothing past the
    /// failing step runs.
    #[instrument(skip(self, bearer, arguments), fields(tool = %name))]
    pub async fn call(
        &self,
        name: &str,
        bearer: Option<&str>,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let started = Instant::now();
        let result = self.dispatch(name, bearer, arguments).await;

        let label = if self.tools.contains_key(name) {
            name.to_string()
        } else {
            "unknown".to_string()
        };
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::counter!("mcp_tool_calls_total", "tool" => label.clone(), "outcome" => outcome)
            .increment(1);
        metrics::histogram!("mcp_tool_call_duration_seconds", "tool" => label)
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(_) => tracing::info!(outcome, "Tool call completed"),
            Err(e) if e.category() == fprime_types::ErrorCategory::Upstream => {
                tracing::error!(error = %e, "Tool call failed")
            }
            Err(e) => tracing::debug!(error = %e, "Tool call rejected"),
        }
        result
    }

    async fn dispatch(
        &self,
        name: &str,
        bearer: Option<&str>,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let descriptor = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        descriptor.input_schema.validate(&arguments)?;

        let token = if descriptor.policy.is_public() {
            None
        } else {
            let raw = bearer
                .map(str::trim)
                .filter(|b| !b.is_empty())
                .ok_or(ToolError::Unauthenticated)?;
            let token = self.authenticator.authenticate(raw).await?;
            let decision = authorize(token.capabilities(), &descriptor.policy);
            if !decision.allowed() {
                return Err(ToolError::Forbidden(decision.reason()));
            }
            Some(token)
        };

        let ctx = CallContext::new(token);
        descriptor.handler.call(&ctx, arguments).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish_non_exhaustive()
    }
}
