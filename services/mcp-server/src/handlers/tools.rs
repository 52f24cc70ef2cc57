//! Tool listing and invocation

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use fprime_types::{ToolCall, ToolInfo};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{Caller, CallerBearer};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ToolList {
    pub tools: Vec<ToolInfo>,
}

/// Tools the caller's policies allow
pub async fn list_tools(State(state): State<AppState>, Caller(token): Caller) -> Json<ToolList> {
    Json(ToolList {
        tools: state.registry.list(Some(&token)),
    })
}

/// Dispatch one invocation. Authentication happens inside the dispatcher,
/// after the tool lookup and argument validation.
pub async fn call_tool(
    State(state): State<AppState>,
    CallerBearer(bearer): CallerBearer,
    payload: Result<Json<ToolCall>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(call) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let result = state
        .registry
        .call(&call.name, bearer.as_deref(), call.arguments)
        .await?;
    Ok(Json(result))
}
