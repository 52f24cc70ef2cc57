//! Health and service descriptor handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;
use crate::SERVICE_NAME;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
    pub tools: usize,
    pub endpoints: &'static [&'static str],
}

/// Liveness probe - always returns OK if the service is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        tools: state.registry.len(),
        endpoints: &[
            "/health",
            "/auth/login",
            "/auth/callback",
            "/auth/user",
            "/auth/logout",
            "/mcp/tools",
            "/mcp/tools/call",
        ],
    })
}
