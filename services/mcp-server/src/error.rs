//! Error types for the MCP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fprime_auth_core::AuthError;
use fprime_mcp::ToolError;
use fprime_types::{ErrorCategory, ErrorEnvelope};
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorEnvelope,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::Tool(e) => e.status_code(),
            Self::Auth(e) => e.status_code(),
            Self::BadRequest(_) => 400,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn envelope(&self) -> ErrorEnvelope {
        match self {
            Self::Tool(e) => e.envelope(),
            Self::Auth(e) => ErrorEnvelope::new(e.error_code(), e.to_string(), auth_category(e)),
            Self::BadRequest(message) => {
                ErrorEnvelope::new("BAD_REQUEST", message.clone(), ErrorCategory::Caller)
            }
        }
    }
}

fn auth_category(err: &AuthError) -> ErrorCategory {
    match err {
        AuthError::InvalidToken(_) | AuthError::Forbidden(_) | AuthError::Unauthenticated => {
            ErrorCategory::Auth
        }
        AuthError::InvalidState => ErrorCategory::Caller,
        AuthError::IdentityProvider(_) | AuthError::Configuration(_) | AuthError::Internal(_) => {
            ErrorCategory::Upstream
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server-side failures
        if status.is_server_error() {
            tracing::error!(error = %self, "API error");
        }

        let body = ErrorResponse {
            error: self.envelope(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
