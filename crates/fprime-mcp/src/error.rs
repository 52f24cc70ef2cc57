//! Dispatcher and tool errors

use fprime_auth_core::{AuthError, InvalidTokenReason};
use fprime_landscape::{AggregationError, ExportError};
use fprime_types::{DecisionReason, ErrorCategory, ErrorEnvelope, SourceReport};
use thiserror::Error;

use crate::proxy::ProxyError;

/// Errors surfaced by [`ToolRegistry`](crate::ToolRegistry)
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid token: {0}")]
    InvalidToken(InvalidTokenReason),

    #[error("forbidden: {0}")]
    Forbidden(DecisionReason),

    #[error("every landscape source failed")]
    AggregationFailed(Vec<SourceReport>),

    #[error("export failed: {0}")]
    ExportFailed(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable error kind
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "UNKNOWN_TOOL",
            Self::DuplicateTool(_) => "DUPLICATE_TOOL",
            Self::InvalidArguments(_) => "INVALID_ARGUMENTS",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::AggregationFailed(_) => "AGGREGATION_FAILED",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownTool(_) | Self::DuplicateTool(_) | Self::InvalidArguments(_) => {
                ErrorCategory::Caller
            }
            Self::Unauthenticated | Self::InvalidToken(_) | Self::Forbidden(_) => {
                ErrorCategory::Auth
            }
            Self::AggregationFailed(_)
            | Self::ExportFailed(_)
            | Self::Upstream(_)
            | Self::NotImplemented(_)
            | Self::Internal(_) => ErrorCategory::Upstream,
        }
    }

    /// HTTP status for the error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownTool(_) => 404,
            Self::DuplicateTool(_) => 409,
            Self::InvalidArguments(_) => 400,
            Self::Unauthenticated | Self::InvalidToken(_) => 401,
            Self::Forbidden(_) => 403,
            Self::AggregationFailed(_) | Self::Upstream(_) => 502,
            Self::NotImplemented(_) => 501,
            Self::ExportFailed(_) | Self::Internal(_) => 500,
        }
    }

    /// Normalized `{kind, message, category}` envelope
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.error_code(), self.to_string(), self.category())
    }

    /// Outcome label for metrics
    pub(crate) fn outcome(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Caller => "caller_error",
            ErrorCategory::Auth => "denied",
            ErrorCategory::Upstream => "upstream_error",
        }
    }
}

impl From<AuthError> for ToolError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(reason) => Self::InvalidToken(reason),
            AuthError::Forbidden(reason) => Self::Forbidden(reason),
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::IdentityProvider(message) => Self::Upstream(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AggregationError> for ToolError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::InvalidQuery(e) => Self::InvalidArguments(e.to_string()),
            AggregationError::AllSourcesFailed(reports) => Self::AggregationFailed(reports),
            AggregationError::Internal(message) => Self::Internal(message),
        }
    }
}

impl From<ExportError> for ToolError {
    fn from(err: ExportError) -> Self {
        Self::ExportFailed(err.to_string())
    }
}

impl From<ProxyError> for ToolError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::NotConfigured => Self::NotImplemented(err.to_string()),
            _ => Self::Upstream(err.to_string()),
        }
    }
}
