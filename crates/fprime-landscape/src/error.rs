//! Landscape errors

use std::time::Duration;

use fprime_types::{QueryError, SourceErrorKind, SourceReport};
use thiserror::Error;

/// Failure of one source adapter. Recovered into the aggregated result,
/// never propagated past the aggregator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("authentication rejected: {0}")]
    Authentication(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl SourceError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            Self::Timeout(_) => SourceErrorKind::Timeout,
            Self::Authentication(_) => SourceErrorKind::Authentication,
            Self::MissingCredential(_) => SourceErrorKind::MissingCredential,
            Self::Upstream { .. } => SourceErrorKind::Upstream,
            Self::MalformedResponse(_) => SourceErrorKind::MalformedResponse,
            Self::Transport(_) => SourceErrorKind::Transport,
        }
    }

    /// Map an unsuccessful HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Authentication(message.into()),
            _ => Self::Upstream {
                status,
                message: message.into(),
            },
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status, .. } => *status == 429 || *status >= 500,
            Self::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Aggregation failures that reach the caller
#[derive(Error, Debug, Clone)]
pub enum AggregationError {
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// Every source failed; nothing to merge
    #[error("all sources failed")]
    AllSourcesFailed(Vec<SourceReport>),

    /// The background aggregation task died
    #[error("aggregation task failed: {0}")]
    Internal(String),
}

impl AggregationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "INVALID_ARGUMENTS",
            Self::AllSourcesFailed(_) => "AGGREGATION_FAILED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Spreadsheet rendering failure
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("result does not fit in a worksheet: {0}")]
    TooLarge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            SourceError::from_status(401, "nope").kind(),
            SourceErrorKind::Authentication
        );
        assert_eq!(
            SourceError::from_status(503, "down").kind(),
            SourceErrorKind::Upstream
        );
    }

    #[test]
    fn test_retryable() {
        assert!(SourceError::from_status(429, "").is_retryable());
        assert!(SourceError::from_status(502, "").is_retryable());
        assert!(SourceError::Transport("reset".into()).is_retryable());
        assert!(!SourceError::from_status(404, "").is_retryable());
        assert!(!SourceError::Authentication("bad key".into()).is_retryable());
        assert!(!SourceError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn test_timeout_display() {
        assert_eq!(
            SourceError::Timeout(Duration::from_millis(1500)).to_string(),
            "timed out after 1500ms"
        );
    }
}
