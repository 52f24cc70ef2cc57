//! Auth errors

use fprime_types::DecisionReason;
use serde::Serialize;
use thiserror::Error;

/// Why a bearer token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidTokenReason {
    /// Not a decodable JWT
    Malformed,
    /// Signature does not verify against the published key
    BadSignature,
    /// Key ID not in the identity provider's key set
    UnknownKey,
    /// `exp` is in the past
    ExpiredToken,
    /// `iss` is not the configured issuer
    WrongIssuer,
    /// `aud` does not contain a configured audience
    WrongAudience,
    /// A required claim (`exp`, `iss`, `aud`, `sub`) is absent
    MissingClaim,
}

impl InvalidTokenReason {
    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::UnknownKey => "UNKNOWN_KEY",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::WrongIssuer => "WRONG_ISSUER",
            Self::WrongAudience => "WRONG_AUDIENCE",
            Self::MissingClaim => "MISSING_CLAIM",
        }
    }
}

impl std::fmt::Display for InvalidTokenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Malformed => "malformed token",
            Self::BadSignature => "bad signature",
            Self::UnknownKey => "unknown signing key",
            Self::ExpiredToken => "token expired",
            Self::WrongIssuer => "wrong issuer",
            Self::WrongAudience => "wrong audience",
            Self::MissingClaim => "missing claim",
        };
        f.write_str(text)
    }
}

impl From<InvalidTokenReason> for DecisionReason {
    fn from(reason: InvalidTokenReason) -> Self {
        match reason {
            InvalidTokenReason::Malformed
            | InvalidTokenReason::BadSignature
            | InvalidTokenReason::UnknownKey => Self::BadSignature,
            InvalidTokenReason::ExpiredToken => Self::ExpiredToken,
            InvalidTokenReason::WrongIssuer => Self::WrongIssuer,
            InvalidTokenReason::WrongAudience => Self::WrongAudience,
            InvalidTokenReason::MissingClaim => Self::MissingClaim,
        }
    }
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Token rejected by the validator
    #[error("invalid token: {0}")]
    InvalidToken(InvalidTokenReason),

    /// Token valid but the authorization gate denied access
    #[error("forbidden: {0}")]
    Forbidden(DecisionReason),

    /// No token or session presented
    #[error("authentication required")]
    Unauthenticated,

    /// Unknown or expired login state (CSRF check failed)
    #[error("invalid or expired login state")]
    InvalidState,

    /// The identity provider rejected a request or was unreachable
    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken(_) | Self::Unauthenticated => 401,
            Self::Forbidden(_) => 403,
            Self::InvalidState => 400,
            Self::IdentityProvider(_) => 502,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidState => "INVALID_STATE",
            Self::IdentityProvider(_) => "IDENTITY_PROVIDER_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The token rejection reason, if this is a token error
    pub fn token_reason(&self) -> Option<InvalidTokenReason> {
        match self {
            Self::InvalidToken(reason) => Some(*reason),
            _ => None,
        }
    }
}
