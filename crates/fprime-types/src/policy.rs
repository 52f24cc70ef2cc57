//! Tool authorization policies and decisions

use serde::{Deserialize, Serialize};

/// Access policy attached to a tool descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AuthorizationPolicy {
    /// Any caller, authenticated or not
    Public,
    /// Caller must be a member of the group id
    RequireGroup(String),
    /// Caller must hold the application role
    RequireRole(String),
    /// Caller must satisfy at least one sub-policy
    RequireAny(Vec<AuthorizationPolicy>),
}

impl AuthorizationPolicy {
    /// Group policy
    pub fn group(id: impl Into<String>) -> Self {
        Self::RequireGroup(id.into())
    }

    /// Role policy
    pub fn role(name: impl Into<String>) -> Self {
        Self::RequireRole(name.into())
    }

    /// Whether this policy lets unauthenticated callers through
    pub fn is_public(&self) -> bool {
        match self {
            Self::Public => true,
            Self::RequireAny(policies) => policies.iter().any(Self::is_public),
            _ => false,
        }
    }
}

impl std::fmt::Display for AuthorizationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::RequireGroup(id) => write!(f, "group:{id}"),
            Self::RequireRole(name) => write!(f, "role:{name}"),
            Self::RequireAny(policies) => {
                write!(f, "any(")?;
                for (i, p) in policies.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Why an authorization decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Token valid and policy satisfied
    Valid,
    /// Token expiry is in the past
    ExpiredToken,
    /// Token signature could not be verified
    BadSignature,
    /// Token audience does not include this service
    WrongAudience,
    /// Token issuer is not the configured identity provider
    WrongIssuer,
    /// A claim the policy depends on was absent from the token
    MissingClaim,
    /// Claim present but the principal lacks the group/role
    NotMember,
}

impl DecisionReason {
    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::WrongAudience => "WRONG_AUDIENCE",
            Self::WrongIssuer => "WRONG_ISSUER",
            Self::MissingClaim => "MISSING_CLAIM",
            Self::NotMember => "NOT_MEMBER",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Valid => "valid",
            Self::ExpiredToken => "token expired",
            Self::BadSignature => "bad token signature",
            Self::WrongAudience => "wrong token audience",
            Self::WrongIssuer => "wrong token issuer",
            Self::MissingClaim => "required claim missing from token",
            Self::NotMember => "principal is not a member",
        };
        f.write_str(text)
    }
}

/// Allow/deny outcome of the authorization gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationDecision {
    allowed: bool,
    reason: DecisionReason,
}

impl AuthorizationDecision {
    /// An allowing decision
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Valid,
        }
    }

    /// A denying decision with its reason
    pub const fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }

    /// Whether the call may proceed
    pub const fn allowed(&self) -> bool {
        self.allowed
    }

    /// Why
    pub const fn reason(&self) -> DecisionReason {
        self.reason
    }
}
