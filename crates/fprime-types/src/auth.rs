//! Principal identity types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability set of an authenticated principal.
///
/// Independent of any identity-provider token shape: two sets of identifiers.
/// `groups` is `None` when the provider omitted the claim entirely (for
/// example the Entra ID groups overage case), which is not the same as an
/// empty membership list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalCapabilities {
    /// Group identifiers, or `None` when the groups claim was absent
    pub groups: Option<BTreeSet<String>>,
    /// Application role names
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl PrincipalCapabilities {
    /// Create a capability set with an explicit groups claim
    pub fn new<G, R>(groups: G, roles: R) -> Self
    where
        G: IntoIterator,
        G::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            groups: Some(groups.into_iter().map(Into::into).collect()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a capability set whose groups claim was omitted by the provider
    pub fn without_groups_claim<R>(roles: R) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            groups: None,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the groups claim was present in the token
    pub fn has_groups_claim(&self) -> bool {
        self.groups.is_some()
    }
}

/// Claims decoded from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Stable subject identifier (object id when the provider supplies one)
    pub subject: String,
    /// Group and role capabilities
    pub capabilities: PrincipalCapabilities,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
    /// Token issuer
    pub issuer: String,
    /// Token audiences
    pub audience: Vec<String>,
    /// Display name, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Email or UPN, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl TokenClaims {
    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Name suitable for logs and UI
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.subject)
    }
}

/// A parsed bearer token: the opaque string plus its decoded claims.
///
/// Immutable once constructed; scoped to a single call.
#[derive(Clone)]
pub struct AuthToken {
    raw: String,
    claims: TokenClaims,
}

impl AuthToken {
    /// Pair a raw bearer string with its validated claims
    pub fn new(raw: impl Into<String>, claims: TokenClaims) -> Self {
        Self {
            raw: raw.into(),
            claims,
        }
    }

    /// The opaque bearer string
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded claims
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Shortcut to the principal's capability set
    pub fn capabilities(&self) -> &PrincipalCapabilities {
        &self.claims.capabilities
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("subject", &self.claims.subject)
            .field("expires_at", &self.claims.expires_at)
            .finish_non_exhaustive()
    }
}
