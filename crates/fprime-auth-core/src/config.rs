//! Configuration types for the auth layer

use std::time::Duration;

use fprime_types::AuthorizationPolicy;

use crate::AuthError;

/// Default identity provider authority (Microsoft Entra ID)
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Auth configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Entra tenant ID
    pub tenant_id: String,
    /// Application (client) ID
    pub client_id: String,
    /// Client secret used for the code exchange
    pub client_secret: String,
    /// Authority base URL, without tenant
    pub authority: String,
    /// Accepted `aud` values
    pub audiences: Vec<String>,
    /// Security group whose members may use the tools
    pub required_group: String,
    /// Optional app role that also grants access
    pub required_role: Option<String>,
    /// Where the IdP sends the browser back to
    pub redirect_uri: String,
    /// Session lifetime
    pub session_duration: Duration,
    /// How long a pending login (state + PKCE verifier) stays valid
    pub login_state_ttl: Duration,
    /// JWKS cache duration
    pub jwks_cache_duration: Duration,
    /// Minimum spacing between JWKS refetches triggered by unknown key IDs
    pub jwks_min_refetch_interval: Duration,
    /// Override for the JWKS URL (tests, sovereign clouds)
    pub jwks_url_override: Option<String>,
}

impl AuthConfig {
    /// Create a new auth config with Entra defaults
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        required_group: impl Into<String>,
    ) -> Self {
        let client_id = client_id.into();
        Self {
            tenant_id: tenant_id.into(),
            audiences: vec![client_id.clone(), format!("api://{client_id}")],
            client_id,
            client_secret: client_secret.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            required_group: required_group.into(),
            required_role: None,
            redirect_uri: "http://localhost:8000/auth/callback".to_string(),
            session_duration: Duration::from_secs(60 * 60), // 1 hour
            login_state_ttl: Duration::from_secs(10 * 60),
            jwks_cache_duration: Duration::from_secs(24 * 60 * 60),
            jwks_min_refetch_interval: Duration::from_secs(60),
            jwks_url_override: None,
        }
    }

    /// Create a config, rejecting empty identifiers
    pub fn try_new(
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        required_group: &str,
    ) -> Result<Self, AuthError> {
        for (name, value) in [
            ("tenant_id", tenant_id),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("required_group", required_group),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::Configuration(format!("{name} must not be empty")));
            }
        }
        Ok(Self::new(tenant_id, client_id, client_secret, required_group))
    }

    fn tenant_base(&self) -> String {
        format!("{}/{}", self.authority.trim_end_matches('/'), self.tenant_id)
    }

    /// Expected `iss` claim
    pub fn issuer(&self) -> String {
        format!("{}/v2.0", self.tenant_base())
    }

    /// Get the JWKS URL
    pub fn jwks_url(&self) -> String {
        self.jwks_url_override
            .clone()
            .unwrap_or_else(|| format!("{}/discovery/v2.0/keys", self.tenant_base()))
    }

    /// OAuth2 authorization endpoint
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/authorize", self.tenant_base())
    }

    /// OAuth2 token endpoint
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.tenant_base())
    }

    /// Scopes requested at login
    pub fn scopes(&self) -> String {
        format!("openid profile email offline_access api://{}/access", self.client_id)
    }

    /// Policy applied to every tool that does not declare its own:
    /// the required group, or the group or the app role when one is configured
    pub fn default_policy(&self) -> AuthorizationPolicy {
        let group = AuthorizationPolicy::group(self.required_group.clone());
        match &self.required_role {
            Some(role) => {
                AuthorizationPolicy::RequireAny(vec![group, AuthorizationPolicy::role(role.clone())])
            }
            None => group,
        }
    }

    /// Set the authority base URL
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Set the optional app role
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_role = Some(role.into());
        self
    }

    /// Set accepted audiences
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }

    /// Set redirect URI
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Set session duration
    pub fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set JWKS cache duration
    pub fn with_jwks_cache_duration(mut self, duration: Duration) -> Self {
        self.jwks_cache_duration = duration;
        self
    }

    /// Set minimum interval between kid-miss refetches
    pub fn with_jwks_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.jwks_min_refetch_interval = interval;
        self
    }

    /// Point JWKS fetching at a specific URL
    pub fn with_jwks_url_override(mut self, url: impl Into<String>) -> Self {
        self.jwks_url_override = Some(url.into());
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority", &self.authority)
            .field("audiences", &self.audiences)
            .field("required_group", &self.required_group)
            .field("required_role", &self.required_role)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig::new("tenant-1", "client-1", "secret", "group-1")
    }

    #[test]
    fn test_entra_urls() {
        let config = config();
        assert_eq!(
            config.issuer(),
            "https://login.microsoftonline.com/tenant-1/v2.0"
        );
        assert_eq!(
            config.jwks_url(),
            "https://login.microsoftonline.com/tenant-1/discovery/v2.0/keys"
        );
        assert_eq!(
            config.token_endpoint(),
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(config.audiences, vec!["client-1", "api://client-1"]);
    }

    #[test]
    fn test_authority_override_trims_slash() {
        let config = config().with_authority("http://127.0.0.1:9999/");
        assert_eq!(config.issuer(), "http://127.0.0.1:9999/tenant-1/v2.0");
    }

    #[test]
    fn test_default_policy_with_and_without_role() {
        assert_eq!(config().default_policy(), AuthorizationPolicy::group("group-1"));
        assert_eq!(
            config().with_required_role("FPrime.Member").default_policy(),
            AuthorizationPolicy::RequireAny(vec![
                AuthorizationPolicy::group("group-1"),
                AuthorizationPolicy::role("FPrime.Member"),
            ])
        );
    }

    #[test]
    fn test_try_new_rejects_empty() {
        assert!(AuthConfig::try_new("t", "c", "", "g").is_err());
        assert!(AuthConfig::try_new("t", "c", "s", "g").is_ok());
    }

    #[test]
    fn test_debug_omits_secret() {
        let rendered = format!("{:?}", AuthConfig::new("t", "c", "super-secret", "g"));
        assert!(!rendered.contains("super-secret"));
    }
}
