//! OIDC authorization-code flow with PKCE

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use crate::{AuthConfig, AuthError};

/// PKCE verifier/challenge pair (S256)
#[derive(Clone, PartialEq, Eq)]
pub struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    /// Generate a fresh verifier (64 hex chars, within the 43..=128 limit)
    pub fn generate() -> Self {
        let verifier = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self::from_verifier(verifier)
    }

    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

impl std::fmt::Debug for Pkce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkce")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

/// A login in progress, keyed by `state`
#[derive(Debug, Clone)]
pub struct LoginState {
    pub state: String,
    pub nonce: String,
    pub pkce: Pkce,
    /// Local path to return to after login
    pub redirect_to: String,
}

impl LoginState {
    pub fn new(redirect_to: Option<&str>) -> Self {
        Self {
            state: Uuid::new_v4().simple().to_string(),
            nonce: Uuid::new_v4().simple().to_string(),
            pkce: Pkce::generate(),
            redirect_to: safe_redirect(redirect_to),
        }
    }
}

/// Only same-origin absolute paths are accepted as post-login targets
pub fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => {
            t.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Token endpoint response
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Talks to the identity provider's authorize and token endpoints
#[derive(Clone)]
pub struct OidcClient {
    config: AuthConfig,
    http_client: reqwest::Client,
}

impl OidcClient {
    pub fn new(config: AuthConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(config, http_client)
    }

    pub fn with_client(config: AuthConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Browser redirect target for `login`
    pub fn authorization_url(&self, login: &LoginState) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.config.authorization_endpoint()).map_err(|e| {
            AuthError::Configuration(format!("invalid authorization endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", &self.config.scopes())
            .append_pair("state", &login.state)
            .append_pair("nonce", &login.nonce)
            .append_pair("code_challenge", login.pkce.challenge())
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce: &Pkce,
    ) -> Result<TokenResponse, AuthError> {
        let scopes = self.config.scopes();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", pkce.verifier()),
            ("scope", scopes.as_str()),
        ];
        self.token_request(&form).await
    }

    /// Redeem a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let scopes = self.config.scopes();
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", scopes.as_str()),
        ];
        self.token_request(&form).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http_client
            .post(self.config.token_endpoint())
            .form(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Token endpoint request failed: {}", e);
                AuthError::IdentityProvider("token endpoint unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<TokenErrorResponse>().await {
                Ok(body) => body.error_description.unwrap_or(body.error),
                Err(_) => status.to_string(),
            };
            tracing::warn!(status = %status, "Token endpoint rejected request: {}", detail);
            return Err(AuthError::IdentityProvider(detail));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            tracing::error!("Failed to parse token response: {}", e);
            AuthError::IdentityProvider("malformed token response".to_string())
        })
    }
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_pkce_rfc7636_vector() {
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(pkce.challenge(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generated_verifier_length() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier().len(), 64);
        assert_ne!(pkce.verifier(), Pkce::generate().verifier());
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/mcp/tools")), "/mcp/tools");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(None), "/");
    }

    #[test]
    fn test_authorization_url_params() {
        let client = OidcClient::new(AuthConfig::new("tenant", "client", "secret", "group"));
        let login = LoginState::new(None);
        let url = client.authorization_url(&login).unwrap();

        assert!(url
            .as_str()
            .starts_with("https://login.microsoftonline.com/tenant/oauth2/v2.0/authorize?"));
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["state"], login.state);
        assert_eq!(
            pairs["scope"],
            "openid profile email offline_access api://client/access"
        );
    }

    #[tokio::test]
    async fn test_exchange_code_posts_verifier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at", "refresh_token": "rt", "expires_in": 3600, "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config =
            AuthConfig::new("tenant", "client", "secret", "group").with_authority(server.uri());
        let client = OidcClient::new(config);
        let tokens = client
            .exchange_code("code-1", &Pkce::from_verifier("abc"))
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn test_token_endpoint_error_is_identity_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant", "error_description": "code expired"
            })))
            .mount(&server)
            .await;

        let config =
            AuthConfig::new("tenant", "client", "secret", "group").with_authority(server.uri());
        let err = OidcClient::new(config).refresh("rt").await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityProvider(ref d) if d == "code expired"));
    }
}
