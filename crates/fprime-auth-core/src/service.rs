//! Auth service facade combining validation, the gate, login and sessions

use fprime_types::{AuthToken, AuthorizationPolicy};
use url::Url;

use crate::gate::authorize;
use crate::oidc::{LoginState, OidcClient};
use crate::session::{SessionStore, UserSession};
use crate::token::TokenValidator;
use crate::{AuthConfig, AuthError, InvalidTokenReason};

/// Result of a completed login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session_id: String,
    pub redirect_to: String,
    pub token: AuthToken,
}

/// Auth service: one per process, shared through application state
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    validator: TokenValidator,
    oidc: OidcClient,
    sessions: SessionStore,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let validator = TokenValidator::new(config.clone());
        let oidc = OidcClient::new(config.clone());
        let sessions = SessionStore::new(config.session_duration, config.login_state_ttl);
        Self {
            config,
            validator,
            oidc,
            sessions,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Validate a bearer token
    pub async fn validate(&self, raw: &str) -> Result<AuthToken, AuthError> {
        self.validator.validate(raw).await
    }

    /// Apply `policy` to a validated token
    pub fn authorize(
        &self,
        token: &AuthToken,
        policy: &AuthorizationPolicy,
    ) -> Result<(), AuthError> {
        let decision = authorize(token.capabilities(), policy);
        if decision.allowed() {
            Ok(())
        } else {
            tracing::debug!(
                subject = %token.claims().subject,
                policy = %policy,
                reason = %decision.reason(),
                "Authorization denied"
            );
            Err(AuthError::Forbidden(decision.reason()))
        }
    }

    /// Whether the token satisfies the default tool policy
    pub fn is_member(&self, token: &AuthToken) -> bool {
        authorize(token.capabilities(), &self.config.default_policy()).allowed()
    }

    /// Start a login: remember state and verifier, return the IdP redirect
    pub async fn begin_login(&self, redirect_to: Option<&str>) -> Result<Url, AuthError> {
        let login = LoginState::new(redirect_to);
        let url = self.oidc.authorization_url(&login)?;
        self.sessions.put_login_state(login).await;
        Ok(url)
    }

    /// Finish a login from the callback's `code` and `state`
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<LoginOutcome, AuthError> {
        let login = self
            .sessions
            .take_login_state(state)
            .await
            .ok_or(AuthError::InvalidState)?;

        let tokens = self.oidc.exchange_code(code, &login.pkce).await?;
        let token = self.validate(&tokens.access_token).await?;
        self.authorize(&token, &self.config.default_policy())?;

        let session = UserSession::from_tokens(&tokens, token.claims().expires_at);
        let session_id = self.sessions.create(session).await;
        tracing::info!(subject = %token.claims().subject, "User logged in");

        Ok(LoginOutcome {
            session_id,
            redirect_to: login.redirect_to.clone(),
            token,
        })
    }

    /// Resolve a session cookie to a valid token, refreshing once when the
    /// stored access token has expired. A failed refresh ends the session.
    pub async fn session_token(&self, session_id: &str) -> Result<AuthToken, AuthError> {
        let session = self
            .sessions
            .get(session_id)
            .await
            .ok_or(AuthError::Unauthenticated)?;

        if !session.token_expired() {
            match self.validate(&session.access_token).await {
                Err(AuthError::InvalidToken(InvalidTokenReason::ExpiredToken)) => {}
                other => return other,
            }
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            self.sessions.remove(session_id).await;
            return Err(AuthError::InvalidToken(InvalidTokenReason::ExpiredToken));
        };

        let refreshed = match self.oidc.refresh(refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Session refresh failed: {}", e);
                self.sessions.remove(session_id).await;
                return Err(AuthError::InvalidToken(InvalidTokenReason::ExpiredToken));
            }
        };

        let token = match self.validate(&refreshed.access_token).await {
            Ok(token) => token,
            Err(e) => {
                self.sessions.remove(session_id).await;
                return Err(e);
            }
        };

        self.sessions
            .replace(UserSession {
                id: session.id.clone(),
                access_token: refreshed.access_token,
                refresh_token: refreshed.refresh_token.or(session.refresh_token.clone()),
                token_expires_at: token.claims().expires_at,
                created_at: session.created_at,
            })
            .await;
        tracing::debug!(subject = %token.claims().subject, "Session token refreshed");
        Ok(token)
    }

    pub async fn logout(&self, session_id: &str) {
        self.sessions.remove(session_id).await;
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
