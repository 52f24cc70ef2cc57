//! Server-side session and pending-login stores
//!
//! Both stores live in process memory and expire entries by TTL; a restart
//! logs everyone out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use uuid::Uuid;

use crate::oidc::{LoginState, TokenResponse};

/// Session cookie name
pub const SESSION_COOKIE: &str = "fprime_session";

/// A logged-in browser session
#[derive(Clone)]
pub struct UserSession {
    pub id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry of the access token, not of the session
    pub token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    /// Build a session from a token endpoint response
    pub fn from_tokens(tokens: &TokenResponse, token_expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            token_expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn token_expired(&self) -> bool {
        Utc::now() >= self.token_expires_at
    }
}

impl std::fmt::Debug for UserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSession")
            .field("token_expires_at", &self.token_expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// TTL-bounded session and login-state tables
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<UserSession>>,
    login_states: Cache<String, Arc<LoginState>>,
}

impl SessionStore {
    pub fn new(session_ttl: Duration, login_state_ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_live(session_ttl)
                .max_capacity(10_000)
                .build(),
            login_states: Cache::builder()
                .time_to_live(login_state_ttl)
                .max_capacity(10_000)
                .build(),
        }
    }

    /// Insert a session and return its id
    pub async fn create(&self, session: UserSession) -> String {
        let id = session.id.clone();
        self.sessions.insert(id.clone(), Arc::new(session)).await;
        id
    }

    pub async fn get(&self, id: &str) -> Option<Arc<UserSession>> {
        self.sessions.get(id).await
    }

    /// Overwrite a session after a token refresh
    pub async fn replace(&self, session: UserSession) {
        self.sessions.insert(session.id.clone(), Arc::new(session)).await;
    }

    pub async fn remove(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }

    pub async fn put_login_state(&self, login: LoginState) {
        self.login_states
            .insert(login.state.clone(), Arc::new(login))
            .await;
    }

    /// Consume a pending login; a state value works at most once
    pub async fn take_login_state(&self, state: &str) -> Option<Arc<LoginState>> {
        self.login_states.remove(state).await
    }

    pub fn session_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenResponse {
        serde_json::from_value(serde_json::json!({"access_token": "at", "refresh_token": "rt"}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_roundtrip_and_remove() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let id = store
            .create(UserSession::from_tokens(&tokens(), Utc::now()))
            .await;

        let session = store.get(&id).await.unwrap();
        assert_eq!(session.access_token, "at");

        store.remove(&id).await;
        assert!(store.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_login_state_is_single_use() {
        let store = SessionStore::new(Duration::from_secs(60), Duration::from_secs(60));
        let login = LoginState::new(Some("/mcp/tools"));
        let state = login.state.clone();
        store.put_login_state(login).await;

        let taken = store.take_login_state(&state).await.unwrap();
        assert_eq!(taken.redirect_to, "/mcp/tools");
        assert!(store.take_login_state(&state).await.is_none());
    }

    #[test]
    fn test_session_debug_hides_tokens() {
        let tokens: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "secret-access", "refresh_token": "secret-refresh"
        }))
        .unwrap();
        let rendered = format!("{:?}", UserSession::from_tokens(&tokens, Utc::now()));
        assert!(!rendered.contains("secret-"));
    }
}
