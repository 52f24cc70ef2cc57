//! Application state

use std::sync::Arc;

use fprime_auth_core::{AuthService, Authenticator};
use fprime_mcp::ToolRegistry;

use crate::config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Login flow, sessions and token validation
    pub auth: Arc<AuthService>,
    /// Validates bearer headers; the service's own validator in production
    pub authenticator: Arc<dyn Authenticator>,
    /// Tool catalog and dispatcher
    pub registry: Arc<ToolRegistry>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        auth: Arc<AuthService>,
        authenticator: Arc<dyn Authenticator>,
        registry: ToolRegistry,
        config: Config,
    ) -> Self {
        Self {
            auth,
            authenticator,
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .field("tools", &self.registry.names())
            .finish_non_exhaustive()
    }
}
