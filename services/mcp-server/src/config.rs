//! Configuration for the MCP server.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fprime_auth_core::{AuthConfig, AuthError, DEFAULT_AUTHORITY};
use fprime_landscape::{AirtableTable, CacheConfig, LandscapeConfig, DEFAULT_AIRTABLE_API_URL};
use fprime_types::SourceName;
use fprime_utils::config::{env_opt, env_parse, parse_flag, split_list};
use url::Url;

/// Identity provider settings. The client secret is resolved separately
/// because it may live in the secrets bundle.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub authority: String,
    pub redirect_uri: String,
    /// Explicit accepted audiences; `None` keeps the client-id defaults
    pub audiences: Option<Vec<String>>,
    pub jwks_cache: Duration,
    pub session_duration: Duration,
    pub required_group: String,
    pub app_role: Option<String>,
}

impl IdentityConfig {
    /// Build the auth layer config once the client secret is known
    pub fn auth_config(&self, client_secret: &str) -> Result<AuthConfig, AuthError> {
        let mut config = AuthConfig::try_new(
            &self.tenant_id,
            &self.client_id,
            client_secret,
            &self.required_group,
        )?
        .with_authority(self.authority.clone())
        .with_redirect_uri(self.redirect_uri.clone())
        .with_jwks_cache_duration(self.jwks_cache)
        .with_session_duration(self.session_duration);

        if let Some(audiences) = &self.audiences {
            config = config.with_audiences(audiences.clone());
        }
        if let Some(role) = &self.app_role {
            config = config.with_required_role(role.clone());
        }
        Ok(config)
    }
}

/// MCP server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// Whole-request timeout, health and metrics excluded
    pub request_timeout: Duration,
    /// `production` marks session cookies `Secure`
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub metrics_enabled: bool,
    pub identity: IdentityConfig,
    /// Role required by admin-only tools
    pub admin_role: String,
    pub proxy_url: Option<Url>,
    pub proxy_token: Option<String>,
    /// Default per-source and proxy timeout
    pub http_timeout: Duration,
    pub landscape: LandscapeConfig,
    pub use_secrets_store: bool,
    pub secrets_bundle_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Identity provider
        let tenant_id = required("AZURE_TENANT_ID")?;
        let client_id = required("AZURE_CLIENT_ID")?;
        let required_group = required("FPRIME_GROUP_ID")?;
        let audiences = env_opt("OIDC_AUDIENCES").map(|raw| split_list(&raw));
        let identity = IdentityConfig {
            tenant_id,
            client_id,
            authority: env_opt("OIDC_AUTHORITY").unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            redirect_uri: env_opt("OIDC_REDIRECT_URI")
                .unwrap_or_else(|| "http://localhost:8000/auth/callback".to_string()),
            audiences,
            jwks_cache: secs("JWKS_CACHE_SECS", 24 * 60 * 60)?,
            session_duration: Duration::from_secs(
                env_parse::<u64>("SESSION_EXPIRE_MINUTES", 60).map_err(ConfigError::Invalid)? * 60,
            ),
            required_group,
            app_role: env_opt("FPRIME_APP_ROLE"),
        };

        // Proxy backend
        let proxy_url = env_opt("VC_PROXY_API_URL")
            .map(|raw| Url::parse(raw.trim()).map_err(|_| ConfigError::Invalid("VC_PROXY_API_URL")))
            .transpose()?;

        // Sources
        let http_timeout = secs("HTTP_TIMEOUT_SECS", 30)?;
        let landscape = LandscapeConfig {
            airtable_api_url: env_opt("AIRTABLE_API_URL")
                .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
            box_metadata: table("BOX_BASE_ID", "BOX_TABLE_ID")
                .with_timeout(secs_or("BOX_TIMEOUT_SECS", http_timeout)?),
            website: table("WEBSITE_BASE_ID", "WEBSITE_TABLE_ID")
                .with_timeout(secs_or("WEBSITE_TIMEOUT_SECS", http_timeout)?),
            globaldata_endpoint: env_opt("GLOBALDATA_ENDPOINT").unwrap_or_default(),
            globaldata_timeout: secs_or("GLOBALDATA_TIMEOUT_SECS", http_timeout)?,
            ..LandscapeConfig::default()
        }
        .with_precedence(&precedence()?)
        .with_cache(
            CacheConfig::new()
                .with_ttl(secs("LANDSCAPE_CACHE_TTL_SECS", 600)?)
                .with_max_entries(
                    env_parse("LANDSCAPE_CACHE_MAX_ENTRIES", 8).map_err(ConfigError::Invalid)?,
                ),
        );

        Ok(Self {
            http_port: env_parse("HTTP_PORT", 8000).map_err(ConfigError::Invalid)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", 120)?,
            environment: env_opt("SERVER_ENV").unwrap_or_else(|| "development".to_string()),
            cors_origins: env_opt("CORS_ORIGINS")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            metrics_enabled: flag("METRICS_ENABLED", true)?,
            identity,
            admin_role: env_opt("FPRIME_ADMIN_ROLE").unwrap_or_else(|| "FPrime.Admin".to_string()),
            proxy_url,
            proxy_token: env_opt("VC_PROXY_AUTH_TOKEN"),
            http_timeout,
            landscape,
            use_secrets_store: flag("USE_SECRETS_STORE", false)?,
            secrets_bundle_path: env_opt("SECRETS_BUNDLE_PATH").map(PathBuf::from),
        })
    }

    /// Session cookies carry `Secure` in production
    pub fn secure_cookies(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env_opt(name).ok_or(ConfigError::Missing(name))
}

fn secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    env_parse(name, default)
        .map(Duration::from_secs)
        .map_err(ConfigError::Invalid)
}

fn secs_or(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    secs(name, default.as_secs())
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env_opt(name) {
        Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

fn table(base: &str, table: &str) -> AirtableTable {
    AirtableTable::new(
        env_opt(base).unwrap_or_default(),
        env_opt(table).unwrap_or_default(),
    )
}

fn precedence() -> Result<Vec<SourceName>, ConfigError> {
    match env_opt("LANDSCAPE_SOURCE_PRECEDENCE") {
        Some(raw) => parse_precedence(&raw),
        None => Ok(SourceName::ALL.to_vec()),
    }
}

fn parse_precedence(raw: &str) -> Result<Vec<SourceName>, ConfigError> {
    split_list(raw)
        .iter()
        .map(|name| {
            SourceName::from_str(name).map_err(|_| ConfigError::Invalid("LANDSCAPE_SOURCE_PRECEDENCE"))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> IdentityConfig {
        IdentityConfig {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            authority: DEFAULT_AUTHORITY.into(),
            redirect_uri: "http://localhost:8000/auth/callback".into(),
            audiences: None,
            jwks_cache: Duration::from_secs(60),
            session_duration: Duration::from_secs(3600),
            required_group: "group".into(),
            app_role: None,
        }
    }

    #[test]
    fn test_parse_precedence() {
        assert_eq!(
            parse_precedence("globaldata, website").unwrap(),
            vec![SourceName::GlobalData, SourceName::Website]
        );
        assert!(matches!(
            parse_precedence("box_metadata,nope"),
            Err(ConfigError::Invalid("LANDSCAPE_SOURCE_PRECEDENCE"))
        ));
    }

    #[test]
    fn test_auth_config_keeps_default_audiences() {
        let config = identity().auth_config("secret").unwrap();
        assert_eq!(config.audiences, vec!["client".to_string(), "api://client".to_string()]);
        assert!(config.required_role.is_none());
    }

    #[test]
    fn test_app_role_widens_default_policy() {
        let identity = IdentityConfig {
            app_role: Some("FPrime.User".into()),
            audiences: Some(vec!["custom".into()]),
            ..identity()
        };
        let config = identity.auth_config("secret").unwrap();
        assert_eq!(config.audiences, vec!["custom".to_string()]);
        assert_eq!(config.required_role.as_deref(), Some("FPrime.User"));
    }

    #[test]
    fn test_blank_secret_rejected() {
        assert!(identity().auth_config("  ").is_err());
    }
}
