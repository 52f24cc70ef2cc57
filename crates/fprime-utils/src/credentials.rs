//! Credential resolution
//!
//! API keys and tokens are looked up by name. The direct store (normally the
//! process environment) wins; when a fallback store is configured, names the
//! direct store cannot answer are looked up in a secrets bundle instead. Any
//! backend (file, vault, cloud secret store) only has to implement
//! [`SecretStore::get`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Credential resolution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No store could provide the named credential
    #[error("missing credential: {0}")]
    Missing(String),

    /// A store failed to load
    #[error("secret store error: {0}")]
    Store(String),
}

/// A resolved secret value. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw value for use in a request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Something that can answer `get(name)`
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret; `Ok(None)` when this store does not have it
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialError>;
}

/// Process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

#[async_trait]
impl SecretStore for EnvSecrets {
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        Ok(crate::config::env_opt(name))
    }
}

/// Fixed in-memory secrets
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecrets {
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.values.get(name).filter(|v| !v.is_empty()).cloned())
    }
}

/// A JSON object bundle on disk, loaded on first use and kept for the
/// process lifetime.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    bundle: OnceCell<HashMap<String, String>>,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bundle: OnceCell::new(),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>, CredentialError> {
        tracing::debug!(path = %self.path.display(), "Loading secrets bundle");
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CredentialError::Store(format!("failed to read {}: {e}", self.path.display()))
        })?;
        parse_bundle(&raw)
    }
}

/// Parse a flat JSON object; string and number fields become secrets
fn parse_bundle(raw: &str) -> Result<HashMap<String, String>, CredentialError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CredentialError::Store(format!("bundle is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| CredentialError::Store("bundle must be a JSON object".to_string()))?;

    Ok(object
        .iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k.clone(), s.clone())),
            serde_json::Value::Number(n) => Some((k.clone(), n.to_string())),
            _ => None,
        })
        .collect())
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialError> {
        let bundle = self.bundle.get_or_try_init(|| self.load()).await?;
        Ok(bundle.get(name).filter(|v| !v.is_empty()).cloned())
    }
}

/// Field name inside the secrets bundle for a credential name
pub fn bundle_key(name: &str) -> String {
    match name {
        "AIRTABLE_API_KEY" => "airtable_api".to_string(),
        "GLOBALDATA_TOKEN" => "globaldata_token".to_string(),
        "AZURE_CLIENT_ID" => "entra_mcp_clientid".to_string(),
        "AZURE_CLIENT_SECRET" => "entra_mcp_clientsecret".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

/// Resolves credentials by name
#[derive(Clone)]
pub struct CredentialResolver {
    direct: Arc<dyn SecretStore>,
    fallback: Option<Arc<dyn SecretStore>>,
}

impl CredentialResolver {
    /// Resolver over a single direct store
    pub fn new(direct: Arc<dyn SecretStore>) -> Self {
        Self {
            direct,
            fallback: None,
        }
    }

    /// Environment-backed resolver, with the file bundle fallback when enabled
    pub fn from_env(use_secrets_store: bool, bundle_path: Option<PathBuf>) -> Self {
        let resolver = Self::new(Arc::new(EnvSecrets));
        match (use_secrets_store, bundle_path) {
            (true, Some(path)) => resolver.with_fallback(Arc::new(FileSecretStore::new(path))),
            (true, None) => {
                tracing::warn!("Secrets store fallback enabled but no bundle path configured");
                resolver
            }
            (false, _) => resolver,
        }
    }

    /// Add a fallback store consulted for names the direct store lacks
    #[must_use]
    pub fn with_fallback(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.fallback = Some(store);
        self
    }

    /// Resolve `name`, or fail with [`CredentialError::Missing`]
    pub async fn get(&self, name: &str) -> Result<Secret, CredentialError> {
        match self.direct.get(name).await {
            Ok(Some(value)) => return Ok(Secret(value)),
            Ok(None) => {}
            Err(e) => tracing::warn!(credential = name, error = %e, "Direct secret lookup failed"),
        }

        if let Some(fallback) = &self.fallback {
            let key = bundle_key(name);
            match fallback.get(&key).await {
                Ok(Some(value)) => return Ok(Secret(value)),
                Ok(None) => {
                    tracing::debug!(credential = name, bundle_key = %key, "Not present in secrets bundle");
                }
                Err(e) => {
                    tracing::warn!(credential = name, error = %e, "Secrets bundle lookup failed");
                }
            }
        }

        Err(CredentialError::Missing(name.to_string()))
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("fallback", &self.fallback.is_some())
            .finish_non_exhaustive()
    }
}
