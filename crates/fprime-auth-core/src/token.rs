//! JWT token validation with JWKS caching

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fprime_types::{AuthToken, PrincipalCapabilities, TokenClaims};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{AuthConfig, AuthError, InvalidTokenReason};

/// JWKS (JSON Web Key Set) structure
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JWK (JSON Web Key)
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub kty: String,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
}

impl Jwk {
    fn decoding_key(&self) -> Option<DecodingKey> {
        if self.kty != "RSA" {
            return None;
        }
        let (n, e) = (self.n.as_deref()?, self.e.as_deref()?);
        DecodingKey::from_rsa_components(n, e).ok()
    }
}

/// `aud` is a single string or an array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::One(aud) => vec![aud.clone()],
            Self::Many(auds) => auds.clone(),
        }
    }
}

/// Claims carried by an Entra ID v2 access token.
///
/// Registered claims are optional here so that an absent one is reported as
/// [`InvalidTokenReason::MissingClaim`] instead of a decode failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntraClaims {
    pub sub: Option<String>,
    /// Object id; preferred over `sub` as the stable subject
    pub oid: Option<String>,
    pub exp: Option<i64>,
    pub iss: Option<String>,
    pub aud: Option<Audience>,
    /// Omitted by the provider on group overage
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
    pub email: Option<String>,
}

impl EntraClaims {
    fn into_token_claims(self) -> Result<TokenClaims, InvalidTokenReason> {
        let exp = self.exp.ok_or(InvalidTokenReason::MissingClaim)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(exp, 0).ok_or(InvalidTokenReason::Malformed)?;
        let subject = self
            .oid
            .or(self.sub)
            .ok_or(InvalidTokenReason::MissingClaim)?;
        let roles: BTreeSet<String> = self.roles.into_iter().collect();
        let capabilities = match self.groups {
            Some(groups) => PrincipalCapabilities::new(groups, roles),
            None => PrincipalCapabilities::without_groups_claim(roles),
        };

        Ok(TokenClaims {
            subject,
            capabilities,
            expires_at,
            issuer: self.iss.unwrap_or_default(),
            audience: self.aud.map(|a| a.values()).unwrap_or_default(),
            display_name: self.name,
            email: self.email.or(self.preferred_username),
        })
    }
}

/// Turns a raw bearer string into a validated [`AuthToken`]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, raw: &str) -> Result<AuthToken, AuthError>;
}

/// Token validator with JWKS caching
///
/// Checks run in a fixed order and stop at the first failure: signature,
/// expiry, issuer, audience. Unknown key IDs trigger a JWKS refetch at most
/// once per `jwks_min_refetch_interval`.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
    http_client: reqwest::Client,
    /// Cache of kid -> DecodingKey
    key_cache: Cache<String, Arc<DecodingKey>>,
    /// Time of the last JWKS fetch; serializes refetches
    last_fetch: Arc<Mutex<Option<Instant>>>,
}

impl TokenValidator {
    /// Create a new token validator
    pub fn new(config: AuthConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(2)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(config, http_client)
    }

    /// Create a validator with custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: reqwest::Client) -> Self {
        let cache_duration = config.jwks_cache_duration;
        Self {
            config,
            http_client,
            key_cache: Cache::builder()
                .time_to_live(cache_duration)
                .max_capacity(100)
                .build(),
            last_fetch: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Validate a JWT and return the parsed token
    pub async fn validate(&self, token: &str) -> Result<AuthToken, AuthError> {
        let result = self.validate_inner(token).await;
        let label = match &result {
            Ok(_) => "valid",
            Err(AuthError::InvalidToken(reason)) => reason_label(*reason),
            Err(_) => "error",
        };
        metrics::counter!("auth_token_validations_total", "result" => label).increment(1);
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<AuthToken, AuthError> {
        let header = decode_header(token).map_err(|e| {
            tracing::debug!("Failed to decode token header: {}", e);
            AuthError::InvalidToken(InvalidTokenReason::Malformed)
        })?;

        if header.alg != Algorithm::RS256 {
            tracing::debug!("Unexpected token algorithm: {:?}", header.alg);
            return Err(AuthError::InvalidToken(InvalidTokenReason::BadSignature));
        }

        let kid = header.kid.ok_or_else(|| {
            tracing::debug!("Token missing kid");
            AuthError::InvalidToken(InvalidTokenReason::Malformed)
        })?;

        let decoding_key = self.get_key(&kid).await?;

        // Signature only; the remaining checks run below in a fixed order
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<EntraClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("Token signature verification failed: {}", e);
            let reason = match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    InvalidTokenReason::BadSignature
                }
                _ => InvalidTokenReason::Malformed,
            };
            AuthError::InvalidToken(reason)
        })?;

        let claims = token_data.claims;
        self.check_claims(&claims)?;

        let claims = claims.into_token_claims().map_err(AuthError::InvalidToken)?;
        Ok(AuthToken::new(token, claims))
    }

    fn check_claims(&self, claims: &EntraClaims) -> Result<(), AuthError> {
        let invalid = AuthError::InvalidToken;

        let exp = claims.exp.ok_or(invalid(InvalidTokenReason::MissingClaim))?;
        if Utc::now().timestamp() >= exp {
            tracing::debug!("Token expired at {}", exp);
            return Err(invalid(InvalidTokenReason::ExpiredToken));
        }

        let iss = claims
            .iss
            .as_deref()
            .ok_or(invalid(InvalidTokenReason::MissingClaim))?;
        if iss != self.config.issuer() {
            tracing::debug!(
                "Issuer mismatch: expected {}, got {}",
                self.config.issuer(),
                iss
            );
            return Err(invalid(InvalidTokenReason::WrongIssuer));
        }

        let aud = claims
            .aud
            .as_ref()
            .ok_or(invalid(InvalidTokenReason::MissingClaim))?
            .values();
        let audience_ok = aud.iter().any(|a| {
            self.config
                .audiences
                .iter()
                .any(|expected| bool::from(a.as_bytes().ct_eq(expected.as_bytes())))
        });
        if !audience_ok {
            tracing::debug!(
                "Audience mismatch: expected one of {:?}, got {:?}",
                self.config.audiences,
                aud
            );
            return Err(invalid(InvalidTokenReason::WrongAudience));
        }

        if claims.sub.is_none() && claims.oid.is_none() {
            return Err(invalid(InvalidTokenReason::MissingClaim));
        }

        Ok(())
    }

    /// Get a decoding key for the given kid, refetching the JWKS on a miss
    /// no more often than the configured minimum interval.
    async fn get_key(&self, kid: &str) -> Result<Arc<DecodingKey>, AuthError> {
        if let Some(key) = self.key_cache.get(kid).await {
            return Ok(key);
        }

        let mut last_fetch = self.last_fetch.lock().await;

        // Another caller may have refreshed while we waited
        if let Some(key) = self.key_cache.get(kid).await {
            return Ok(key);
        }

        if let Some(at) = *last_fetch {
            if at.elapsed() < self.config.jwks_min_refetch_interval {
                tracing::debug!("Unknown key ID '{}' and JWKS refetch throttled", kid);
                return Err(AuthError::InvalidToken(InvalidTokenReason::UnknownKey));
            }
        }

        let jwks = self.fetch_jwks().await?;
        *last_fetch = Some(Instant::now());

        let mut found = None;
        for jwk in &jwks.keys {
            if let Some(dk) = jwk.decoding_key() {
                let dk = Arc::new(dk);
                if jwk.kid == kid {
                    found = Some(Arc::clone(&dk));
                }
                self.key_cache.insert(jwk.kid.clone(), dk).await;
            }
        }

        found.ok_or_else(|| {
            tracing::debug!("Key not found in JWKS: {}", kid);
            AuthError::InvalidToken(InvalidTokenReason::UnknownKey)
        })
    }

    /// Fetch the identity provider's published key set
    async fn fetch_jwks(&self) -> Result<Jwks, AuthError> {
        let url = self.config.jwks_url();
        tracing::debug!("Fetching JWKS from {}", url);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            tracing::error!("Failed to fetch JWKS: {}", e);
            AuthError::IdentityProvider("failed to fetch signing keys".to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!("JWKS fetch returned status: {}", response.status());
            return Err(AuthError::IdentityProvider(
                "failed to fetch signing keys".to_string(),
            ));
        }

        response.json::<Jwks>().await.map_err(|e| {
            tracing::error!("Failed to parse JWKS: {}", e);
            AuthError::IdentityProvider("failed to parse signing keys".to_string())
        })
    }

    /// Drop all cached keys and the refetch throttle
    pub async fn invalidate_cache(&self) {
        self.key_cache.invalidate_all();
        *self.last_fetch.lock().await = None;
    }
}

fn reason_label(reason: InvalidTokenReason) -> &'static str {
    match reason {
        InvalidTokenReason::Malformed => "malformed",
        InvalidTokenReason::BadSignature => "bad_signature",
        InvalidTokenReason::UnknownKey => "unknown_key",
        InvalidTokenReason::ExpiredToken => "expired_token",
        InvalidTokenReason::WrongIssuer => "wrong_issuer",
        InvalidTokenReason::WrongAudience => "wrong_audience",
        InvalidTokenReason::MissingClaim => "missing_claim",
    }
}

#[async_trait]
impl Authenticator for TokenValidator {
    async fn authenticate(&self, raw: &str) -> Result<AuthToken, AuthError> {
        self.validate(raw).await
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
