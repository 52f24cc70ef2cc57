//! Shared fixtures for dispatcher tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fprime_auth_core::{AuthError, Authenticator, InvalidTokenReason};
use fprime_landscape::{
    Aggregator, CacheConfig, QueryCache, SourceAdapter, SourceError,
};
use fprime_mcp::{CallContext, ToolError, ToolHandler};
use fprime_types::{
    AuthToken, PrincipalCapabilities, RawRecord, SourceName, TherapeuticsQuery, TokenClaims,
};
use serde_json::Value;

pub const GROUP: &str = "fprime-group-id";
pub const ADMIN_ROLE: &str = "FPrime.Admin";

/// Bearer strings understood by [`StubAuthenticator`]
pub const MEMBER: &str = "member-token";
pub const OUTSIDER: &str = "outsider-token";
pub const OVERAGE: &str = "overage-token";
pub const ADMIN: &str = "admin-token";
pub const EXPIRED: &str = "expired-token";

pub fn token(raw: &str, capabilities: PrincipalCapabilities) -> AuthToken {
    AuthToken::new(
        raw,
        TokenClaims {
            subject: format!("{raw}-subject"),
            capabilities,
            expires_at: Utc::now() + chrono::Duration::hours(1),
            issuer: "https://login.example.com/test-tenant/v2.0".into(),
            audience: vec!["test-client-id".into()],
            display_name: None,
            email: None,
        },
    )
}

/// Maps fixed bearer strings to principals and counts validations
pub struct StubAuthenticator {
    tokens: HashMap<String, AuthToken>,
    calls: AtomicUsize,
}

impl StubAuthenticator {
    pub fn new() -> Self {
        let mut tokens = HashMap::new();
        for (raw, caps) in [
            (MEMBER, PrincipalCapabilities::new([GROUP], Vec::<String>::new())),
            (OUTSIDER, PrincipalCapabilities::new(["other-group"], Vec::<String>::new())),
            (OVERAGE, PrincipalCapabilities::without_groups_claim(Vec::<String>::new())),
            (ADMIN, PrincipalCapabilities::new([GROUP], [ADMIN_ROLE])),
        ] {
            tokens.insert(raw.to_string(), token(raw, caps));
        }
        Self {
            tokens,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn principal(&self, raw: &str) -> Option<&AuthToken> {
        self.tokens.get(raw)
    }
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self, raw: &str) -> Result<AuthToken, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if raw == EXPIRED {
            return Err(AuthError::InvalidToken(InvalidTokenReason::ExpiredToken));
        }
        self.tokens
            .get(raw)
            .cloned()
            .ok_or(AuthError::InvalidToken(InvalidTokenReason::BadSignature))
    }
}

/// Handler that echoes its arguments and counts invocations
#[derive(Default)]
pub struct CountingHandler {
    calls: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolHandler for CountingHandler {
    async fn call(&self, ctx: &CallContext, arguments: Value) -> Result<Value, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::json!({
            "subject": ctx.subject(),
            "arguments": arguments,
        }))
    }
}

/// Adapter returning canned records
pub struct StubSource {
    pub name: SourceName,
    pub outcome: Result<Vec<RawRecord>, SourceError>,
    pub calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn ok(name: SourceName, records: Vec<RawRecord>) -> Self {
        Self {
            name,
            outcome: Ok(records),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: SourceName) -> Self {
        Self {
            name,
            outcome: Err(SourceError::Transport("connection reset".into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    fn name(&self) -> SourceName {
        self.name
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn query(&self, _query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

pub fn aggregator(sources: Vec<StubSource>) -> Aggregator {
    let adapters: Vec<Arc<dyn SourceAdapter>> = sources
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn SourceAdapter>)
        .collect();
    Aggregator::new(adapters, &[], QueryCache::new(CacheConfig::default()))
}

pub fn egfr_sources() -> Vec<StubSource> {
    vec![
        StubSource::ok(
            SourceName::BoxMetadata,
            vec![
                RawRecord::new("Acme Bio Inc.", None).with_field("summary", "EGFR bispecific"),
                RawRecord::new("Beta Therapeutics", None).with_field("summary", "EGFR ADC"),
            ],
        ),
        StubSource::ok(
            SourceName::Website,
            vec![RawRecord::new("Acme Bio", None).with_field("pipeline", "AB-101")],
        ),
        StubSource::ok(SourceName::GlobalData, vec![]),
    ]
}
