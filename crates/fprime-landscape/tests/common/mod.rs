//! Shared fixtures for landscape integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fprime_landscape::{SourceAdapter, SourceError};
use fprime_types::{RawRecord, SourceName, TherapeuticsQuery};
use fprime_utils::credentials::{CredentialResolver, StaticSecrets};

/// Adapter returning a canned outcome and counting invocations
pub struct StubAdapter {
    name: SourceName,
    outcome: Result<Vec<RawRecord>, SourceError>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn ok(name: SourceName, records: Vec<RawRecord>) -> Self {
        Self {
            name,
            outcome: Ok(records),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: SourceName, error: SourceError) -> Self {
        Self {
            name,
            outcome: Err(error),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> SourceName {
        self.name
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn query(&self, _query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

pub fn record(entity: &str, fields: &[(&str, &str)]) -> RawRecord {
    fields
        .iter()
        .fold(RawRecord::new(entity, None), |r, (k, v)| r.with_field(*k, *v))
}

pub fn credentials() -> CredentialResolver {
    CredentialResolver::new(Arc::new(
        StaticSecrets::new()
            .with("AIRTABLE_API_KEY", "test-airtable-key")
            .with("GLOBALDATA_TOKEN", "test-gd-token"),
    ))
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}
