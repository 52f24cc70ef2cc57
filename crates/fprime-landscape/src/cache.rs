//! Query cache with request coalescing
//!
//! One table owns three things behind a single lock: fresh results keyed by
//! fingerprint, their insertion order for eviction, and the aggregations
//! currently in flight. A miss spawns the aggregation as a task and parks a
//! shared handle to it in the in-flight map; concurrent callers for the same
//! fingerprint await that handle instead of starting their own fan-out. The
//! task itself stores the result and removes the in-flight entry, so it
//! completes and populates the cache even if every caller has gone away.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use fprime_types::{AggregatedResult, Fingerprint};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;
use crate::AggregationError;

type Outcome = Result<Arc<AggregatedResult>, AggregationError>;
type InFlight = Shared<BoxFuture<'static, Outcome>>;

/// A cached aggregation
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<AggregatedResult>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// How a lookup was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Miss,
    Coalesced,
}

impl Lookup {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Coalesced => "coalesced",
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Fingerprint, CacheEntry>,
    /// Insertion order, oldest first
    order: VecDeque<Fingerprint>,
    in_flight: HashMap<Fingerprint, InFlight>,
}

impl CacheState {
    fn fresh(&mut self, fingerprint: &Fingerprint) -> Option<Arc<AggregatedResult>> {
        let entry = self.entries.get(fingerprint)?;
        if entry.is_fresh() {
            return Some(Arc::clone(&entry.value));
        }
        self.remove(fingerprint);
        None
    }

    fn remove(&mut self, fingerprint: &Fingerprint) {
        self.entries.remove(fingerprint);
        self.order.retain(|f| f != fingerprint);
    }

    fn purge_expired(&mut self) {
        let expired: Vec<Fingerprint> = self
            .entries
            .iter()
            .filter(|(_, e)| !e.is_fresh())
            .map(|(f, _)| f.clone())
            .collect();
        for fingerprint in &expired {
            self.remove(fingerprint);
        }
    }

    fn insert(&mut self, fingerprint: Fingerprint, value: Arc<AggregatedResult>, config: &CacheConfig) {
        if config.max_entries == 0 {
            return;
        }
        self.purge_expired();
        self.remove(&fingerprint);
        while self.entries.len() >= config.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            tracing::debug!(fingerprint = %oldest, "Evicting oldest landscape cache entry");
            self.entries.remove(&oldest);
        }
        self.order.push_back(fingerprint.clone());
        self.entries.insert(
            fingerprint,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: config.ttl,
            },
        );
    }
}

/// Fingerprint → aggregated result, bounded by TTL and entry count
#[derive(Clone)]
pub struct QueryCache {
    config: CacheConfig,
    state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Fresh cached value, if any
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<AggregatedResult>> {
        self.state.lock().await.fresh(fingerprint)
    }

    /// Return the cached result for `fingerprint`, join an in-flight
    /// aggregation for it, or run `compute` in the background. Only
    /// successful results are stored.
    pub async fn get_or_compute<F>(&self, fingerprint: Fingerprint, compute: F) -> Outcome
    where
        F: Future<Output = Result<AggregatedResult, AggregationError>> + Send + 'static,
    {
        let (lookup, pending) = {
            let mut state = self.state.lock().await;
            if let Some(value) = state.fresh(&fingerprint) {
                record_lookup(Lookup::Hit);
                return Ok(value);
            }
            match state.in_flight.get(&fingerprint) {
                Some(pending) => (Lookup::Coalesced, pending.clone()),
                None => {
                    let pending = self.spawn(fingerprint.clone(), compute);
                    state.in_flight.insert(fingerprint.clone(), pending.clone());
                    (Lookup::Miss, pending)
                }
            }
        };

        record_lookup(lookup);
        tracing::debug!(fingerprint = %fingerprint, lookup = lookup.as_str(), "Landscape cache lookup");
        pending.await
    }

    fn spawn<F>(&self, fingerprint: Fingerprint, compute: F) -> InFlight
    where
        F: Future<Output = Result<AggregatedResult, AggregationError>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            // A panicking aggregation still has to leave the in-flight map
            let outcome = match AssertUnwindSafe(compute).catch_unwind().await {
                Ok(outcome) => outcome.map(Arc::new),
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(
                        fingerprint = %fingerprint,
                        panic = %message,
                        "Landscape aggregation panicked"
                    );
                    Err(AggregationError::Internal(format!("aggregation panicked: {message}")))
                }
            };
            let mut state = state.lock().await;
            state.in_flight.remove(&fingerprint);
            if let Ok(value) = &outcome {
                state.insert(fingerprint, Arc::clone(value), &config);
            }
            outcome
        });

        async move {
            handle
                .await
                .unwrap_or_else(|e| Err(AggregationError::Internal(e.to_string())))
        }
        .boxed()
        .shared()
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            max_entries: self.config.max_entries,
            ttl_secs: self.config.ttl.as_secs(),
        }
    }

    /// Drop every cached result; in-flight aggregations are left alone
    pub async fn invalidate_all(&self) {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.order.clear();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn record_lookup(lookup: Lookup) {
    metrics::counter!("landscape_cache_lookups_total", "result" => lookup.as_str()).increment(1);
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
