//! Landscape configuration

use std::time::Duration;

use fprime_types::SourceName;

use crate::retry::RetryConfig;

/// Default Airtable REST base URL
pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// One Airtable table
#[derive(Debug, Clone)]
pub struct AirtableTable {
    pub base_id: String,
    pub table_id: String,
    /// Whole-query timeout for this source, retries included
    pub timeout: Duration,
}

impl AirtableTable {
    pub fn new(base_id: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            table_id: table_id.into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Query cache bounds
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an aggregated result stays fresh.
    /// Default: 600 seconds
    pub ttl: Duration,
    /// Maximum number of cached fingerprints.
    /// Default: 8
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(600),
            max_entries: 8,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

/// Everything the aggregator needs to build its adapters
#[derive(Debug, Clone)]
pub struct LandscapeConfig {
    pub airtable_api_url: String,
    pub box_metadata: AirtableTable,
    pub website: AirtableTable,
    pub globaldata_endpoint: String,
    pub globaldata_timeout: Duration,
    /// Merge precedence, highest first
    pub precedence: Vec<SourceName>,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    /// Upper bound on Airtable pages followed per query
    pub max_pages: usize,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            airtable_api_url: DEFAULT_AIRTABLE_API_URL.to_string(),
            box_metadata: AirtableTable::new("", ""),
            website: AirtableTable::new("", ""),
            globaldata_endpoint: String::new(),
            globaldata_timeout: Duration::from_secs(30),
            precedence: SourceName::ALL.to_vec(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            max_pages: 20,
        }
    }
}

impl LandscapeConfig {
    #[must_use]
    pub fn with_precedence(mut self, precedence: &[SourceName]) -> Self {
        self.precedence = complete_precedence(precedence);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Deduplicate `preferred` and append any source it leaves out, in default order
pub fn complete_precedence(preferred: &[SourceName]) -> Vec<SourceName> {
    let mut order: Vec<SourceName> = Vec::with_capacity(SourceName::ALL.len());
    for source in preferred.iter().chain(SourceName::ALL.iter()) {
        if !order.contains(source) {
            order.push(*source);
        }
    }
    order
}
