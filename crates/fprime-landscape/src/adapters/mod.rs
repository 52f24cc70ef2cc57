//! Source adapters
//!
//! Each adapter turns a [`TherapeuticsQuery`] into raw records from one
//! upstream. [`run`] applies the adapter's timeout and converts every
//! outcome, failures included, into exactly one [`SourceResult`].

use std::time::Duration;

use async_trait::async_trait;
use fprime_types::{RawRecord, SourceName, SourceReport, SourceStatus, TherapeuticsQuery};
use tracing::Instrument;

use crate::SourceError;

pub mod airtable;
pub mod box_metadata;
pub mod globaldata;
pub mod website;

pub use airtable::AirtableClient;
pub use box_metadata::BoxMetadataAdapter;
pub use globaldata::GlobalDataAdapter;
pub use website::WebsiteAdapter;

/// One upstream data source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> SourceName;

    /// Upper bound on one `query`, retries included
    fn timeout(&self) -> Duration;

    async fn query(&self, query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError>;
}

/// Outcome of one adapter invocation
#[derive(Debug, Clone)]
pub struct SourceResult {
    pub source: SourceName,
    pub outcome: Result<Vec<RawRecord>, SourceError>,
}

impl SourceResult {
    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Status line for the aggregated result
    pub fn report(&self) -> SourceReport {
        let status = match &self.outcome {
            Ok(records) => SourceStatus::Ok {
                records: records.len(),
            },
            Err(e) => SourceStatus::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        SourceReport {
            source: self.source,
            status,
        }
    }
}

/// Query `adapter` under its timeout
pub async fn run(adapter: &dyn SourceAdapter, query: &TherapeuticsQuery) -> SourceResult {
    let source = adapter.name();
    let timeout = adapter.timeout();
    let span = tracing::debug_span!("source_query", source = %source);
    let started = std::time::Instant::now();

    let outcome = match tokio::time::timeout(timeout, adapter.query(query))
        .instrument(span)
        .await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(SourceError::Timeout(timeout)),
    };

    let status = match &outcome {
        Ok(records) => {
            tracing::debug!(source = %source, records = records.len(), "Source query succeeded");
            "ok"
        }
        Err(e) => {
            tracing::warn!(source = %source, error = %e, "Source query failed");
            e.kind().as_str()
        }
    };
    metrics::counter!(
        "landscape_source_results_total",
        "source" => source.as_str(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("landscape_source_duration_seconds", "source" => source.as_str())
        .record(started.elapsed().as_secs_f64());

    SourceResult { source, outcome }
}

/// First non-empty string among `keys` in an Airtable/GlobalData field map
pub(crate) fn first_string(
    fields: &serde_json::Map<String, serde_json::Value>,
    keys: &[&str],
) -> Option<String> {
    keys.iter().find_map(|k| match fields.get(*k) {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
            .map(|s| s.trim().to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl SourceAdapter for Slow {
        fn name(&self) -> SourceName {
            SourceName::Website
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn query(&self, _query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_source_error() {
        let result = run(&Slow, &TherapeuticsQuery::for_target("EGFR")).await;
        assert_eq!(result.source, SourceName::Website);
        assert!(matches!(result.outcome, Err(SourceError::Timeout(_))));

        let report = result.report();
        assert!(report.status.is_error());
    }

    #[test]
    fn test_first_string() {
        let fields = serde_json::json!({
            "company": "", "Company": ["", "Acme Bio"], "name": "Other"
        });
        let fields = fields.as_object().unwrap();
        assert_eq!(
            first_string(fields, &["company", "Company", "name"]).as_deref(),
            Some("Acme Bio")
        );
        assert_eq!(first_string(fields, &["missing"]), None);
    }
}
