//! Fan-out, merge and cache interaction for landscape queries

use std::collections::HashMap;
use std::sync::Arc;

use fprime_types::{
    AggregatedResult, DedupKey, Fingerprint, MergedEntity, RawRecord, SourceName,
    TherapeuticsQuery,
};
use fprime_utils::credentials::CredentialResolver;
use futures::future::join_all;
use tracing::instrument;

use crate::adapters::{
    self, AirtableClient, BoxMetadataAdapter, GlobalDataAdapter, SourceAdapter, SourceResult,
    WebsiteAdapter,
};
use crate::cache::{CacheStats, QueryCache};
use crate::config::{complete_precedence, LandscapeConfig};
use crate::AggregationError;

/// Owns the adapters, in precedence order, and the query cache
#[derive(Clone)]
pub struct Aggregator {
    adapters: Arc<Vec<Arc<dyn SourceAdapter>>>,
    cache: QueryCache,
}

impl Aggregator {
    /// Build from explicit adapters. They are ordered by `precedence`;
    /// adapters whose source is not listed keep default order after it.
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        precedence: &[SourceName],
        cache: QueryCache,
    ) -> Self {
        let order = complete_precedence(precedence);
        let mut adapters = adapters;
        adapters.sort_by_key(|a| order.iter().position(|s| *s == a.name()));
        Self {
            adapters: Arc::new(adapters),
            cache,
        }
    }

    /// Build the Box metadata, Website and GlobalData adapters from config
    pub fn from_config(config: &LandscapeConfig, credentials: CredentialResolver) -> Self {
        let airtable = AirtableClient::new(
            config.airtable_api_url.clone(),
            credentials.clone(),
            config.retry.clone(),
            config.max_pages,
        );
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(BoxMetadataAdapter::new(
                airtable.clone(),
                config.box_metadata.clone(),
            )),
            Arc::new(WebsiteAdapter::new(airtable, config.website.clone())),
            Arc::new(GlobalDataAdapter::new(
                config.globaldata_endpoint.clone(),
                credentials,
                config.retry.clone(),
                config.globaldata_timeout,
            )),
        ];
        Self::new(
            adapters,
            &config.precedence,
            QueryCache::new(config.cache.clone()),
        )
    }

    /// Sources in merge precedence order
    pub fn precedence(&self) -> Vec<SourceName> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Aggregate `query`, from cache when fresh. Concurrent identical
    /// queries share one fan-out.
    #[instrument(skip(self, query), fields(fingerprint))]
    pub async fn aggregate(
        &self,
        query: &TherapeuticsQuery,
    ) -> Result<Arc<AggregatedResult>, AggregationError> {
        query.validate()?;
        let fingerprint = query.fingerprint();
        tracing::Span::current().record("fingerprint", fingerprint.as_str());

        let adapters = Arc::clone(&self.adapters);
        let owned_query = query.clone();
        let key = fingerprint.clone();
        self.cache
            .get_or_compute(fingerprint, async move {
                fan_out(&adapters, &owned_query, key).await
            })
            .await
    }
}

/// Query every adapter concurrently, wait for all, then merge
async fn fan_out(
    adapters: &[Arc<dyn SourceAdapter>],
    query: &TherapeuticsQuery,
    fingerprint: Fingerprint,
) -> Result<AggregatedResult, AggregationError> {
    let results: Vec<SourceResult> =
        join_all(adapters.iter().map(|a| adapters::run(a.as_ref(), query))).await;

    let sources: Vec<_> = results.iter().map(SourceResult::report).collect();
    if results.iter().all(SourceResult::is_error) {
        tracing::error!(fingerprint = %fingerprint, "Every landscape source failed");
        return Err(AggregationError::AllSourcesFailed(sources));
    }

    let partial = results.iter().any(SourceResult::is_error);
    let records = merge(results, query.target_gene.as_deref());
    tracing::info!(
        fingerprint = %fingerprint,
        records = records.len(),
        partial,
        "Landscape aggregation complete"
    );

    Ok(AggregatedResult {
        fingerprint,
        records,
        sources,
        partial,
    })
}

/// Merge source results, given in precedence order.
///
/// Records sharing a normalized (entity, target) key become one entity.
/// When the query names a target, every record is keyed on it. The first
/// source to supply a field wins; later sources only fill absent or null
/// fields. Output order is first appearance.
pub fn merge(results: Vec<SourceResult>, query_target: Option<&str>) -> Vec<MergedEntity> {
    let query_target = query_target.map(str::trim).filter(|t| !t.is_empty());
    let mut merged: Vec<MergedEntity> = Vec::new();
    let mut index: HashMap<DedupKey, usize> = HashMap::new();

    for result in results {
        let Ok(records) = result.outcome else {
            continue;
        };
        for mut record in records {
            if let Some(target) = query_target {
                record.target = Some(target.to_string());
            }
            let key = record.dedup_key();
            if key.entity.is_empty() {
                continue;
            }
            match index.get(&key) {
                Some(&i) => absorb(&mut merged[i], record, result.source),
                None => {
                    index.insert(key, merged.len());
                    merged.push(MergedEntity {
                        entity: record.entity,
                        target: record.target,
                        fields: record.fields,
                        provenance: vec![result.source],
                    });
                }
            }
        }
    }
    merged
}

fn absorb(entity: &mut MergedEntity, record: RawRecord, source: SourceName) {
    if entity.target.is_none() {
        entity.target = record.target;
    }
    for (name, value) in record.fields {
        match entity.fields.get(&name) {
            Some(existing) if !existing.is_null() => {}
            _ if value.is_null() => {}
            _ => {
                entity.fields.insert(name, value);
            }
        }
    }
    if !entity.provenance.contains(&source) {
        entity.provenance.push(source);
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("precedence", &self.precedence())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceError;
    use serde_json::Value;

    fn ok(source: SourceName, records: Vec<RawRecord>) -> SourceResult {
        SourceResult {
            source,
            outcome: Ok(records),
        }
    }

    #[test]
    fn test_first_seen_wins_and_gaps_fill() {
        let merged = merge(
            vec![
                ok(
                    SourceName::BoxMetadata,
                    vec![RawRecord::new("Acme Bio Inc.", None)
                        .with_field("stage", "Phase 2")
                        .with_field("summary", Value::Null)],
                ),
                ok(
                    SourceName::Website,
                    vec![RawRecord::new("ACME BIO", None)
                        .with_field("stage", "Phase 3")
                        .with_field("summary", "bispecific")],
                ),
            ],
            Some("EGFR"),
        );

        assert_eq!(merged.len(), 1);
        let entity = &merged[0];
        assert_eq!(entity.entity, "Acme Bio Inc.");
        assert_eq!(entity.target.as_deref(), Some("EGFR"));
        assert_eq!(entity.fields["stage"], "Phase 2");
        assert_eq!(entity.fields["summary"], "bispecific");
        assert_eq!(
            entity.provenance,
            vec![SourceName::BoxMetadata, SourceName::Website]
        );
    }

    #[test]
    fn test_distinct_targets_stay_separate_without_query_target() {
        let merged = merge(
            vec![ok(
                SourceName::GlobalData,
                vec![
                    RawRecord::new("Acme", Some("EGFR".into())),
                    RawRecord::new("Acme", Some("HER2".into())),
                    RawRecord::new("Acme", Some("egfr".into())),
                ],
            )],
            None,
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_failed_sources_are_skipped() {
        let merged = merge(
            vec![
                SourceResult {
                    source: SourceName::BoxMetadata,
                    outcome: Err(SourceError::Transport("reset".into())),
                },
                ok(SourceName::Website, vec![RawRecord::new("Beta", None)]),
            ],
            None,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].provenance, vec![SourceName::Website]);
    }
}
