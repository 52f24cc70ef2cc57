//! Scraped company website pipeline table (Airtable)

use std::time::Duration;

use async_trait::async_trait;
use fprime_types::{NormalizedQuery, RawRecord, SourceName, TherapeuticsQuery};

use super::airtable::{all_of, find, to_raw_record, AirtableClient};
use super::SourceAdapter;
use crate::config::AirtableTable;
use crate::SourceError;

/// Every criterion is matched against the free-text `{pipeline}` field.
#[derive(Debug, Clone)]
pub struct WebsiteAdapter {
    client: AirtableClient,
    table: AirtableTable,
}

impl WebsiteAdapter {
    pub fn new(client: AirtableClient, table: AirtableTable) -> Self {
        Self { client, table }
    }
}

pub fn formula(query: &NormalizedQuery) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(target) = &query.target {
        clauses.push(find(
            target,
            r#"SUBSTITUTE(SUBSTITUTE(LOWER({pipeline}),"-","")," ","")"#,
        ));
    }
    if let Some(indication) = &query.indication {
        clauses.push(find(indication, "LOWER({pipeline})"));
    }
    if let Some(molecule) = &query.molecule_type {
        clauses.push(find(molecule, "LOWER({pipeline})"));
    }
    all_of(clauses)
}

#[async_trait]
impl SourceAdapter for WebsiteAdapter {
    fn name(&self) -> SourceName {
        SourceName::Website
    }

    fn timeout(&self) -> Duration {
        self.table.timeout
    }

    async fn query(&self, query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError> {
        let formula = formula(&query.normalized());
        let rows = self
            .client
            .list_records(&self.table.base_id, &self.table.table_id, formula.as_deref())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|fields| to_raw_record(fields, &["target", "targets"]))
            .collect())
    }
}
