//! Box document metadata table (Airtable)

use std::time::Duration;

use async_trait::async_trait;
use fprime_types::{NormalizedQuery, RawRecord, SourceName, TherapeuticsQuery};

use super::airtable::{all_of, find, to_raw_record, AirtableClient};
use super::SourceAdapter;
use crate::config::AirtableTable;
use crate::SourceError;

/// Matches targets against `{genes}`, indications against `{indications}`,
/// and molecule types against `{summary}` or `{technology}`.
#[derive(Debug, Clone)]
pub struct BoxMetadataAdapter {
    client: AirtableClient,
    table: AirtableTable,
}

impl BoxMetadataAdapter {
    pub fn new(client: AirtableClient, table: AirtableTable) -> Self {
        Self { client, table }
    }
}

/// `filterByFormula` over whichever criteria the query carries
pub fn formula(query: &NormalizedQuery) -> Option<String> {
    let mut clauses = Vec::new();
    if let Some(target) = &query.target {
        clauses.push(find(
            target,
            r#"SUBSTITUTE(SUBSTITUTE(LOWER({genes}),"-","")," ","")"#,
        ));
    }
    if let Some(indication) = &query.indication {
        clauses.push(find(indication, "LOWER({indications})"));
    }
    if let Some(molecule) = &query.molecule_type {
        clauses.push(format!(
            "OR({},{})",
            find(molecule, "LOWER({summary})"),
            find(molecule, "LOWER({technology})")
        ));
    }
    all_of(clauses)
}

#[async_trait]
impl SourceAdapter for BoxMetadataAdapter {
    fn name(&self) -> SourceName {
        SourceName::BoxMetadata
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
            .filter_map(|fields| to_raw_record(fields, &["genes"]))
            .collect())
    }
}
