//! Minimal Airtable REST client shared by the Box and Website adapters

use std::time::Duration;

use fprime_types::RawRecord;
use fprime_utils::credentials::CredentialResolver;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::first_string;
use crate::retry::{with_retry, RetryConfig};
use crate::SourceError;

/// Credential name for the Airtable personal access token
pub const AIRTABLE_API_KEY: &str = "AIRTABLE_API_KEY";

#[derive(Debug, Deserialize)]
struct ListRecordsPage {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Lists table records matching a `filterByFormula`
#[derive(Clone)]
pub struct AirtableClient {
    http_client: reqwest::Client,
    base_url: String,
    credentials: CredentialResolver,
    retry: RetryConfig,
    max_pages: usize,
}

impl AirtableClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: CredentialResolver,
        retry: RetryConfig,
        max_pages: usize,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            retry,
            max_pages: max_pages.max(1),
        }
    }

    /// Field maps of every matching record, following `offset` up to the page bound
    pub async fn list_records(
        &self,
        base_id: &str,
        table_id: &str,
        formula: Option<&str>,
    ) -> Result<Vec<Map<String, Value>>, SourceError> {
        let api_key = self
            .credentials
            .get(AIRTABLE_API_KEY)
            .await
            .map_err(|e| SourceError::MissingCredential(e.to_string()))?;
        let url = format!("{}/{}/{}", self.base_url, base_id, table_id);

        let mut out = Vec::new();
        let mut offset: Option<String> = None;
        for page in 0..self.max_pages {
            let body = with_retry(&self.retry, || {
                self.fetch_page(&url, api_key.expose(), formula, offset.as_deref())
            })
            .await?;

            out.extend(body.records.into_iter().map(|r| r.fields));
            match body.offset {
                Some(next) => offset = Some(next),
                None => return Ok(out),
            }
            if page + 1 == self.max_pages {
                tracing::warn!(
                    table = table_id,
                    pages = self.max_pages,
                    "Airtable page limit reached; result truncated"
                );
            }
        }
        Ok(out)
    }

    async fn fetch_page(
        &self,
        url: &str,
        api_key: &str,
        formula: Option<&str>,
        offset: Option<&str>,
    ) -> Result<ListRecordsPage, SourceError> {
        let mut request = self.http_client.get(url).bearer_auth(api_key);
        if let Some(formula) = formula {
            request = request.query(&[("filterByFormula", formula)]);
        }
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::from_status(status.as_u16(), truncate(&text, 200)));
        }
        response
            .json::<ListRecordsPage>()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))
    }
}

impl std::fmt::Debug for AirtableClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableClient")
            .field("base_url", &self.base_url)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

/// Field names that may carry the company name
pub const ENTITY_FIELDS: &[&str] = &[
    "company",
    "Company",
    "company_name",
    "Company Name",
    "name",
    "Name",
];

/// Turn an Airtable field map into a raw record; `None` without a company name
pub fn to_raw_record(mut fields: Map<String, Value>, target_fields: &[&str]) -> Option<RawRecord> {
    let entity = first_string(&fields, ENTITY_FIELDS)?;
    let target = first_string(&fields, target_fields);
    fields.retain(|k, v| !v.is_null() && !ENTITY_FIELDS.contains(&k.as_str()));
    Some(RawRecord {
        entity,
        target,
        fields: fields.into_iter().collect(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Quote `value` as an Airtable formula string literal
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `FIND(needle, haystack)>0`
pub fn find(needle: &str, haystack: &str) -> String {
    format!("FIND({},{})>0", quote(needle), haystack)
}

/// `AND(...)` over the given clauses; `None` when there are none
pub fn all_of(clauses: Vec<String>) -> Option<String> {
    if clauses.is_empty() {
        None
    } else {
        Some(format!("AND({})", clauses.join(",")))
    }
}
