//! GlobalData pipeline API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use fprime_types::{RawRecord, SourceName, TherapeuticsQuery};
use fprime_utils::credentials::CredentialResolver;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{first_string, SourceAdapter};
use crate::retry::{with_retry, RetryConfig};
use crate::SourceError;

/// Credential name for the GlobalData API token
pub const GLOBALDATA_TOKEN: &str = "GLOBALDATA_TOKEN";

/// Field holding the per-company drug list, consumed by the exporter
pub const DRUGS_FIELD: &str = "globaldata_drugs";

#[derive(Debug, Deserialize)]
struct PipelineResponse {
    #[serde(rename = "PipelineDrugs", default)]
    pipeline_drugs: Option<Vec<Map<String, Value>>>,
}

/// Queries the pipeline endpoint and folds drugs into one record per company
#[derive(Clone)]
pub struct GlobalDataAdapter {
    http_client: reqwest::Client,
    endpoint: String,
    credentials: CredentialResolver,
    retry: RetryConfig,
    timeout: Duration,
}

impl GlobalDataAdapter {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: CredentialResolver,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http_client,
            endpoint: endpoint.into(),
            credentials,
            retry,
            timeout,
        }
    }

    async fn fetch(&self, params: &[(&str, String)]) -> Result<Vec<Map<String, Value>>, SourceError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(
                status.as_u16(),
                format!("pipeline endpoint returned {status}"),
            ));
        }
        let body: PipelineResponse = response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(e.to_string()))?;
        Ok(body.pipeline_drugs.unwrap_or_default())
    }
}

/// Lower-cased, trimmed query parameters for the criteria present
fn criteria_params(query: &TherapeuticsQuery) -> Vec<(&'static str, String)> {
    [
        ("Target", &query.target_gene),
        ("Indication", &query.indication),
        ("MoleculeType", &query.molecule_type),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (name, v.to_lowercase()))
    })
    .collect()
}

/// Group drugs by `CompanyID`, first-seen company order preserved
pub fn group_by_company(drugs: Vec<Map<String, Value>>) -> Vec<RawRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Option<String>, Vec<Map<String, Value>>)> = HashMap::new();

    for drug in drugs {
        let company_id = match drug.get("CompanyID") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let entry = groups.entry(company_id.clone()).or_insert_with(|| {
            order.push(company_id.clone());
            (None, Vec::new())
        });
        if entry.0.is_none() {
            entry.0 = first_string(&drug, &["Company_Name"]);
        }
        entry.1.push(drug);
    }

    order
        .into_iter()
        .filter_map(|company_id| {
            let (name, drugs) = groups.remove(&company_id)?;
            let Some(name) = name else {
                tracing::debug!(company_id = %company_id, "Skipping GlobalData company without a name");
                return None;
            };
            let target = drugs.iter().find_map(|d| first_string(d, &["Target"]));
            let drug_names: Vec<Value> = drugs
                .iter()
                .filter_map(|d| first_string(d, &["Drug_Name"]))
                .map(Value::String)
                .collect();

            Some(
                RawRecord::new(name, target)
                    .with_field("company_id", company_id)
                    .with_field("drug_names", drug_names)
                    .with_field("globaldata_drug_count", drugs.len())
                    .with_field(
                        DRUGS_FIELD,
                        Value::Array(drugs.into_iter().map(Value::Object).collect()),
                    ),
            )
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for GlobalDataAdapter {
    fn name(&self) -> SourceName {
        SourceName::GlobalData
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn query(&self, query: &TherapeuticsQuery) -> Result<Vec<RawRecord>, SourceError> {
        let token = self
            .credentials
            .get(GLOBALDATA_TOKEN)
            .await
            .map_err(|e| SourceError::MissingCredential(e.to_string()))?;

        let mut params = vec![("TokenId", token.expose().to_string())];
        params.extend(criteria_params(query));

        let drugs = with_retry(&self.retry, || self.fetch(&params)).await?;
        Ok(group_by_company(drugs))
    }
}

impl std::fmt::Debug for GlobalDataAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalDataAdapter")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drug(company_id: Value, company: &str, name: &str) -> Map<String, Value> {
        serde_json::json!({
            "CompanyID": company_id, "Company_Name": company, "Drug_Name": name, "Target": "EGFR"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_group_by_company() {
        let records = group_by_company(vec![
            drug(serde_json::json!(7), "Acme Bio", "AB-1"),
            drug(serde_json::json!("9"), "Beta Pharma", "BP-2"),
            drug(serde_json::json!(7), "Acme Bio", "AB-3"),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entity, "Acme Bio");
        assert_eq!(records[0].target.as_deref(), Some("EGFR"));
        assert_eq!(records[0].fields["globaldata_drug_count"], 2);
        assert_eq!(records[0].fields["drug_names"], serde_json::json!(["AB-1", "AB-3"]));
        assert_eq!(records[1].fields["company_id"], "9");
    }

    #[test]
    fn test_criteria_params_skip_blank() {
        let query = TherapeuticsQuery {
            target_gene: Some(" EGFR ".into()),
            indication: Some("  ".into()),
            molecule_type: Some("Antibody".into()),
            export: false,
        };
        assert_eq!(
            criteria_params(&query),
            vec![
                ("Target", "egfr".to_string()),
                ("MoleculeType", "antibody".to_string())
            ]
        );
    }
}
