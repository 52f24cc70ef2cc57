//! Therapeutics landscape query and result types

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::QueryError;

/// Structured query for the therapeutics landscape tool.
///
/// At least one of `target_gene`, `indication`, `molecule_type` must be
/// non-blank; see [`TherapeuticsQuery::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapeuticsQuery {
    /// Target or gene symbol (e.g. "EGFR", "PD-L1")
    #[serde(default)]
    pub target_gene: Option<String>,
    /// Disease indication (e.g. "non-small cell lung cancer")
    #[serde(default)]
    pub indication: Option<String>,
    /// Molecule type (e.g. "antibody", "small molecule")
    #[serde(default)]
    pub molecule_type: Option<String>,
    /// Attach a spreadsheet export to the response
    #[serde(default)]
    pub export: bool,
}

impl TherapeuticsQuery {
    /// Query by target only
    pub fn for_target(target: impl Into<String>) -> Self {
        Self {
            target_gene: Some(target.into()),
            ..Self::default()
        }
    }

    /// Enforce the at-least-one-criterion invariant
    pub fn validate(&self) -> Result<(), QueryError> {
        let present = [&self.target_gene, &self.indication, &self.molecule_type]
            .iter()
            .any(|field| non_blank(field).is_some());
        if present {
            Ok(())
        } else {
            Err(QueryError::NoCriteria)
        }
    }

    /// Normalized criteria, used for source filters and the cache key
    pub fn normalized(&self) -> NormalizedQuery {
        NormalizedQuery {
            target: non_blank(&self.target_gene).map(normalize_target),
            indication: non_blank(&self.indication).map(normalize_indication),
            molecule_type: non_blank(&self.molecule_type).map(normalize_molecule_type),
        }
    }

    /// Cache key for this query. `export` does not participate.
    pub fn fingerprint(&self) -> Fingerprint {
        self.normalized().fingerprint()
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Query criteria after normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedQuery {
    pub target: Option<String>,
    pub indication: Option<String>,
    pub molecule_type: Option<String>,
}

impl NormalizedQuery {
    /// SHA-256 over the canonical criteria triple
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for part in [&self.target, &self.indication, &self.molecule_type] {
            match part {
                Some(value) => {
                    hasher.update([1u8]);
                    hasher.update(value.as_bytes());
                }
                None => hasher.update([0u8]),
            }
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        Fingerprint(digest.iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Lower-case and drop dashes/whitespace ("PD-L1" and "pdl1" compare equal)
pub fn normalize_target(target: &str) -> String {
    target
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lower-case and trim
pub fn normalize_indication(indication: &str) -> String {
    indication.trim().to_lowercase()
}

/// Lower-case and drop one trailing `y`, so "antibody" also matches "antibodies"
pub fn normalize_molecule_type(molecule_type: &str) -> String {
    let mut m = molecule_type.trim().to_lowercase();
    if m.ends_with('y') {
        m.pop();
    }
    m
}

const LEGAL_SUFFIXES: &[&str] = &[
    "inc",
    "ltd",
    "llc",
    "corp",
    "corporation",
    "plc",
    "gmbh",
    "ag",
    "sa",
    "co",
];

/// Normalize a company/entity name for deduplication
pub fn normalize_entity(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.len() > 1 && words.last().is_some_and(|w| LEGAL_SUFFIXES.contains(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Normalized, hashable representation of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upstream data sources behind the landscape tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// Box document metadata table
    BoxMetadata,
    /// Scraped company website pipeline table
    Website,
    /// GlobalData pipeline API
    #[serde(rename = "globaldata")]
    GlobalData,
}

impl SourceName {
    /// Default merge precedence
    pub const ALL: [SourceName; 3] = [Self::BoxMetadata, Self::Website, Self::GlobalData];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoxMetadata => "box_metadata",
            Self::Website => "website",
            Self::GlobalData => "globaldata",
        }
    }
}

impl std::fmt::Display for SourceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "box_metadata" | "box" => Ok(Self::BoxMetadata),
            "website" | "websites" => Ok(Self::Website),
            "globaldata" | "global_data" => Ok(Self::GlobalData),
            other => Err(QueryError::UnknownSource(other.to_string())),
        }
    }
}

/// Failure class of a single source query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Timeout,
    Authentication,
    MissingCredential,
    Upstream,
    MalformedResponse,
    Transport,
}

impl SourceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::MissingCredential => "missing_credential",
            Self::Upstream => "upstream",
            Self::MalformedResponse => "malformed_response",
            Self::Transport => "transport",
        }
    }
}

/// Outcome of one source for one aggregation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Source answered; `records` raw records contributed to the merge
    Ok { records: usize },
    /// Source failed and was left out of the merge
    Error {
        kind: SourceErrorKind,
        message: String,
    },
}

impl SourceStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Per-source status carried on an aggregated result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceName,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// A record as returned by one source adapter, before merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Company or entity name as the source spells it
    pub entity: String,
    /// Target/gene this record is about, if known
    pub target: Option<String>,
    /// Remaining source fields
    pub fields: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn new(entity: impl Into<String>, target: Option<String>) -> Self {
        Self {
            entity: entity.into(),
            target,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Deduplication key: normalized (entity, target)
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            entity: normalize_entity(&self.entity),
            target: self
                .target
                .as_deref()
                .map(normalize_target)
                .unwrap_or_default(),
        }
    }
}

/// Normalized (entity, target) pair used to merge records across sources
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    pub entity: String,
    pub target: String,
}

/// An entity after cross-source merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEntity {
    /// Entity name from the highest-precedence contributing source
    pub entity: String,
    pub target: Option<String>,
    /// Union of fields across contributing sources
    pub fields: BTreeMap<String, Value>,
    /// Contributing sources, in precedence order
    pub provenance: Vec<SourceName>,
}

/// Merged, deduplicated result of one landscape query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub fingerprint: Fingerprint,
    pub records: Vec<MergedEntity>,
    pub sources: Vec<SourceReport>,
    /// True if any source failed
    pub partial: bool,
}

impl AggregatedResult {
    /// Sources that failed
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|r| r.status.is_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_a_criterion() {
        assert!(TherapeuticsQuery::for_target("EGFR").validate().is_ok());
        assert!(TherapeuticsQuery::default().validate().is_err());

        let blank = TherapeuticsQuery {
            target_gene: Some("   ".to_string()),
            indication: Some(String::new()),
            ..TherapeuticsQuery::default()
        };
        assert!(matches!(blank.validate(), Err(QueryError::NoCriteria)));
    }

    #[test]
    fn test_normalization_rules() {
        assert_eq!(normalize_target("PD-L1"), "pdl1");
        assert_eq!(normalize_target(" Her 2 "), "her2");
        assert_eq!(normalize_indication("  NSCLC "), "nsclc");
        assert_eq!(normalize_molecule_type("Antibody"), "antibod");
        assert_eq!(normalize_molecule_type("small molecule"), "small molecule");
    }

    #[test]
    fn test_normalize_entity_strips_suffixes_and_punctuation() {
        assert_eq!(normalize_entity("Acme Therapeutics, Inc."), "acme therapeutics");
        assert_eq!(normalize_entity("ACME   therapeutics"), "acme therapeutics");
        assert_eq!(normalize_entity("Co"), "co");
    }

    #[test]
    fn test_fingerprint_ignores_case_and_export_flag() {
        let a = TherapeuticsQuery {
            target_gene: Some("EGFR".to_string()),
            export: true,
            ..TherapeuticsQuery::default()
        };
        let b = TherapeuticsQuery {
            target_gene: Some("egfr".to_string()),
            indication: Some("  ".to_string()),
            ..TherapeuticsQuery::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_fields() {
        let by_target = TherapeuticsQuery::for_target("kras");
        let by_indication = TherapeuticsQuery {
            indication: Some("kras".to_string()),
            ..TherapeuticsQuery::default()
        };
        assert_ne!(by_target.fingerprint(), by_indication.fingerprint());
    }

    #[test]
    fn test_source_name_parse_and_serde() {
        assert_eq!("box".parse::<SourceName>().unwrap(), SourceName::BoxMetadata);
        assert_eq!(
            "GlobalData".parse::<SourceName>().unwrap(),
            SourceName::GlobalData
        );
        assert!("pubmed".parse::<SourceName>().is_err());
        assert_eq!(
            serde_json::to_value(SourceName::GlobalData).unwrap(),
            "globaldata"
        );
    }

    #[test]
    fn test_source_report_serializes_flat() {
        let report = SourceReport {
            source: SourceName::Website,
            status: SourceStatus::Error {
                kind: SourceErrorKind::Timeout,
                message: "timed out after 30s".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "website");
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "timeout");
    }

    #[test]
    fn test_dedup_key_normalizes_both_parts() {
        let a = RawRecord::new("Acme Bio Inc", Some("EGFR".to_string()));
        let b = RawRecord::new("acme bio", Some("egfr".to_string()));
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
