//! Common error types

use thiserror::Error;

/// Errors raised while validating domain inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// None of target_gene / indication / molecule_type was supplied
    #[error("at least one of target_gene, indication, molecule_type is required")]
    NoCriteria,

    /// A source name in configuration was not recognized
    #[error("unknown source: {0}")]
    UnknownSource(String),
}
