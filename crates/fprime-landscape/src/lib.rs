//! F-Prime Landscape - Therapeutics landscape aggregation
//!
//! Fans a [`TherapeuticsQuery`](fprime_types::TherapeuticsQuery) out to the
//! Box metadata, Website and GlobalData sources concurrently, merges and
//! deduplicates what comes back, caches the result by query fingerprint,
//! and renders it to a spreadsheet on request.
//!
//! # Example
//!
//! ```ignore
//! use fprime_landscape::{Aggregator, LandscapeConfig};
//!
//! let aggregator = Aggregator::from_config(&LandscapeConfig::default(), credentials)?;
//! let result = aggregator.aggregate(&TherapeuticsQuery::for_target("EGFR")).await?;
//! ```

pub mod adapters;
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod retry;

pub use adapters::{SourceAdapter, SourceResult};
pub use aggregator::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use retry::{with_retry, RetryConfig, RetryableError};
