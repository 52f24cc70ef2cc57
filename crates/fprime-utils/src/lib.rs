//! F-Prime Utils
//!
//! Credential resolution (environment first, optional secrets-bundle
//! fallback) and small environment-parsing helpers shared by the services.

pub mod config;
pub mod credentials;

pub use config::*;
pub use credentials::*;
