//! F-Prime Types - Shared domain types
//!
//! This crate contains domain types used across the F-Prime MCP workspace:
//! - Principal identity and capability sets
//! - Tool authorization policies and decisions
//! - Therapeutics landscape queries and aggregated results
//! - Tool invocation envelopes

pub mod auth;
pub mod error;
pub mod policy;
pub mod therapeutics;
pub mod tool;

pub use auth::*;
pub use error::*;
pub use policy::*;
pub use therapeutics::*;
pub use tool::*;
