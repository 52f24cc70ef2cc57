//! F-Prime MCP - tool registry and dispatcher
//!
//! Tools are registered once at start-up as [`ToolDescriptor`]s carrying an
//! input schema and an [`AuthorizationPolicy`](fprime_types::AuthorizationPolicy).
//! [`ToolRegistry::call`] runs the fixed dispatch pipeline: name lookup,
//! argument validation, token validation plus authorization, then exactly
//! one handler invocation.
//!
//! ## Example
//!
//! ```ignore
//! use fprime_mcp::{tools, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new(authenticator);
//! tools::register_catalog(&mut registry, aggregator, proxy, &catalog)?;
//! let result = registry.call("therapeutics_landscape", Some(bearer), args).await?;
//! ```

pub mod error;
pub mod proxy;
pub mod registry;
pub mod schema;
pub mod tools;

pub use error::ToolError;
pub use proxy::{ProxyClient, ProxyError};
pub use registry::{CallContext, ToolDescriptor, ToolHandler, ToolRegistry};
pub use schema::InputSchema;
