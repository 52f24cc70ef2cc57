//! F-Prime Auth Core - Authentication and authorization
//!
//! Bearer-token validation against the identity provider's published key
//! set, the pure authorization gate over principal capability sets, and the
//! OIDC authorization-code login flow with server-side sessions.

pub mod config;
pub mod error;
pub mod gate;
pub mod oidc;
pub mod service;
pub mod session;
pub mod token;

pub use config::*;
pub use error::*;
pub use gate::*;
pub use oidc::*;
pub use service::*;
pub use session::*;
pub use token::*;
