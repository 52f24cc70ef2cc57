//! REST API handlers

pub mod auth;
pub mod health;
pub mod tools;

pub use auth::*;
pub use health::*;
pub use tools::*;
