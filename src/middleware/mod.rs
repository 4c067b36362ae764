//! HTTP middleware components.

/// Caller identity from the gateway header
pub mod auth;
