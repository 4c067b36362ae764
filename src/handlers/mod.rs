//! HTTP request handlers.
//!
//! Each handler pulls the caller's [`AuthContext`](crate::middleware::auth::AuthContext)
//! and request data, calls one service operation, and maps the result to
//! JSON. Errors become responses through `AppError`'s `IntoResponse`.

/// Account management endpoints
pub mod accounts;

/// Monthly budget endpoints
pub mod budgets;

/// Savings goal endpoints
pub mod goals;

/// Health check endpoint
pub mod health;

/// Income and expense endpoints
pub mod transactions;
