//! Error types and HTTP error response handling.
//!
//! This module defines every error the engine can surface and how each is
//! converted into an HTTP response with a status code and JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::storage::StorageError;

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation**: bad input, rejected before anything is written
/// - **Not found**: missing entities; existence and ownership are merged so a
///   caller cannot probe for other users' ids
/// - **Admission**: budget, overdraft and goal bounds
/// - **Concurrency**: compare-and-swap retries exhausted
/// - **Storage**: adapter failures, carrying the failing operation's name
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Transaction kind, amount or category is invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Any other request body or parameter is invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request carried no caller identity.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing user identity")]
    MissingIdentity,

    /// The entity exists but belongs to another user.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Unauthorized")]
    Unauthorized,

    /// Account does not exist or belongs to another user.
    #[error("Account not found")]
    AccountNotFound,

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Budget not found")]
    BudgetNotFound,

    #[error("Goal not found")]
    GoalNotFound,

    /// An expense would push a saving or investment account below zero.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// The expense would take the category past its monthly limit.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error(
        "Budget exceeded: limit {limit_cents}, spent {spent_cents}, attempted {attempted_cents}"
    )]
    BudgetExceeded {
        limit_cents: i64,
        spent_cents: i64,
        attempted_cents: i64,
    },

    /// A budget already exists for this category and month.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Budget for '{category}' already exists for {month}/{year}")]
    DuplicateBudget {
        category: String,
        month: i32,
        year: i32,
    },

    /// Adding the amount would exceed the goal's target.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Amount exceeds goal target, at most {max_addable_cents} can be added")]
    GoalOverfund { max_addable_cents: i64 },

    /// A total computed from stored amounts does not fit the money type.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Amount total is outside the supported range")]
    AmountOverflow,

    /// The stored row kept changing under us until the retries ran out.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("Concurrent update conflict after {attempts} attempts")]
    ConcurrencyConflict { attempts: u32 },

    /// Writing an account balance failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(StorageError),

    /// Any other storage adapter failure.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl AppError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidTransaction(_) => "invalid_transaction",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::MissingIdentity => "missing_identity",
            AppError::Unauthorized => "unauthorized",
            AppError::AccountNotFound => "account_not_found",
            AppError::TransactionNotFound => "transaction_not_found",
            AppError::BudgetNotFound => "budget_not_found",
            AppError::GoalNotFound => "goal_not_found",
            AppError::InsufficientFunds => "insufficient_funds",
            AppError::BudgetExceeded { .. } => "budget_exceeded",
            AppError::DuplicateBudget { .. } => "duplicate_budget",
            AppError::GoalOverfund { .. } => "goal_overfund",
            AppError::AmountOverflow => "amount_overflow",
            AppError::ConcurrencyConflict { .. } => "concurrency_conflict",
            AppError::LedgerWriteFailed(_) | AppError::Storage(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidTransaction(_) | AppError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::MissingIdentity => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::AccountNotFound
            | AppError::TransactionNotFound
            | AppError::BudgetNotFound
            | AppError::GoalNotFound => StatusCode::NOT_FOUND,
            AppError::InsufficientFunds
            | AppError::BudgetExceeded { .. }
            | AppError::GoalOverfund { .. }
            | AppError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DuplicateBudget { .. } | AppError::ConcurrencyConflict { .. } => {
                StatusCode::CONFLICT
            }
            AppError::LedgerWriteFailed(_) | AppError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Structured fields clients can act on without parsing the message.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::BudgetExceeded {
                limit_cents,
                spent_cents,
                attempted_cents,
            } => Some(json!({
                "limit_cents": limit_cents,
                "spent_cents": spent_cents,
                "attempted_cents": attempted_cents,
            })),
            AppError::GoalOverfund { max_addable_cents } => {
                Some(json!({ "max_addable_cents": max_addable_cents }))
            }
            _ => None,
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "budget_exceeded",
///     "message": "Budget exceeded: limit 4000, spent 3000, attempted 2000",
///     "details": { "limit_cents": 4000, "spent_cents": 3000, "attempted_cents": 2000 }
///   }
/// }
/// ```
///
/// Storage failures are logged and replaced by a generic message so adapter
/// internals never reach the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::LedgerWriteFailed(_) | AppError::Storage(_) => {
                tracing::error!(error = %self, "request failed in storage layer");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let mut error = json!({
            "code": code,
            "message": message,
        });
        if let Some(details) = self.details() {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
