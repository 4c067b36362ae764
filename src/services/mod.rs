//! Business logic services.
//!
//! Services contain the ledger rules separated from HTTP handlers. Each one
//! is handed an `Arc<dyn Storage>` when it is built; nothing is global.

pub mod account_service;
pub mod budget_service;
pub mod goal_service;
pub mod transaction_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use account_service::AccountService;
pub use budget_service::BudgetService;
pub use goal_service::GoalService;
pub use transaction_service::TransactionService;

use crate::{error::AppError, storage::StorageError};

/// Maps `StorageError::NotFound` to the entity-specific error and wraps
/// everything else as a storage failure.
pub(crate) fn not_found_as(error: AppError) -> impl FnOnce(StorageError) -> AppError {
    move |storage_error| match storage_error {
        StorageError::NotFound => error,
        other => AppError::Storage(other),
    }
}
