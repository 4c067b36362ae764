//! Storage adapter contract.
//!
//! The engine never talks to a database directly. Every read and write goes
//! through [`Storage`], a narrow per-entity CRUD interface with filtered
//! queries and compare-and-swap updates. Adapters promise nothing about
//! atomicity across calls: two sequential calls may interleave with any
//! other caller's.
//!
//! Two adapters ship with the crate:
//! - [`MemoryStorage`]: process-local maps, used for tests and for running
//!   without a database
//! - [`PgStorage`]: PostgreSQL through sqlx

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    account::{Account, NewAccount},
    budget::{Budget, BudgetFilter, NewBudget},
    goal::{Goal, NewGoal},
    transaction::{NewTransaction, Transaction, TransactionFilter},
};

/// Typed outcome of a storage call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No row with this id (and owner, where the call filters on one).
    #[error("record not found")]
    NotFound,

    /// The row's version no longer matches the one the caller read, or an
    /// insert collided with a unique key.
    #[error("conflict")]
    Conflict,

    /// The adapter could not complete the call.
    #[error("{operation} failed: {reason}")]
    Failure {
        operation: &'static str,
        reason: String,
    },
}

impl StorageError {
    pub fn failure(operation: &'static str, reason: impl ToString) -> Self {
        StorageError::Failure {
            operation,
            reason: reason.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Per-entity persistence operations the engine is built against.
///
/// Ids are assigned by the store on insert. Calls taking an `owner` return
/// [`StorageError::NotFound`] both for a missing id and for a row owned by
/// somebody else.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Cheap round trip used by health checks.
    async fn ping(&self) -> StorageResult<()>;

    async fn insert_account(&self, account: NewAccount) -> StorageResult<Account>;
    async fn get_account(&self, id: Uuid, owner: Uuid) -> StorageResult<Account>;

    /// Accounts of one user, newest first.
    async fn list_accounts(&self, owner: Uuid) -> StorageResult<Vec<Account>>;

    async fn rename_account(&self, id: Uuid, owner: Uuid, name: &str) -> StorageResult<Account>;

    /// Writes a new balance only if the stored version still equals
    /// `expected_version`, bumping the version on success.
    async fn update_account_balance(
        &self,
        id: Uuid,
        balance_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Account>;

    /// Removes the account together with its transactions.
    async fn delete_account(&self, id: Uuid, owner: Uuid) -> StorageResult<()>;

    async fn insert_transaction(&self, transaction: NewTransaction) -> StorageResult<Transaction>;

    /// Unscoped lookup; the caller checks ownership through the account.
    async fn get_transaction(&self, id: Uuid) -> StorageResult<Transaction>;

    /// Transactions matching `filter`, newest first.
    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StorageResult<Vec<Transaction>>;

    async fn delete_transaction(&self, id: Uuid) -> StorageResult<()>;

    async fn insert_budget(&self, budget: NewBudget) -> StorageResult<Budget>;

    /// Budgets matching `filter`, ordered by category.
    async fn query_budgets(&self, filter: &BudgetFilter) -> StorageResult<Vec<Budget>>;

    async fn delete_budget(&self, id: Uuid, owner: Uuid) -> StorageResult<()>;

    async fn insert_goal(&self, goal: NewGoal) -> StorageResult<Goal>;
    async fn get_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<Goal>;

    /// Goals of one user by deadline, undated goals last.
    async fn list_goals(&self, owner: Uuid) -> StorageResult<Vec<Goal>>;

    /// Compare-and-swap write of a goal's progress.
    async fn update_goal_amount(
        &self,
        id: Uuid,
        current_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Goal>;

    async fn delete_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<()>;
}
