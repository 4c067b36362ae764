//! Fault-injecting storage and fixtures shared by the service tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AccountService, BudgetService, GoalService, TransactionService};
use crate::{
    models::{
        account::{Account, CreateAccountRequest, NewAccount},
        budget::{Budget, BudgetFilter, NewBudget},
        goal::{Goal, NewGoal},
        transaction::{NewTransaction, Transaction, TransactionFilter, TransactionKind},
    },
    storage::{MemoryStorage, Storage, StorageError, StorageResult},
};

/// Wraps [`MemoryStorage`] and can be told to lose compare-and-swap races or
/// fail writes outright.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    balance_conflicts: AtomicU32,
    goal_conflicts: AtomicU32,
    balance_failures: AtomicBool,
    balance_attempts: AtomicU32,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` balance writes answer `Conflict`.
    pub fn conflict_next_balance_writes(&self, count: u32) {
        self.balance_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn conflict_next_goal_writes(&self, count: u32) {
        self.goal_conflicts.store(count, Ordering::SeqCst);
    }

    /// Every balance write fails until switched off again.
    pub fn fail_balance_writes(&self, fail: bool) {
        self.balance_failures.store(fail, Ordering::SeqCst);
    }

    pub fn balance_write_attempts(&self) -> u32 {
        self.balance_attempts.load(Ordering::SeqCst)
    }

    /// Writes a transaction straight to the store, skipping the ledger.
    pub async fn record_income(&self, account_id: Uuid, amount_cents: i64) -> Transaction {
        self.record(account_id, amount_cents, TransactionKind::Income, "salary", Utc::now())
            .await
    }

    pub async fn record(
        &self,
        account_id: Uuid,
        amount_cents: i64,
        kind: TransactionKind,
        category: &str,
        occurred_at: DateTime<Utc>,
    ) -> Transaction {
        self.inner
            .insert_transaction(NewTransaction {
                account_id,
                amount_cents,
                kind,
                category: category.to_string(),
                description: None,
                occurred_at,
            })
            .await
            .unwrap()
    }
}

/// Decrements `counter` if it is positive, reporting whether it was.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn ping(&self) -> StorageResult<()> {
        self.inner.ping().await
    }

    async fn insert_account(&self, account: NewAccount) -> StorageResult<Account> {
        self.inner.insert_account(account).await
    }

    async fn get_account(&self, id: Uuid, owner: Uuid) -> StorageResult<Account> {
        self.inner.get_account(id, owner).await
    }

    async fn list_accounts(&self, owner: Uuid) -> StorageResult<Vec<Account>> {
        self.inner.list_accounts(owner).await
    }

    async fn rename_account(&self, id: Uuid, owner: Uuid, name: &str) -> StorageResult<Account> {
        self.inner.rename_account(id, owner, name).await
    }

    async fn update_account_balance(
        &self,
        id: Uuid,
        balance_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Account> {
        self.balance_attempts.fetch_add(1, Ordering::SeqCst);

        if self.balance_failures.load(Ordering::SeqCst) {
            return Err(StorageError::failure(
                "update_account_balance",
                "connection reset",
            ));
        }
        if take_one(&self.balance_conflicts) {
            return Err(StorageError::Conflict);
        }

        self.inner
            .update_account_balance(id, balance_cents, expected_version)
            .await
    }

    async fn delete_account(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        self.inner.delete_account(id, owner).await
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StorageResult<Transaction> {
        self.inner.insert_transaction(transaction).await
    }

    async fn get_transaction(&self, id: Uuid) -> StorageResult<Transaction> {
        self.inner.get_transaction(id).await
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StorageResult<Vec<Transaction>> {
        self.inner.query_transactions(filter).await
    }

    async fn delete_transaction(&self, id: Uuid) -> StorageResult<()> {
        self.inner.delete_transaction(id).await
    }

    async fn insert_budget(&self, budget: NewBudget) -> StorageResult<Budget> {
        self.inner.insert_budget(budget).await
    }

    async fn query_budgets(&self, filter: &BudgetFilter) -> StorageResult<Vec<Budget>> {
        self.inner.query_budgets(filter).await
    }

    async fn delete_budget(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        self.inner.delete_budget(id, owner).await
    }

    async fn insert_goal(&self, goal: NewGoal) -> StorageResult<Goal> {
        self.inner.insert_goal(goal).await
    }

    async fn get_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<Goal> {
        self.inner.get_goal(id, owner).await
    }

    async fn list_goals(&self, owner: Uuid) -> StorageResult<Vec<Goal>> {
        self.inner.list_goals(owner).await
    }

    async fn update_goal_amount(
        &self,
        id: Uuid,
        current_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Goal> {
        if take_one(&self.goal_conflicts) {
            return Err(StorageError::Conflict);
        }

        self.inner
            .update_goal_amount(id, current_cents, expected_version)
            .await
    }

    async fn delete_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        self.inner.delete_goal(id, owner).await
    }
}

/// Every service wired to the same store.
pub struct Services {
    pub storage: Arc<FlakyStorage>,
    pub accounts: AccountService,
    pub budgets: BudgetService,
    pub goals: GoalService,
    pub transactions: TransactionService,
}

pub fn services() -> Services {
    let storage = Arc::new(FlakyStorage::new());
    let shared: Arc<dyn Storage> = storage.clone();

    let accounts = AccountService::new(shared.clone(), 3);
    let budgets = BudgetService::new(shared.clone());
    let goals = GoalService::new(shared.clone(), 3);
    let transactions = TransactionService::new(shared, accounts.clone(), budgets.clone());

    Services {
        storage,
        accounts,
        budgets,
        goals,
        transactions,
    }
}

pub async fn create_account(
    accounts: &AccountService,
    user_id: Uuid,
    kind: &str,
    opening_balance_cents: i64,
) -> Account {
    accounts
        .create_account(
            user_id,
            CreateAccountRequest {
                name: "Main".to_string(),
                kind: kind.to_string(),
                opening_balance_cents,
            },
        )
        .await
        .unwrap()
}
