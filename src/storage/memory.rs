//! In-memory storage adapter.
//!
//! Each call takes the lock once and releases it before returning, so
//! consecutive calls interleave with other callers exactly as they would
//! against a remote table store.

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::{
    account::{Account, NewAccount},
    budget::{Budget, BudgetFilter, NewBudget},
    fold_category,
    goal::{Goal, NewGoal},
    transaction::{NewTransaction, Transaction, TransactionFilter},
};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    transactions: HashMap<Uuid, Transaction>,
    budgets: HashMap<Uuid, Budget>,
    goals: HashMap<Uuid, Goal>,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn insert_account(&self, account: NewAccount) -> StorageResult<Account> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            user_id: account.user_id,
            name: account.name,
            kind: account.kind,
            opening_balance_cents: account.opening_balance_cents,
            balance_cents: account.opening_balance_cents,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        self.tables
            .write()
            .await
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: Uuid, owner: Uuid) -> StorageResult<Account> {
        self.tables
            .read()
            .await
            .accounts
            .get(&id)
            .filter(|account| account.user_id == owner)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_accounts(&self, owner: Uuid) -> StorageResult<Vec<Account>> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|account| account.user_id == owner)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn rename_account(&self, id: Uuid, owner: Uuid, name: &str) -> StorageResult<Account> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&id)
            .filter(|account| account.user_id == owner)
            .ok_or(StorageError::NotFound)?;

        account.name = name.to_string();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn update_account_balance(
        &self,
        id: Uuid,
        balance_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Account> {
        let mut tables = self.tables.write().await;
        let account = tables.accounts.get_mut(&id).ok_or(StorageError::NotFound)?;

        if account.version != expected_version {
            return Err(StorageError::Conflict);
        }

        account.balance_cents = balance_cents;
        account.version += 1;
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn delete_account(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .accounts
            .get(&id)
            .is_some_and(|account| account.user_id == owner);
        if !owned {
            return Err(StorageError::NotFound);
        }

        tables.accounts.remove(&id);
        tables
            .transactions
            .retain(|_, transaction| transaction.account_id != id);
        Ok(())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StorageResult<Transaction> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&transaction.account_id) {
            return Err(StorageError::failure(
                "insert_transaction",
                "account does not exist",
            ));
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            account_id: transaction.account_id,
            amount_cents: transaction.amount_cents,
            kind: transaction.kind,
            category: transaction.category,
            description: transaction.description,
            occurred_at: transaction.occurred_at,
        };
        tables
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: Uuid) -> StorageResult<Transaction> {
        self.tables
            .read()
            .await
            .transactions
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StorageResult<Vec<Transaction>> {
        let tables = self.tables.read().await;
        let mut transactions: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|transaction| filter.matches(transaction))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(transactions)
    }

    async fn delete_transaction(&self, id: Uuid) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn insert_budget(&self, budget: NewBudget) -> StorageResult<Budget> {
        let mut tables = self.tables.write().await;

        // Mirrors the unique index the database carries.
        let folded = fold_category(&budget.category);
        let duplicate = tables.budgets.values().any(|existing| {
            existing.user_id == budget.user_id
                && existing.month == budget.month
                && existing.year == budget.year
                && fold_category(&existing.category) == folded
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        let budget = Budget {
            id: Uuid::new_v4(),
            user_id: budget.user_id,
            category: budget.category,
            limit_cents: budget.limit_cents,
            month: budget.month,
            year: budget.year,
            created_at: Utc::now(),
        };
        tables.budgets.insert(budget.id, budget.clone());
        Ok(budget)
    }

    async fn query_budgets(&self, filter: &BudgetFilter) -> StorageResult<Vec<Budget>> {
        let category = filter.category.as_deref().map(fold_category);
        let tables = self.tables.read().await;

        let mut budgets: Vec<Budget> = tables
            .budgets
            .values()
            .filter(|budget| {
                budget.user_id == filter.user_id
                    && budget.month == filter.period.month
                    && budget.year == filter.period.year
                    && category
                        .as_ref()
                        .is_none_or(|category| fold_category(&budget.category) == *category)
            })
            .cloned()
            .collect();
        budgets.sort_by(|a, b| a.category.cmp(&b.category));
        Ok(budgets)
    }

    async fn delete_budget(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .budgets
            .get(&id)
            .is_some_and(|budget| budget.user_id == owner);
        if !owned {
            return Err(StorageError::NotFound);
        }

        tables.budgets.remove(&id);
        Ok(())
    }

    async fn insert_goal(&self, goal: NewGoal) -> StorageResult<Goal> {
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: goal.user_id,
            name: goal.name,
            target_cents: goal.target_cents,
            current_cents: 0,
            deadline: goal.deadline,
            version: 0,
            created_at: Utc::now(),
        };

        self.tables.write().await.goals.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn get_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<Goal> {
        self.tables
            .read()
            .await
            .goals
            .get(&id)
            .filter(|goal| goal.user_id == owner)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_goals(&self, owner: Uuid) -> StorageResult<Vec<Goal>> {
        let tables = self.tables.read().await;
        let mut goals: Vec<Goal> = tables
            .goals
            .values()
            .filter(|goal| goal.user_id == owner)
            .cloned()
            .collect();

        goals.sort_by(|a, b| match (a.deadline, b.deadline) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.created_at.cmp(&b.created_at),
        });
        Ok(goals)
    }

    async fn update_goal_amount(
        &self,
        id: Uuid,
        current_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Goal> {
        let mut tables = self.tables.write().await;
        let goal = tables.goals.get_mut(&id).ok_or(StorageError::NotFound)?;

        if goal.version != expected_version {
            return Err(StorageError::Conflict);
        }

        goal.current_cents = current_cents;
        goal.version += 1;
        Ok(goal.clone())
    }

    async fn delete_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .goals
            .get(&id)
            .is_some_and(|goal| goal.user_id == owner);
        if !owned {
            return Err(StorageError::NotFound);
        }

        tables.goals.remove(&id);
        Ok(())
    }
}
