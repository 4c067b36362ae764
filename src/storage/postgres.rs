//! PostgreSQL storage adapter.
//!
//! Every method is a single statement, so the adapter adds no atomicity the
//! contract does not promise. Compare-and-swap writes filter on the stored
//! `version` and tell a lost race apart from a missing row with a follow-up
//! existence check.

use async_trait::async_trait;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::{
    db::DbPool,
    models::{
        account::{Account, NewAccount},
        budget::{Budget, BudgetFilter, NewBudget},
        goal::{Goal, NewGoal},
        transaction::{NewTransaction, Transaction, TransactionFilter},
    },
};

#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Resolves a CAS miss: the row is either gone or was written by
    /// somebody else since it was read.
    async fn missing_or_conflict(&self, table: &'static str, id: Uuid) -> StorageError {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = $1)");
        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(true) => StorageError::Conflict,
            Ok(false) => StorageError::NotFound,
            Err(error) => failed("check_exists")(error),
        }
    }
}

/// Maps a sqlx error onto the adapter's result type.
///
/// Unique-key violations surface as [`StorageError::Conflict`] so callers can
/// report them as duplicates.
fn failed(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StorageError {
    move |error| match error {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StorageError::Conflict,
        other => StorageError::failure(operation, other),
    }
}

/// Turns "zero rows affected" into `NotFound`.
fn expect_one(rows_affected: u64) -> StorageResult<()> {
    if rows_affected == 0 {
        Err(StorageError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(failed("ping"))?;
        Ok(())
    }

    async fn insert_account(&self, account: NewAccount) -> StorageResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (user_id, name, kind, opening_balance_cents, balance_cents)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING *
            "#,
        )
        .bind(account.user_id)
        .bind(account.name)
        .bind(account.kind.as_str())
        .bind(account.opening_balance_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("insert_account"))
    }

    async fn get_account(&self, id: Uuid, owner: Uuid) -> StorageResult<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(failed("get_account"))?
            .ok_or(StorageError::NotFound)
    }

    async fn list_accounts(&self, owner: Uuid) -> StorageResult<Vec<Account>> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list_accounts"))
    }

    async fn rename_account(&self, id: Uuid, owner: Uuid, name: &str) -> StorageResult<Account> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET name = $1,
                updated_at = NOW()
            WHERE id = $2 AND user_id = $3
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("rename_account"))?
        .ok_or(StorageError::NotFound)
    }

    async fn update_account_balance(
        &self,
        id: Uuid,
        balance_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Account> {
        let updated = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance_cents = $1,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $2 AND version = $3
            RETURNING *
            "#,
        )
        .bind(balance_cents)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("update_account_balance"))?;

        match updated {
            Some(account) => Ok(account),
            None => Err(self.missing_or_conflict("accounts", id).await),
        }
    }

    async fn delete_account(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        // Transactions go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(failed("delete_account"))?;
        expect_one(result.rows_affected())
    }

    async fn insert_transaction(&self, transaction: NewTransaction) -> StorageResult<Transaction> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                account_id,
                amount_cents,
                kind,
                category,
                description,
                occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.amount_cents)
        .bind(transaction.kind.as_str())
        .bind(transaction.category)
        .bind(transaction.description)
        .bind(transaction.occurred_at)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("insert_transaction"))
    }

    async fn get_transaction(&self, id: Uuid) -> StorageResult<Transaction> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(failed("get_transaction"))?
            .ok_or(StorageError::NotFound)
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> StorageResult<Vec<Transaction>> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE account_id = ANY($1)
              AND ($2::TEXT IS NULL OR kind = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR occurred_at >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR occurred_at < $4)
            ORDER BY occurred_at DESC
            "#,
        )
        .bind(&filter.account_ids)
        .bind(filter.kind.map(|kind| kind.as_str()))
        .bind(filter.from)
        .bind(filter.until)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("query_transactions"))
    }

    async fn delete_transaction(&self, id: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(failed("delete_transaction"))?;
        expect_one(result.rows_affected())
    }

    async fn insert_budget(&self, budget: NewBudget) -> StorageResult<Budget> {
        sqlx::query_as::<_, Budget>(
            r#"
            INSERT INTO budgets (user_id, category, limit_cents, month, year)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(budget.user_id)
        .bind(budget.category)
        .bind(budget.limit_cents)
        .bind(budget.month)
        .bind(budget.year)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("insert_budget"))
    }

    async fn query_budgets(&self, filter: &BudgetFilter) -> StorageResult<Vec<Budget>> {
        sqlx::query_as::<_, Budget>(
            r#"
            SELECT * FROM budgets
            WHERE user_id = $1
              AND month = $2
              AND year = $3
              AND ($4::TEXT IS NULL OR LOWER(category) = LOWER(TRIM($4)))
            ORDER BY category
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.period.month)
        .bind(filter.period.year)
        .bind(filter.category.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(failed("query_budgets"))
    }

    async fn delete_budget(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM budgets WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(failed("delete_budget"))?;
        expect_one(result.rows_affected())
    }

    async fn insert_goal(&self, goal: NewGoal) -> StorageResult<Goal> {
        sqlx::query_as::<_, Goal>(
            r#"
            INSERT INTO goals (user_id, name, target_cents, deadline)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(goal.user_id)
        .bind(goal.name)
        .bind(goal.target_cents)
        .bind(goal.deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(failed("insert_goal"))
    }

    async fn get_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<Goal> {
        sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await
            .map_err(failed("get_goal"))?
            .ok_or(StorageError::NotFound)
    }

    async fn list_goals(&self, owner: Uuid) -> StorageResult<Vec<Goal>> {
        sqlx::query_as::<_, Goal>(
            r#"
            SELECT * FROM goals
            WHERE user_id = $1
            ORDER BY deadline ASC NULLS LAST, created_at ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(failed("list_goals"))
    }

    async fn update_goal_amount(
        &self,
        id: Uuid,
        current_cents: i64,
        expected_version: i64,
    ) -> StorageResult<Goal> {
        let updated = sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET current_cents = $1,
                version = version + 1
            WHERE id = $2 AND version = $3
            RETURNING *
            "#,
        )
        .bind(current_cents)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(failed("update_goal_amount"))?;

        match updated {
            Some(goal) => Ok(goal),
            None => Err(self.missing_or_conflict("goals", id).await),
        }
    }

    async fn delete_goal(&self, id: Uuid, owner: Uuid) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(failed("delete_goal"))?;
        expect_one(result.rows_affected())
    }
}
