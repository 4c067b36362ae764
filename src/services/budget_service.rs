//! Budget tracker - monthly per-category spending caps.
//!
//! Spend is never stored. Every admission check and every usage listing sums
//! the user's expense transactions for the month again, so deleted or
//! back-filled transactions are reflected immediately.
//!
//! # Known race
//!
//! Admission and the transaction insert that follows it are separate store
//! calls. Two expenses admitted at the same moment can together exceed the
//! limit; the next check sees the true total.

use std::{collections::HashMap, sync::Arc};

use uuid::Uuid;

use super::not_found_as;
use crate::{
    error::AppError,
    models::{
        budget::{Budget, BudgetFilter, BudgetPeriod, BudgetUsage, CreateBudgetRequest, NewBudget},
        fold_category,
        transaction::{TransactionFilter, TransactionKind},
    },
    storage::{Storage, StorageError},
};

#[derive(Clone)]
pub struct BudgetService {
    storage: Arc<dyn Storage>,
}

impl BudgetService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create a budget for the current month.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty category or non-positive limit
    /// - `DuplicateBudget`: the category already has a budget this month;
    ///   the existing one is left untouched
    pub async fn create_budget(
        &self,
        user_id: Uuid,
        request: CreateBudgetRequest,
    ) -> Result<Budget, AppError> {
        let category = request.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::InvalidRequest(
                "Category cannot be empty".to_string(),
            ));
        }
        if request.limit_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Limit must be greater than zero".to_string(),
            ));
        }

        let period = BudgetPeriod::current();
        let duplicate = || AppError::DuplicateBudget {
            category: category.clone(),
            month: period.month,
            year: period.year,
        };

        if self.find(user_id, &category, period).await?.is_some() {
            return Err(duplicate());
        }

        // A concurrent create can still win between the lookup and the
        // insert; the store's unique key turns that into a conflict.
        let budget = self
            .storage
            .insert_budget(NewBudget {
                user_id,
                category: category.clone(),
                limit_cents: request.limit_cents,
                month: period.month,
                year: period.year,
            })
            .await
            .map_err(|error| match error {
                StorageError::Conflict => duplicate(),
                other => AppError::Storage(other),
            })?;

        tracing::info!(budget_id = %budget.id, category = %budget.category, "budget created");
        Ok(budget)
    }

    /// Budgets of the current month, ordered by category.
    pub async fn list_budgets(&self, user_id: Uuid) -> Result<Vec<Budget>, AppError> {
        let filter = BudgetFilter {
            user_id,
            category: None,
            period: BudgetPeriod::current(),
        };
        Ok(self.storage.query_budgets(&filter).await?)
    }

    pub async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<(), AppError> {
        self.storage
            .delete_budget(budget_id, user_id)
            .await
            .map_err(not_found_as(AppError::BudgetNotFound))?;

        tracing::info!(%budget_id, "budget deleted");
        Ok(())
    }

    /// Decide whether an expense of `amount_cents` in `category` may be
    /// recorded this month.
    ///
    /// No budget for the category means no limit.
    ///
    /// # Errors
    ///
    /// - `BudgetExceeded`: `spent + amount > limit`, carrying all three figures
    pub async fn check_admission(
        &self,
        user_id: Uuid,
        category: &str,
        amount_cents: i64,
    ) -> Result<(), AppError> {
        let period = BudgetPeriod::current();
        let Some(budget) = self.find(user_id, category, period).await? else {
            return Ok(());
        };

        let spent_cents = self
            .monthly_expenses(user_id, period)
            .await?
            .get(&fold_category(category))
            .copied()
            .unwrap_or(0);

        if spent_cents.saturating_add(amount_cents) > budget.limit_cents {
            tracing::warn!(
                budget_id = %budget.id,
                limit_cents = budget.limit_cents,
                spent_cents,
                attempted_cents = amount_cents,
                "expense rejected by budget"
            );
            return Err(AppError::BudgetExceeded {
                limit_cents: budget.limit_cents,
                spent_cents,
                attempted_cents: amount_cents,
            });
        }

        Ok(())
    }

    /// Current-month budgets with what has been spent against each.
    pub async fn with_spent(&self, user_id: Uuid) -> Result<Vec<BudgetUsage>, AppError> {
        let budgets = self.list_budgets(user_id).await?;
        if budgets.is_empty() {
            return Ok(Vec::new());
        }

        let spent = self
            .monthly_expenses(user_id, BudgetPeriod::current())
            .await?;

        Ok(budgets
            .into_iter()
            .map(|budget| {
                let spent_cents = spent
                    .get(&fold_category(&budget.category))
                    .copied()
                    .unwrap_or(0);
                BudgetUsage::new(budget, spent_cents)
            })
            .collect())
    }

    async fn find(
        &self,
        user_id: Uuid,
        category: &str,
        period: BudgetPeriod,
    ) -> Result<Option<Budget>, AppError> {
        let filter = BudgetFilter {
            user_id,
            category: Some(category.to_string()),
            period,
        };
        Ok(self.storage.query_budgets(&filter).await?.into_iter().next())
    }

    /// Expense totals for the month across all the user's accounts, keyed by
    /// case-folded category.
    async fn monthly_expenses(
        &self,
        user_id: Uuid,
        period: BudgetPeriod,
    ) -> Result<HashMap<String, i64>, AppError> {
        let (from, until) = period.bounds().ok_or_else(|| {
            AppError::InvalidRequest(format!("Invalid budget period {}/{}", period.month, period.year))
        })?;

        let account_ids: Vec<Uuid> = self
            .storage
            .list_accounts(user_id)
            .await?
            .into_iter()
            .map(|account| account.id)
            .collect();
        if account_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = TransactionFilter {
            account_ids,
            kind: Some(TransactionKind::Expense),
            from: Some(from),
            until: Some(until),
        };

        let mut totals = HashMap::new();
        for transaction in self.storage.query_transactions(&filter).await? {
            let total: &mut i64 = totals.entry(fold_category(&transaction.category)).or_insert(0);
            *total = total
                .checked_add(transaction.amount_cents)
                .ok_or(AppError::AmountOverflow)?;
        }
        Ok(totals)
    }
}
