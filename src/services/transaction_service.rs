//! Transaction engine - records income and expenses and keeps balances in
//! step with them.
//!
//! This service handles:
//! - Validation and ownership checks
//! - Budget admission for expenses
//! - Recording the transaction and applying its balance delta
//! - Reversing the delta when a transaction is deleted
//!
//! # Consistency
//!
//! The store has no multi-statement transactions, so creation is an ordered
//! sequence of independent calls:
//!
//! 1. Validate
//! 2. Authorize (resolve the owned account)
//! 3. Admit (balance stays in range; for expenses also the overdraft rule
//!    and the budget)
//! 4. Persist the transaction record
//! 5. Apply the balance delta through the ledger
//! 6. Return the record
//!
//! Anything rejected in steps 1-3 leaves no trace. If step 5 fails after
//! step 4 succeeded, the record exists without its balance effect. That
//! window is logged at error level with both ids; the ledger's
//! reconciliation sweep recomputes the balance from the transaction log.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{AccountService, BudgetService, not_found_as};
use crate::{
    error::AppError,
    models::{
        MAX_AMOUNT_CENTS, UnknownVariant,
        transaction::{
            CreateTransactionRequest, NewTransaction, Transaction, TransactionFilter,
            TransactionKind,
        },
    },
    storage::Storage,
};

#[derive(Clone)]
pub struct TransactionService {
    storage: Arc<dyn Storage>,
    accounts: AccountService,
    budgets: BudgetService,
}

impl TransactionService {
    pub fn new(storage: Arc<dyn Storage>, accounts: AccountService, budgets: BudgetService) -> Self {
        Self {
            storage,
            accounts,
            budgets,
        }
    }

    /// Record a transaction and apply it to the account balance.
    ///
    /// # Errors
    ///
    /// - `InvalidTransaction`: unknown kind, amount not in
    ///   `1..=MAX_AMOUNT_CENTS`, empty category, or a balance that would
    ///   leave the money range
    /// - `AccountNotFound`: account missing or owned by someone else
    /// - `InsufficientFunds`: expense would overdraw a saving or investment
    ///   account
    /// - `BudgetExceeded`: expense would pass the category's monthly limit
    /// - `Storage`: the record could not be written
    /// - `LedgerWriteFailed` / `ConcurrencyConflict`: the record was written
    ///   but its balance effect was not applied
    pub async fn create_transaction(
        &self,
        user_id: Uuid,
        request: CreateTransactionRequest,
    ) -> Result<Transaction, AppError> {
        // Validate
        let kind: TransactionKind = request
            .kind
            .parse()
            .map_err(|error: UnknownVariant| AppError::InvalidTransaction(error.to_string()))?;

        if request.amount_cents <= 0 {
            return Err(AppError::InvalidTransaction(
                "Amount must be greater than zero".to_string(),
            ));
        }
        if request.amount_cents > MAX_AMOUNT_CENTS {
            return Err(AppError::InvalidTransaction(format!(
                "Amount cannot exceed {MAX_AMOUNT_CENTS}"
            )));
        }

        let category = request.category.trim().to_string();
        if category.is_empty() {
            return Err(AppError::InvalidTransaction(
                "Category cannot be empty".to_string(),
            ));
        }

        // Authorize
        let account = self.accounts.get_account(user_id, request.account_id).await?;

        // Admit
        if account
            .balance_cents
            .checked_add(kind.delta(request.amount_cents))
            .is_none()
        {
            return Err(AppError::InvalidTransaction(
                "Balance would overflow".to_string(),
            ));
        }

        if kind == TransactionKind::Expense {
            if !account.kind.allows_negative_balance()
                && account.balance_cents < request.amount_cents
            {
                return Err(AppError::InsufficientFunds);
            }

            self.budgets
                .check_admission(user_id, &category, request.amount_cents)
                .await?;
        }

        // Persist
        let transaction = self
            .storage
            .insert_transaction(NewTransaction {
                account_id: account.id,
                amount_cents: request.amount_cents,
                kind,
                category,
                description: request
                    .description
                    .map(|description| description.trim().to_string())
                    .filter(|description| !description.is_empty()),
                occurred_at: Utc::now(),
            })
            .await?;

        // Apply
        let balance_cents = self
            .accounts
            .apply_delta(user_id, account.id, transaction.signed_amount())
            .await
            .inspect_err(|error| {
                tracing::error!(
                    transaction_id = %transaction.id,
                    account_id = %account.id,
                    %error,
                    "transaction recorded but balance not updated; account needs reconciliation"
                );
            })?;

        tracing::info!(
            transaction_id = %transaction.id,
            account_id = %account.id,
            kind = %transaction.kind,
            amount_cents = transaction.amount_cents,
            balance_cents,
            "transaction recorded"
        );

        Ok(transaction)
    }

    /// Fetch one transaction the caller owns.
    ///
    /// # Errors
    ///
    /// - `TransactionNotFound`: no such transaction
    /// - `Unauthorized`: it belongs to another user's account
    pub async fn get_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, AppError> {
        let transaction = self
            .storage
            .get_transaction(transaction_id)
            .await
            .map_err(not_found_as(AppError::TransactionNotFound))?;

        match self.accounts.get_account(user_id, transaction.account_id).await {
            Ok(_) => Ok(transaction),
            Err(AppError::AccountNotFound) => Err(AppError::Unauthorized),
            Err(error) => Err(error),
        }
    }

    /// Delete a transaction and reverse its balance effect.
    ///
    /// The record goes first. If two callers race to delete the same
    /// transaction only one delete succeeds, so the reversal is applied once.
    pub async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<(), AppError> {
        let transaction = self.get_transaction(user_id, transaction_id).await?;
        let reversal_cents = -transaction.signed_amount();

        self.storage
            .delete_transaction(transaction.id)
            .await
            .map_err(not_found_as(AppError::TransactionNotFound))?;

        let balance_cents = self
            .accounts
            .apply_delta(user_id, transaction.account_id, reversal_cents)
            .await
            .inspect_err(|error| {
                tracing::error!(
                    transaction_id = %transaction.id,
                    account_id = %transaction.account_id,
                    %error,
                    "transaction deleted but balance not reversed; account needs reconciliation"
                );
            })?;

        tracing::info!(
            transaction_id = %transaction.id,
            account_id = %transaction.account_id,
            reversal_cents,
            balance_cents,
            "transaction deleted"
        );
        Ok(())
    }

    /// Transactions newest first, for one account or across all of the
    /// caller's accounts.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: `account_id` is not one of the caller's accounts
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        account_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>, AppError> {
        let account_ids = match account_id {
            Some(account_id) => match self.accounts.get_account(user_id, account_id).await {
                Ok(account) => vec![account.id],
                Err(AppError::AccountNotFound) => return Err(AppError::Unauthorized),
                Err(error) => return Err(error),
            },
            None => self
                .accounts
                .list_accounts(user_id)
                .await?
                .into_iter()
                .map(|account| account.id)
                .collect(),
        };

        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .storage
            .query_transactions(&TransactionFilter::for_accounts(account_ids))
            .await?)
    }
}
