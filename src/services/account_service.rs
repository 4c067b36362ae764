//! Account ledger - owns account balances.
//!
//! This service handles:
//! - Account creation, lookup, renaming and deletion
//! - Applying balance deltas with compare-and-swap writes
//! - Recomputing balances from the transaction log
//!
//! # Concurrency
//!
//! The store offers no row locks across calls. A balance write carries the
//! version read alongside the balance; if another writer got there first the
//! store answers `Conflict`, and the delta is re-applied to a fresh read, up
//! to the configured number of attempts.

use std::sync::Arc;

use uuid::Uuid;

use super::not_found_as;
use crate::{
    error::AppError,
    models::{
        MAX_AMOUNT_CENTS, UnknownVariant, checked_sum,
        account::{Account, AccountKind, CreateAccountRequest, NewAccount, Reconciliation},
        transaction::{Transaction, TransactionFilter},
    },
    storage::{Storage, StorageError},
};

#[derive(Clone)]
pub struct AccountService {
    storage: Arc<dyn Storage>,
    retry_limit: u32,
}

impl AccountService {
    pub fn new(storage: Arc<dyn Storage>, retry_limit: u32) -> Self {
        Self {
            storage,
            retry_limit: retry_limit.max(1),
        }
    }

    /// Create an account for `user_id`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: empty name, unknown kind or negative opening balance
    pub async fn create_account(
        &self,
        user_id: Uuid,
        request: CreateAccountRequest,
    ) -> Result<Account, AppError> {
        let name = validate_name(&request.name)?;

        let kind: AccountKind = request
            .kind
            .parse()
            .map_err(|error: UnknownVariant| AppError::InvalidRequest(error.to_string()))?;

        if request.opening_balance_cents < 0 {
            return Err(AppError::InvalidRequest(
                "Opening balance cannot be negative".to_string(),
            ));
        }
        if request.opening_balance_cents > MAX_AMOUNT_CENTS {
            return Err(AppError::InvalidRequest(format!(
                "Opening balance cannot exceed {MAX_AMOUNT_CENTS}"
            )));
        }

        let account = self
            .storage
            .insert_account(NewAccount {
                user_id,
                name,
                kind,
                opening_balance_cents: request.opening_balance_cents,
            })
            .await?;

        tracing::info!(account_id = %account.id, kind = %account.kind, "account created");
        Ok(account)
    }

    /// Ownership-scoped lookup.
    ///
    /// A missing id and another user's account both come back as
    /// `AccountNotFound`.
    pub async fn get_account(&self, user_id: Uuid, account_id: Uuid) -> Result<Account, AppError> {
        self.storage
            .get_account(account_id, user_id)
            .await
            .map_err(not_found_as(AppError::AccountNotFound))
    }

    pub async fn list_accounts(&self, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        Ok(self.storage.list_accounts(user_id).await?)
    }

    pub async fn rename_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        name: &str,
    ) -> Result<Account, AppError> {
        let name = validate_name(name)?;

        self.storage
            .rename_account(account_id, user_id, &name)
            .await
            .map_err(not_found_as(AppError::AccountNotFound))
    }

    /// Delete an account and, with it, its transactions.
    pub async fn delete_account(&self, user_id: Uuid, account_id: Uuid) -> Result<(), AppError> {
        self.storage
            .delete_account(account_id, user_id)
            .await
            .map_err(not_found_as(AppError::AccountNotFound))?;

        tracing::info!(%account_id, "account deleted");
        Ok(())
    }

    /// Add `delta_cents` to the account balance and return the new balance.
    ///
    /// # Process
    ///
    /// 1. Read the account (owner scoped) with its version
    /// 2. Compute the new balance
    /// 3. Write it only if the version is unchanged
    /// 4. On a version conflict, start again from 1
    ///
    /// # Errors
    ///
    /// - `AccountNotFound`: account missing or owned by someone else
    /// - `ConcurrencyConflict`: every attempt lost the race
    /// - `LedgerWriteFailed`: the store failed the write, or the new balance
    ///   would leave the `i64` range; not retried
    pub async fn apply_delta(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        delta_cents: i64,
    ) -> Result<i64, AppError> {
        for attempt in 1..=self.retry_limit {
            let account = self.get_account(user_id, account_id).await?;

            // Admission rules this out for new transactions; reaching it
            // means the record is already stored.
            let balance_cents = account.balance_cents.checked_add(delta_cents).ok_or_else(|| {
                AppError::LedgerWriteFailed(StorageError::failure(
                    "apply_delta",
                    "balance would overflow",
                ))
            })?;

            match self
                .storage
                .update_account_balance(account.id, balance_cents, account.version)
                .await
            {
                Ok(updated) => {
                    tracing::debug!(
                        %account_id,
                        delta_cents,
                        balance_cents = updated.balance_cents,
                        attempt,
                        "balance updated"
                    );
                    return Ok(updated.balance_cents);
                }
                Err(StorageError::Conflict) => {
                    tracing::warn!(%account_id, attempt, "balance changed since read, retrying");
                }
                Err(StorageError::NotFound) => return Err(AppError::AccountNotFound),
                Err(error) => return Err(AppError::LedgerWriteFailed(error)),
            }
        }

        Err(AppError::ConcurrencyConflict {
            attempts: self.retry_limit,
        })
    }

    /// Recompute the balance from the transaction log and repair any drift.
    ///
    /// The expected balance is the opening balance plus every live signed
    /// amount. Run this while no transaction for the account is between
    /// being recorded and having its delta applied; otherwise that delta is
    /// counted here and again when it lands.
    pub async fn reconcile_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> Result<Reconciliation, AppError> {
        for attempt in 1..=self.retry_limit {
            let account = self.get_account(user_id, account_id).await?;

            let transactions = self
                .storage
                .query_transactions(&TransactionFilter::for_accounts(vec![account.id]))
                .await?;
            let expected_balance_cents = checked_sum(
                std::iter::once(account.opening_balance_cents)
                    .chain(transactions.iter().map(Transaction::signed_amount)),
            )
            .ok_or(AppError::AmountOverflow)?;
            let drift_cents = expected_balance_cents
                .checked_sub(account.balance_cents)
                .ok_or(AppError::AmountOverflow)?;

            let reconciliation = Reconciliation {
                account_id,
                previous_balance_cents: account.balance_cents,
                expected_balance_cents,
                drift_cents,
            };

            if reconciliation.drift_cents == 0 {
                return Ok(reconciliation);
            }

            match self
                .storage
                .update_account_balance(account.id, expected_balance_cents, account.version)
                .await
            {
                Ok(_) => {
                    tracing::warn!(
                        %account_id,
                        drift_cents = reconciliation.drift_cents,
                        "balance drift repaired"
                    );
                    return Ok(reconciliation);
                }
                Err(StorageError::Conflict) => {
                    tracing::warn!(%account_id, attempt, "balance changed during reconciliation, retrying");
                }
                Err(StorageError::NotFound) => return Err(AppError::AccountNotFound),
                Err(error) => return Err(AppError::LedgerWriteFailed(error)),
            }
        }

        Err(AppError::ConcurrencyConflict {
            attempts: self.retry_limit,
        })
    }
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest(
            "Account name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{FlakyStorage, create_account};
    use crate::storage::MemoryStorage;

    fn service(storage: Arc<dyn Storage>) -> AccountService {
        AccountService::new(storage, 3)
    }

    #[tokio::test]
    async fn create_rejects_bad_input() {
        let accounts = service(Arc::new(MemoryStorage::new()));
        let user_id = Uuid::new_v4();

        let blank = CreateAccountRequest {
            name: "   ".to_string(),
            kind: "saving".to_string(),
            opening_balance_cents: 0,
        };
        assert!(matches!(
            accounts.create_account(user_id, blank).await,
            Err(AppError::InvalidRequest(_))
        ));

        let unknown_kind = CreateAccountRequest {
            name: "Pot".to_string(),
            kind: "checking".to_string(),
            opening_balance_cents: 0,
        };
        assert!(matches!(
            accounts.create_account(user_id, unknown_kind).await,
            Err(AppError::InvalidRequest(_))
        ));

        let negative = CreateAccountRequest {
            name: "Pot".to_string(),
            kind: "Saving".to_string(),
            opening_balance_cents: -1,
        };
        assert!(matches!(
            accounts.create_account(user_id, negative).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn other_users_account_is_not_found() {
        let accounts = service(Arc::new(MemoryStorage::new()));
        let account = create_account(&accounts, Uuid::new_v4(), "current", 100).await;

        let result = accounts.get_account(Uuid::new_v4(), account.id).await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));

        let result = accounts.apply_delta(Uuid::new_v4(), account.id, 50).await;
        assert!(matches!(result, Err(AppError::AccountNotFound)));
    }

    #[tokio::test]
    async fn apply_delta_retries_after_conflict() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 10_000).await;

        storage.conflict_next_balance_writes(2);
        let balance = accounts.apply_delta(user_id, account.id, -2_500).await.unwrap();

        assert_eq!(balance, 7_500);
        assert_eq!(storage.balance_write_attempts(), 3);
    }

    #[tokio::test]
    async fn apply_delta_gives_up_after_retry_limit() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 10_000).await;

        storage.conflict_next_balance_writes(3);
        let result = accounts.apply_delta(user_id, account.id, 100).await;

        assert!(matches!(
            result,
            Err(AppError::ConcurrencyConflict { attempts: 3 })
        ));
        let unchanged = accounts.get_account(user_id, account.id).await.unwrap();
        assert_eq!(unchanged.balance_cents, 10_000);
    }

    #[tokio::test]
    async fn write_failure_is_reported_without_retry() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 0).await;

        storage.fail_balance_writes(true);
        let result = accounts.apply_delta(user_id, account.id, 100).await;

        assert!(matches!(result, Err(AppError::LedgerWriteFailed(_))));
        assert_eq!(storage.balance_write_attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deltas_are_not_lost() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        // Each lost race means another write landed, so 20 writers can lose at most 19 times.
        let accounts = AccountService::new(storage, 20);
        let user_id = Uuid::new_v4();
        let account_id = create_account(&accounts, user_id, "current", 0).await.id;

        let handles: Vec<_> = (1..=20)
            .map(|n| {
                let accounts = accounts.clone();
                tokio::spawn(async move { accounts.apply_delta(user_id, account_id, n * 100).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let account = accounts.get_account(user_id, account_id).await.unwrap();
        assert_eq!(account.balance_cents, (1..=20).sum::<i64>() * 100);
    }

    #[tokio::test]
    async fn reconcile_repairs_drift() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 1_000).await;
        storage.record_income(account.id, 400).await;

        let report = accounts.reconcile_account(user_id, account.id).await.unwrap();
        assert_eq!(report.previous_balance_cents, 1_000);
        assert_eq!(report.expected_balance_cents, 1_400);
        assert_eq!(report.drift_cents, 400);

        let account = accounts.get_account(user_id, account.id).await.unwrap();
        assert_eq!(account.balance_cents, 1_400);

        let again = accounts.reconcile_account(user_id, account.id).await.unwrap();
        assert_eq!(again.drift_cents, 0);
    }

    #[tokio::test]
    async fn balance_overflow_after_persist_is_a_write_failure() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 0).await;
        storage
            .update_account_balance(account.id, i64::MAX, account.version)
            .await
            .unwrap();

        let result = accounts.apply_delta(user_id, account.id, 1).await;

        assert!(matches!(result, Err(AppError::LedgerWriteFailed(_))));
        let unchanged = accounts.get_account(user_id, account.id).await.unwrap();
        assert_eq!(unchanged.balance_cents, i64::MAX);
    }

    #[tokio::test]
    async fn reconcile_reports_overflowing_log_instead_of_panicking() {
        let storage = Arc::new(FlakyStorage::new());
        let accounts = service(storage.clone());
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "current", 0).await;
        storage.record_income(account.id, i64::MAX).await;
        storage.record_income(account.id, 1).await;

        let result = accounts.reconcile_account(user_id, account.id).await;

        assert!(matches!(result, Err(AppError::AmountOverflow)));
    }

    #[tokio::test]
    async fn opening_balance_is_capped() {
        let accounts = service(Arc::new(MemoryStorage::new()));
        let request = CreateAccountRequest {
            name: "Vault".to_string(),
            kind: "saving".to_string(),
            opening_balance_cents: MAX_AMOUNT_CENTS + 1,
        };

        let result = accounts.create_account(Uuid::new_v4(), request).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn rename_trims_and_validates() {
        let accounts = service(Arc::new(MemoryStorage::new()));
        let user_id = Uuid::new_v4();
        let account = create_account(&accounts, user_id, "saving", 0).await;

        let renamed = accounts
            .rename_account(user_id, account.id, "  Rainy day  ")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Rainy day");

        let result = accounts.rename_account(user_id, account.id, "").await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
