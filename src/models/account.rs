//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Account`: stored entity carrying the cached balance
//! - `AccountKind`: saving, investment or current, and the overdraft rule
//! - `CreateAccountRequest` / `RenameAccountRequest`: request bodies
//! - `AccountResponse`: response body returned to clients

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

/// The kind of account a user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Saving,
    Investment,
    Current,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Saving => "saving",
            AccountKind::Investment => "investment",
            AccountKind::Current => "current",
        }
    }

    /// Only current accounts may carry a negative balance.
    pub fn allows_negative_balance(self) -> bool {
        matches!(self, AccountKind::Current)
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "saving" => Ok(AccountKind::Saving),
            "investment" => Ok(AccountKind::Investment),
            "current" => Ok(AccountKind::Current),
            _ => Err(UnknownVariant {
                kind: "account kind",
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AccountKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents an account record from the store.
///
/// # Balance Storage
///
/// `balance_cents` is a cache. The source of truth is
/// `opening_balance_cents` plus the signed amounts of every live
/// transaction on the account; the ledger keeps the two in step and the
/// reconciliation sweep repairs any drift.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Unique identifier for this account
    pub id: Uuid,

    /// Owner of the account
    ///
    /// Every lookup filters on this so one user can never see another's
    /// accounts.
    pub user_id: Uuid,

    /// Human-readable name for this account
    pub name: String,

    #[sqlx(try_from = "String")]
    pub kind: AccountKind,

    /// Balance the account was created with (never negative)
    pub opening_balance_cents: i64,

    /// Current cached balance in cents
    pub balance_cents: i64,

    /// Compare-and-swap token, bumped by every balance write
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when inserting a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance_cents: i64,
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "name": "Everyday",
///   "kind": "current",
///   "opening_balance_cents": 10000
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,

    /// Parsed case-insensitively so validation can report a readable error
    pub kind: String,

    /// Defaults to 0 when omitted
    #[serde(default)]
    pub opening_balance_cents: i64,
}

/// Request body for renaming an account.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameAccountRequest {
    pub name: String,
}

/// Response body for account endpoints.
///
/// Drops the owner id and the internal version token.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub opening_balance_cents: i64,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            kind: account.kind,
            opening_balance_cents: account.opening_balance_cents,
            balance_cents: account.balance_cents,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Outcome of recomputing an account balance from its transaction log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub account_id: Uuid,

    /// Balance stored before the sweep
    pub previous_balance_cents: i64,

    /// Opening balance plus every live signed amount
    pub expected_balance_cents: i64,

    /// `expected - previous`; zero when the cache was already correct
    pub drift_cents: i64,
}
