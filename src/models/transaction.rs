//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: stored income or expense record owned by one account
//! - `TransactionKind`: income or expense, and its balance delta
//! - `TransactionFilter`: the range query the engine runs against the store
//! - `CreateTransactionRequest` / `TransactionResponse`

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Balance delta for an amount of this kind: `+amount` for income,
    /// `-amount` for expense.
    pub fn delta(self, amount_cents: i64) -> i64 {
        match self {
            TransactionKind::Income => amount_cents,
            TransactionKind::Expense => -amount_cents,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            _ => Err(UnknownVariant {
                kind: "transaction kind",
                value: value.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents a transaction record from the store.
///
/// # Ownership
///
/// A transaction belongs to exactly one account. Accounts hold no list of
/// their transactions; the set is rebuilt by querying on `account_id`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: Uuid,

    /// Account whose balance reflects this transaction
    pub account_id: Uuid,

    /// Amount in cents, always positive; the sign comes from `kind`
    pub amount_cents: i64,

    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,

    /// Category as entered (case preserved for display)
    pub category: String,

    pub description: Option<String>,

    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed effect of this transaction on its account's balance.
    pub fn signed_amount(&self) -> i64 {
        self.kind.delta(self.amount_cents)
    }
}

/// Fields supplied when inserting a new transaction.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Range query over stored transactions.
///
/// Results always come back newest first (by `occurred_at`).
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Only transactions on these accounts; an empty list matches nothing
    pub account_ids: Vec<Uuid>,

    pub kind: Option<TransactionKind>,

    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,

    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn for_accounts(account_ids: Vec<Uuid>) -> Self {
        Self {
            account_ids,
            ..Self::default()
        }
    }

    /// Whether a single transaction satisfies this filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.account_ids.contains(&transaction.account_id)
            && self.kind.is_none_or(|kind| kind == transaction.kind)
            && self.from.is_none_or(|from| transaction.occurred_at >= from)
            && self.until.is_none_or(|until| transaction.occurred_at < until)
    }
}

/// Request body for creating a transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "account_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 3000,
///   "kind": "expense",
///   "category": "Food",
///   "description": "Weekly shop"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub account_id: Uuid,

    pub amount_cents: i64,

    /// `income` or `expense`, any case
    pub kind: String,

    pub category: String,

    pub description: Option<String>,
}

/// Query string accepted by the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub account_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            account_id: transaction.account_id,
            amount_cents: transaction.amount_cents,
            kind: transaction.kind,
            category: transaction.category,
            description: transaction.description,
            occurred_at: transaction.occurred_at,
        }
    }
}
