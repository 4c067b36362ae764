//! Data models representing stored entities and the request/response types
//! built around them.
//!
//! Money is always carried as `i64` minor units (cents). Nothing in the
//! balance path ever rounds, so applying a delta and then its reversal lands
//! on exactly the starting value.

/// Account model and overdraft policy
pub mod account;
/// Monthly per-category budgets
pub mod budget;
/// Savings goals
pub mod goal;
/// Income and expense transactions
pub mod transaction;

/// Largest single amount accepted from a caller: one trillion in major units.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000_000;

/// Sum of `amounts`, or `None` if it leaves the `i64` range.
pub fn checked_sum(amounts: impl IntoIterator<Item = i64>) -> Option<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |total, amount| total.checked_add(amount))
}

/// Error returned when a stored or submitted enum label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// `part / whole` as a percentage capped at 100, rounded to one decimal.
///
/// A zero or negative `whole` yields 0 rather than dividing by zero.
pub fn capped_percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }

    let ratio = (part.max(0) as f64 / whole as f64).min(1.0);
    (ratio * 1000.0).round() / 10.0
}

/// Case-folded form of a category used for every comparison.
pub fn fold_category(category: &str) -> String {
    category.trim().to_lowercase()
}
