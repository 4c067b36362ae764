//! Budget data models.
//!
//! A budget caps the expenses a user may record in one category during one
//! calendar month. How much has been spent is never stored; it is summed
//! from the transaction log whenever it is needed.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capped_percentage;

/// Represents a budget record from the store.
///
/// Unique per `(user_id, category, month, year)`, with the category compared
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub limit_cents: i64,
    pub month: i32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBudget {
    pub user_id: Uuid,
    pub category: String,
    pub limit_cents: i64,
    pub month: i32,
    pub year: i32,
}

/// Query over stored budgets. Results are ordered by category.
#[derive(Debug, Clone)]
pub struct BudgetFilter {
    pub user_id: Uuid,

    /// Matched case-insensitively when present
    pub category: Option<String>,

    pub period: BudgetPeriod,
}

/// A calendar month in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetPeriod {
    pub month: i32,
    pub year: i32,
}

impl BudgetPeriod {
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            month: at.month() as i32,
            year: at.year(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// Half-open `[start, end)` range covering the whole month, or `None`
    /// for a month that does not exist.
    pub fn bounds(self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };

        let start = first_of_month(self.year, self.month)?;
        let end = first_of_month(next_year, next_month)?;
        Some((start, end))
    }
}

fn first_of_month(year: i32, month: i32) -> Option<DateTime<Utc>> {
    let month = u32::try_from(month).ok()?;
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Request body for creating a budget in the current month.
///
/// ```json
/// { "category": "Food", "limit_cents": 40000 }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBudgetRequest {
    pub category: String,
    pub limit_cents: i64,
}

/// A budget together with what has been spent against it this month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    #[serde(flatten)]
    pub budget: Budget,

    pub spent_cents: i64,

    /// `min(spent / limit, 1) * 100`, one decimal place
    pub percentage: f64,
}

impl BudgetUsage {
    pub fn new(budget: Budget, spent_cents: i64) -> Self {
        let percentage = capped_percentage(spent_cents, budget.limit_cents);
        Self {
            budget,
            spent_cents,
            percentage,
        }
    }
}

/// Response body for a budget. Drops the owner id.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    pub id: Uuid,
    pub category: String,
    pub limit_cents: i64,
    pub month: i32,
    pub year: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Budget> for BudgetResponse {
    fn from(budget: Budget) -> Self {
        Self {
            id: budget.id,
            category: budget.category,
            limit_cents: budget.limit_cents,
            month: budget.month,
            year: budget.year,
            created_at: budget.created_at,
        }
    }
}

/// Response body for the budget listing.
#[derive(Debug, Serialize)]
pub struct BudgetUsageResponse {
    #[serde(flatten)]
    pub budget: BudgetResponse,

    pub spent_cents: i64,
    pub percentage: f64,
}

impl From<BudgetUsage> for BudgetUsageResponse {
    fn from(usage: BudgetUsage) -> Self {
        Self {
            budget: usage.budget.into(),
            spent_cents: usage.spent_cents,
            percentage: usage.percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn december_rolls_into_next_year() {
        let (start, end) = BudgetPeriod {
            month: 12,
            year: 2025,
        }
        .bounds()
        .unwrap();

        assert_eq!(start.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn invalid_month_has_no_bounds() {
        assert!(BudgetPeriod { month: 13, year: 2025 }.bounds().is_none());
    }
}
