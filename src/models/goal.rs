//! Savings goal data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::capped_percentage;

/// Represents a savings goal record from the store.
///
/// `current_cents` only ever grows and never passes `target_cents`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_cents: i64,
    pub current_cents: i64,
    pub deadline: Option<NaiveDate>,

    /// Compare-and-swap token, bumped by every progress write
    pub version: i64,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub user_id: Uuid,
    pub name: String,
    pub target_cents: i64,
    pub deadline: Option<NaiveDate>,
}

/// Request body for creating a goal.
///
/// ```json
/// { "name": "Holiday", "target_cents": 50000, "deadline": "2026-07-01" }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGoalRequest {
    pub name: String,
    pub target_cents: i64,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddFundsRequest {
    pub amount_cents: i64,
}

/// A goal enriched with how far along it is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    #[serde(flatten)]
    pub goal: Goal,

    pub percentage: f64,

    /// `max(target - current, 0)`
    pub remaining_cents: i64,
}

impl From<Goal> for GoalProgress {
    fn from(goal: Goal) -> Self {
        let percentage = capped_percentage(goal.current_cents, goal.target_cents);
        let remaining_cents = (goal.target_cents - goal.current_cents).max(0);
        Self {
            goal,
            percentage,
            remaining_cents,
        }
    }
}

/// Response body for goal endpoints.
///
/// Drops the owner id and the version token.
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    pub id: Uuid,
    pub name: String,
    pub target_cents: i64,
    pub current_cents: i64,
    pub deadline: Option<NaiveDate>,
    pub percentage: f64,
    pub remaining_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl From<GoalProgress> for GoalResponse {
    fn from(progress: GoalProgress) -> Self {
        let GoalProgress {
            goal,
            percentage,
            remaining_cents,
        } = progress;

        Self {
            id: goal.id,
            name: goal.name,
            target_cents: goal.target_cents,
            current_cents: goal.current_cents,
            deadline: goal.deadline,
            percentage,
            remaining_cents,
            created_at: goal.created_at,
        }
    }
}

impl From<Goal> for GoalResponse {
    fn from(goal: Goal) -> Self {
        GoalProgress::from(goal).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_reports_progress_without_internal_fields() {
        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Bike".to_string(),
            target_cents: 50_000,
            current_cents: 45_000,
            deadline: None,
            version: 7,
            created_at: Utc::now(),
        };

        let body = serde_json::to_value(GoalResponse::from(goal)).unwrap();

        assert_eq!(body["percentage"], 90.0);
        assert_eq!(body["remaining_cents"], 5_000);
        assert!(body.get("user_id").is_none());
        assert!(body.get("version").is_none());
    }
}
