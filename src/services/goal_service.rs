//! Goal tracker - savings goal progress.
//!
//! Progress only moves up, through [`GoalService::add_funds`], and never
//! past the target. Writes use the same compare-and-swap pattern as account
//! balances.

use std::sync::Arc;

use uuid::Uuid;

use super::not_found_as;
use crate::{
    error::AppError,
    models::goal::{CreateGoalRequest, Goal, GoalProgress, NewGoal},
    storage::{Storage, StorageError},
};

#[derive(Clone)]
pub struct GoalService {
    storage: Arc<dyn Storage>,
    retry_limit: u32,
}

impl GoalService {
    pub fn new(storage: Arc<dyn Storage>, retry_limit: u32) -> Self {
        Self {
            storage,
            retry_limit: retry_limit.max(1),
        }
    }

    pub async fn create_goal(
        &self,
        user_id: Uuid,
        request: CreateGoalRequest,
    ) -> Result<Goal, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest(
                "Goal name cannot be empty".to_string(),
            ));
        }
        if request.target_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Target amount must be greater than zero".to_string(),
            ));
        }

        let goal = self
            .storage
            .insert_goal(NewGoal {
                user_id,
                name: name.to_string(),
                target_cents: request.target_cents,
                deadline: request.deadline,
            })
            .await?;

        tracing::info!(goal_id = %goal.id, target_cents = goal.target_cents, "goal created");
        Ok(goal)
    }

    /// Goals by deadline (undated last), each with its progress.
    pub async fn list_goals(&self, user_id: Uuid) -> Result<Vec<GoalProgress>, AppError> {
        let goals = self.storage.list_goals(user_id).await?;
        Ok(goals.into_iter().map(GoalProgress::from).collect())
    }

    pub async fn get_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<GoalProgress, AppError> {
        self.storage
            .get_goal(goal_id, user_id)
            .await
            .map(GoalProgress::from)
            .map_err(not_found_as(AppError::GoalNotFound))
    }

    /// Add `amount_cents` towards a goal.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest`: amount not positive
    /// - `GoalNotFound`: missing or owned by another user
    /// - `GoalOverfund`: the addition would pass the target; nothing is
    ///   written and the error carries `target - current`
    /// - `ConcurrencyConflict`: every attempt lost the race
    pub async fn add_funds(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        amount_cents: i64,
    ) -> Result<GoalProgress, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be greater than zero".to_string(),
            ));
        }

        for attempt in 1..=self.retry_limit {
            let goal = self
                .storage
                .get_goal(goal_id, user_id)
                .await
                .map_err(not_found_as(AppError::GoalNotFound))?;

            let max_addable_cents = goal.target_cents - goal.current_cents;
            if amount_cents > max_addable_cents {
                return Err(AppError::GoalOverfund { max_addable_cents });
            }

            match self
                .storage
                .update_goal_amount(goal.id, goal.current_cents + amount_cents, goal.version)
                .await
            {
                Ok(updated) => {
                    tracing::info!(
                        %goal_id,
                        amount_cents,
                        current_cents = updated.current_cents,
                        "funds added to goal"
                    );
                    return Ok(updated.into());
                }
                Err(StorageError::Conflict) => {
                    tracing::warn!(%goal_id, attempt, "goal changed since read, retrying");
                }
                Err(StorageError::NotFound) => return Err(AppError::GoalNotFound),
                Err(error) => return Err(AppError::Storage(error)),
            }
        }

        Err(AppError::ConcurrencyConflict {
            attempts: self.retry_limit,
        })
    }

    /// Remove a goal. No account is touched.
    pub async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> Result<(), AppError> {
        self.storage
            .delete_goal(goal_id, user_id)
            .await
            .map_err(not_found_as(AppError::GoalNotFound))?;

        tracing::info!(%goal_id, "goal deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::services::test_support::services;

    fn goal_request(name: &str, target_cents: i64, deadline: Option<NaiveDate>) -> CreateGoalRequest {
        CreateGoalRequest {
            name: name.to_string(),
            target_cents,
            deadline,
        }
    }

    #[tokio::test]
    async fn overfunding_reports_what_is_left_then_fills_exactly() {
        let services = services();
        let user_id = Uuid::new_v4();
        let goal = services
            .goals
            .create_goal(user_id, goal_request("Bike", 50_000, None))
            .await
            .unwrap();
        services.goals.add_funds(user_id, goal.id, 45_000).await.unwrap();

        let result = services.goals.add_funds(user_id, goal.id, 8_000).await;
        assert!(matches!(
            result,
            Err(AppError::GoalOverfund {
                max_addable_cents: 5_000
            })
        ));

        let progress = services.goals.add_funds(user_id, goal.id, 5_000).await.unwrap();
        assert_eq!(progress.goal.current_cents, 50_000);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.remaining_cents, 0);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let services = services();
        let user_id = Uuid::new_v4();
        let goal = services
            .goals
            .create_goal(user_id, goal_request("Bike", 100, None))
            .await
            .unwrap();

        for amount in [0, -10] {
            let result = services.goals.add_funds(user_id, goal.id, amount).await;
            assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        }
    }

    #[tokio::test]
    async fn add_funds_retries_after_conflict() {
        let services = services();
        let user_id = Uuid::new_v4();
        let goal = services
            .goals
            .create_goal(user_id, goal_request("Laptop", 1_000, None))
            .await
            .unwrap();

        services.storage.conflict_next_goal_writes(2);
        let progress = services.goals.add_funds(user_id, goal.id, 250).await.unwrap();
        assert_eq!(progress.goal.current_cents, 250);
        assert_eq!(progress.percentage, 25.0);
        assert_eq!(progress.remaining_cents, 750);

        services.storage.conflict_next_goal_writes(3);
        let result = services.goals.add_funds(user_id, goal.id, 250).await;
        assert!(matches!(result, Err(AppError::ConcurrencyConflict { .. })));
    }

    #[tokio::test]
    async fn goals_of_other_users_are_invisible() {
        let services = services();
        let goal = services
            .goals
            .create_goal(Uuid::new_v4(), goal_request("Car", 1_000, None))
            .await
            .unwrap();

        let intruder = Uuid::new_v4();
        assert!(matches!(
            services.goals.add_funds(intruder, goal.id, 10).await,
            Err(AppError::GoalNotFound)
        ));
        assert!(matches!(
            services.goals.delete_goal(intruder, goal.id).await,
            Err(AppError::GoalNotFound)
        ));
    }

    #[tokio::test]
    async fn list_orders_by_deadline_with_undated_last() {
        let services = services();
        let user_id = Uuid::new_v4();
        let later = NaiveDate::from_ymd_opt(2027, 6, 1);
        let sooner = NaiveDate::from_ymd_opt(2026, 12, 1);

        for (name, deadline) in [("Someday", None), ("Later", later), ("Sooner", sooner)] {
            services
                .goals
                .create_goal(user_id, goal_request(name, 1_000, deadline))
                .await
                .unwrap();
        }

        let names: Vec<String> = services
            .goals
            .list_goals(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|progress| progress.goal.name)
            .collect();
        assert_eq!(names, ["Sooner", "Later", "Someday"]);
    }

    #[tokio::test]
    async fn create_validates_input() {
        let services = services();
        let user_id = Uuid::new_v4();

        let unnamed = services.goals.create_goal(user_id, goal_request("", 100, None)).await;
        assert!(matches!(unnamed, Err(AppError::InvalidRequest(_))));

        let zero = services.goals.create_goal(user_id, goal_request("Trip", 0, None)).await;
        assert!(matches!(zero, Err(AppError::InvalidRequest(_))));
    }
}
