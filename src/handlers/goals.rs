//! Savings goal HTTP handlers.
//!
//! Every goal in a response carries its progress: `percentage` (capped at
//! 100, one decimal) and `remaining_cents`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::goal::{AddFundsRequest, CreateGoalRequest, GoalResponse},
};

/// `POST /api/v1/goals`
///
/// ```json
/// { "name": "Bike", "target_cents": 50000, "deadline": "2026-12-31" }
/// ```
pub async fn create_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateGoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>), AppError> {
    let goal = state.goals.create_goal(auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(goal.into())))
}

/// `GET /api/v1/goals` - ordered by deadline, undated goals last.
pub async fn list_goals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<GoalResponse>>, AppError> {
    let goals = state.goals.list_goals(auth.user_id).await?;

    Ok(Json(goals.into_iter().map(Into::into).collect()))
}

pub async fn get_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(goal_id): Path<Uuid>,
) -> Result<Json<GoalResponse>, AppError> {
    let progress = state.goals.get_goal(auth.user_id, goal_id).await?;

    Ok(Json(progress.into()))
}

/// `POST /api/v1/goals/{id}/funds`
///
/// ```json
/// { "amount_cents": 5000 }
/// ```
///
/// Answers 422 with `details.max_addable_cents` when the amount would pass
/// the target.
pub async fn add_funds(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(goal_id): Path<Uuid>,
    Json(request): Json<AddFundsRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    let progress = state
        .goals
        .add_funds(auth.user_id, goal_id, request.amount_cents)
        .await?;

    Ok(Json(progress.into()))
}

pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(goal_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.goals.delete_goal(auth.user_id, goal_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
