//! Budget HTTP handlers.

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
    models::budget::{BudgetResponse, BudgetUsageResponse, CreateBudgetRequest},
};

/// `POST /api/v1/budgets` - create a budget for the current month.
///
/// ```json
/// { "category": "Food", "limit_cents": 40000 }
/// ```
///
/// A second budget for the same category in the same month answers 409.
pub async fn create_budget(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<BudgetResponse>), AppError> {
    let budget = state.budgets.create_budget(auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(budget.into())))
}

/// `GET /api/v1/budgets` - current-month budgets with spend and percentage.
pub async fn list_budgets(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<BudgetUsageResponse>>, AppError> {
    let usage = state.budgets.with_spent(auth.user_id).await?;

    Ok(Json(usage.into_iter().map(Into::into).collect()))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(budget_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.budgets.delete_budget(auth.user_id, budget_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
