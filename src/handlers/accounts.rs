//! Account management HTTP handlers.
//!
//! - POST /api/v1/accounts - Create an account
//! - GET /api/v1/accounts - List the caller's accounts
//! - GET /api/v1/accounts/{id} - Get one account
//! - PATCH /api/v1/accounts/{id} - Rename an account
//! - DELETE /api/v1/accounts/{id} - Delete an account and its transactions
//! - POST /api/v1/accounts/{id}/reconcile - Recompute the balance from the log

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
    models::account::{AccountResponse, CreateAccountRequest, Reconciliation, RenameAccountRequest},
};

/// Create a new account.
///
/// # Endpoint
///
/// `POST /api/v1/accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Everyday",
///   "kind": "current",
///   "opening_balance_cents": 10000
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the new account, balance equal to the opening balance
/// - **400**: empty name, unknown kind or negative opening balance
/// - **401**: missing `X-User-Id`
pub async fn create_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let account = state.accounts.create_account(auth.user_id, request).await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

/// List all accounts of the caller, newest first.
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state.accounts.list_accounts(auth.user_id).await?;

    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// Get a specific account by ID.
///
/// Returns 404 both when the account does not exist and when it belongs to
/// another user, so ids of other users' accounts cannot be probed.
pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.accounts.get_account(auth.user_id, account_id).await?;

    Ok(Json(account.into()))
}

/// Rename an account. The balance is never writable from outside.
///
/// # Request Body
///
/// ```json
/// { "name": "Holidays" }
/// ```
pub async fn rename_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<RenameAccountRequest>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state
        .accounts
        .rename_account(auth.user_id, account_id, &request.name)
        .await?;

    Ok(Json(account.into()))
}

/// Delete an account together with its transactions.
///
/// # Response
///
/// - **204 No Content**: deleted
/// - **404**: not found or not owned by the caller
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.accounts.delete_account(auth.user_id, account_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Recompute the stored balance from the opening balance and the transaction
/// log, repairing it if it drifted.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "account_id": "550e8400-...",
///   "previous_balance_cents": 7000,
///   "expected_balance_cents": 7250,
///   "drift_cents": 250
/// }
/// ```
pub async fn reconcile_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Reconciliation>, AppError> {
    let report = state
        .accounts
        .reconcile_account(auth.user_id, account_id)
        .await?;

    Ok(Json(report))
}
