//! Transaction HTTP handlers.
//!
//! - POST /api/v1/transactions - Record income or an expense
//! - GET /api/v1/transactions - List transactions, optionally `?account_id=`
//! - GET /api/v1/transactions/{id} - Get transaction details
//! - DELETE /api/v1/transactions/{id} - Delete and reverse the balance effect

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    app::AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::transaction::{CreateTransactionRequest, ListTransactionsQuery, TransactionResponse},
};

/// Record a transaction against one of the caller's accounts.
///
/// # Request Body
///
/// ```json
/// {
///   "account_id": "550e8400-...",
///   "amount_cents": 3000,
///   "kind": "expense",
///   "category": "Food",
///   "description": "Weekly shop"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the recorded transaction
/// - **400**: unknown kind, non-positive amount or empty category
/// - **404**: account not found
/// - **422**: budget exceeded or insufficient funds; nothing was written
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = state
        .transactions
        .create_transaction(auth.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(transaction.into())))
}

/// List transactions newest first.
///
/// Without `account_id` the caller's accounts are merged. Naming an account
/// that belongs to someone else yields 403.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<TransactionResponse>>, AppError> {
    let transactions = state
        .transactions
        .list_transactions(auth.user_id, query.account_id)
        .await?;

    Ok(Json(transactions.into_iter().map(Into::into).collect()))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state
        .transactions
        .get_transaction(auth.user_id, transaction_id)
        .await?;

    Ok(Json(transaction.into()))
}

/// Delete a transaction. The account balance moves back by exactly the
/// transaction's signed amount.
///
/// # Response
///
/// - **204 No Content**: deleted and reversed
/// - **403**: the transaction belongs to another user
/// - **404**: no such transaction
pub async fn delete_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .transactions
        .delete_transaction(auth.user_id, transaction_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
