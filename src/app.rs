//! Service wiring and the HTTP router.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers, middleware,
    services::{AccountService, BudgetService, GoalService, TransactionService},
    storage::Storage,
};

/// Everything a handler needs, shared through axum's `State`.
///
/// All services hold the same storage handle.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub accounts: AccountService,
    pub budgets: BudgetService,
    pub goals: GoalService,
    pub transactions: TransactionService,
}

impl AppState {
    /// `retry_limit` bounds the compare-and-swap attempts of balance and
    /// goal writes.
    pub fn new(storage: Arc<dyn Storage>, retry_limit: u32) -> Self {
        let accounts = AccountService::new(storage.clone(), retry_limit);
        let budgets = BudgetService::new(storage.clone());
        let goals = GoalService::new(storage.clone(), retry_limit);
        let transactions =
            TransactionService::new(storage.clone(), accounts.clone(), budgets.clone());

        Self {
            storage,
            accounts,
            budgets,
            goals,
            transactions,
        }
    }
}

/// Build the application router.
///
/// `/health` is public; everything under `/api/v1` requires an `X-User-Id`
/// header.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/accounts",
            post(handlers::accounts::create_account).get(handlers::accounts::list_accounts),
        )
        .route(
            "/accounts/{id}",
            get(handlers::accounts::get_account)
                .patch(handlers::accounts::rename_account)
                .delete(handlers::accounts::delete_account),
        )
        .route(
            "/accounts/{id}/reconcile",
            post(handlers::accounts::reconcile_account),
        )
        .route(
            "/transactions",
            post(handlers::transactions::create_transaction)
                .get(handlers::transactions::list_transactions),
        )
        .route(
            "/transactions/{id}",
            get(handlers::transactions::get_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route(
            "/budgets",
            post(handlers::budgets::create_budget).get(handlers::budgets::list_budgets),
        )
        .route("/budgets/{id}", delete(handlers::budgets::delete_budget))
        .route(
            "/goals",
            post(handlers::goals::create_goal).get(handlers::goals::list_goals),
        )
        .route(
            "/goals/{id}",
            get(handlers::goals::get_goal).delete(handlers::goals::delete_goal),
        )
        .route("/goals/{id}/funds", post(handlers::goals::add_funds))
        .route_layer(axum_middleware::from_fn(middleware::auth::identity_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
