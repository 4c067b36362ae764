//! Ledger engine - application entry point.
//!
//! Serves the account, transaction, budget and goal API over HTTP.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Pick the storage adapter: PostgreSQL when `DATABASE_URL` is set
//!    (pool + migrations), otherwise the in-memory store
//! 3. Wire the services and build the router
//! 4. Start the server on the configured port

use std::sync::Arc;

use ledger_engine::{
    AppState,
    config::Config,
    db, router,
    storage::{MemoryStorage, PgStorage, Storage},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(database_url) => {
            let pool = db::create_pool(
                database_url,
                config.max_db_connections,
                config.db_acquire_timeout(),
            )
            .await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Arc::new(PgStorage::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage; data is lost on exit");
            Arc::new(MemoryStorage::new())
        }
    };

    let app = router(AppState::new(storage, config.retry_limit()));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
