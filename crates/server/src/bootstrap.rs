use std::sync::Arc;

use recommender_core::config::{AppConfig, ConfigError, LoadOptions};
use recommender_core::{RecommendationEngine, RecommendationStore};
use recommender_db::{connect_with_config, migrations, DbPool, SqlRecommendationStore};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<RecommendationEngine>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[allow(dead_code)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Connects, migrates and performs the initial engine load. An empty or failing
/// catalog does not abort startup; the engine retries on the next request.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store: Arc<dyn RecommendationStore> = Arc::new(SqlRecommendationStore::new(db_pool.clone()));
    let engine = Arc::new(RecommendationEngine::bootstrap(store, config.engine.clone()).await);
    info!(
        event_name = "system.bootstrap.engine_ready",
        correlation_id = "bootstrap",
        products_loaded = engine.snapshot().catalog.len(),
        generation = engine.snapshot().generation,
        "recommendation engine initialized"
    );

    Ok(Application { config, db_pool, engine })
}
