use std::sync::Arc;
use std::time::Duration;

use mandi_agent::{AgentRuntime, ExtractionError, IntentExtractor, IntentRouter};
use mandi_core::config::AppConfig;
use mandi_core::ledger::InventoryLedger;
use mandi_db::{connect, migrations, DbPool, SqlLedgerStore, SqlTenantRepository};
use thiserror::Error;
use tracing::info;

use crate::gemini::GeminiExtractor;
use crate::webhook::WebhookState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub webhook: WebhookState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("intent extractor setup failed: {0}")]
    Extractor(#[source] ExtractionError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let extractor = GeminiExtractor::from_config(&config).map_err(BootstrapError::Extractor)?;
    bootstrap_with_extractor(config, Arc::new(extractor)).await
}

pub async fn bootstrap_with_extractor(
    config: AppConfig,
    extractor: Arc<dyn IntentExtractor>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        model = %config.llm.model,
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let ledger = InventoryLedger::new(Arc::new(SqlLedgerStore::new(db_pool.clone())));
    let runtime = AgentRuntime::new(
        extractor,
        IntentRouter::new(ledger),
        Duration::from_secs(config.llm.timeout_secs),
    );
    let webhook =
        WebhookState { tenants: Arc::new(SqlTenantRepository::new(db_pool.clone())), runtime };

    Ok(Application { config, db_pool, webhook })
}
