use std::time::Duration;

use mandi_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool =
        connect_with_settings(&database.url, database.max_connections, database.timeout_secs)
            .await?;
    info!(
        event_name = "db.pool.connected",
        max_connections = database.max_connections,
        "sqlite pool ready"
    );
    Ok(pool)
}

/// Every connection runs with foreign keys on, WAL journaling and a busy
/// timeout so concurrent webhook tasks wait on the write lock instead of failing.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Liveness check shared by the health endpoint and `mandi doctor`.
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
