//! Database connection pool management

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    config::DatabaseConfig,
    error::{Error, Result},
    schema::EntitySchema,
};

/// Create a SQLite connection pool with retry logic
///
/// Retries with exponential backoff, up to `max_retries` times.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    create_pool_with_retries(config, config.max_retries).await
}

async fn create_pool_with_retries(config: &DatabaseConfig, max_retries: u32) -> Result<SqlitePool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        "Database connection established after {} attempt(s)",
                        attempt + 1
                    );
                } else {
                    tracing::info!(
                        "Database connection pool created: max={}, min={}",
                        config.max_connections,
                        config.min_connections
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > max_retries {
                    tracing::error!(
                        "Failed to connect to database after {} attempts: {}",
                        max_retries + 1,
                        e
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));

                tracing::warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Attempt to create a database pool (single try)
async fn try_create_pool(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| connect_error(config, &e))?
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect_with(options)
        .await
        .map_err(|e| connect_error(config, &e))
}

fn connect_error(config: &DatabaseConfig, e: &sqlx::Error) -> Error {
    Error::Database(format!(
        "Failed to open database at '{}': {}\n\n\
        Troubleshooting:\n\
        1. Check the URL format: sqlite://path/to/file.db?mode=rwc\n\
        2. Verify the directory exists and is writable\n\
        3. Ensure no other process holds an exclusive lock\n\n\
        Original error: {}",
        config.url,
        categorize_db_error(e),
        e
    ))
}

/// Categorize database error for better user guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "Configuration error",
        Error::Database(_) => "Database error",
        Error::Io(_) => "I/O error - check the file path and permissions",
        Error::PoolTimedOut => "Connection pool timeout - database may be locked",
        Error::PoolClosed => "Connection pool closed",
        Error::WorkerCrashed => "Database worker crashed",
        _ => "Connection error",
    }
}

/// Check that the pool can serve a trivial query
pub async fn ping(pool: &SqlitePool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Fail unless every table of `schemas` exists
///
/// The service never creates tables; `sql/schema.sql` is applied to the
/// database before the first start.
pub async fn ensure_schema(pool: &SqlitePool, schemas: &[&EntitySchema]) -> Result<()> {
    let mut missing = Vec::new();
    for schema in schemas {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(schema.table)
                .fetch_optional(pool)
                .await
                .map_err(|e| Error::Database(format!("Failed to inspect schema: {}", e)))?;
        if found.is_none() {
            missing.push(schema.table);
        }
    }

    if missing.is_empty() {
        return Ok(());
    }

    tracing::error!(missing = ?missing, "Database schema is not installed");
    Err(Error::Database(format!(
        "Missing tables: {}\n\n\
        Apply sql/schema.sql before starting the service, e.g. \
        `sqlite3 crud.db < crud-service/sql/schema.sql`",
        missing.join(", ")
    )))
}
