//! Connection pool construction.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens the pool, retrying with exponential backoff while the database is
/// unreachable.
#[instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let mut attempts_left = config.connect_attempts.max(1);
    let mut delay = config.connect_backoff();

    loop {
        let result = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(Some(config.idle_timeout()))
            .max_lifetime(Some(config.max_lifetime()))
            .connect(&config.url)
            .await;

        attempts_left -= 1;
        match result {
            Ok(pool) => {
                info!("PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) if attempts_left > 0 => {
                warn!(
                    error = %e,
                    retries_left = attempts_left,
                    delay_ms = delay.as_millis() as u64,
                    "PostgreSQL connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                return Err(DomainError::database(format!(
                    "Failed to connect to PostgreSQL: {}",
                    e
                )))
            }
        }
    }
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))?;
    info!("Database migrations applied");
    Ok(())
}
