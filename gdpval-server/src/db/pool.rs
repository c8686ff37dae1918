//! Database connection pool management
//!
//! One sqlx PgPool per process, built at startup and closed at shutdown.
//! Connections are only ever borrowed through `acquire`/`begin`, which hand
//! them back to the pool when the guard drops.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::models::ValidationError;

/// Connections kept warm
pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Hard cap on concurrent store operations
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// How long an operation waits for a free connection before failing
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool sizing and acquisition settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolSettings {
    /// Reject sizes the pool can't honour.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_connections == 0 {
            return Err(ValidationError::InvalidFormat {
                field: "pool max size",
                reason: "must be at least 1",
            });
        }
        if self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidFormat {
                field: "pool min size",
                reason: "must not exceed pool max size",
            });
        }
        Ok(())
    }
}

/// Pool creation error
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid pool settings: {0}")]
    Settings(#[from] ValidationError),

    #[error("failed to connect: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Create a PostgreSQL connection pool.
///
/// Opens `min_connections` eagerly so an unreachable database fails here,
/// at startup, rather than on the first request.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool("postgres://localhost/gdpval_tasks", PoolSettings::default()).await?;
/// ```
pub async fn create_pool(database_url: &str, settings: PoolSettings) -> Result<PgPool, PoolError> {
    settings.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(settings.min_connections)
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url)
        .await?;

    tracing::info!(
        min = settings.min_connections,
        max = settings.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Close the pool, waiting for borrowed connections to come back.
pub async fn close_pool(pool: &PgPool) {
    pool.close().await;
    tracing::info!("database pool closed");
}
