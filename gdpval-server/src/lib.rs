//! gdpval-server: durable storage for GDPVal task submissions
//!
//! Fans one task payload out over six PostgreSQL tables in a single
//! transaction, and reads it back by task_id or as a filtered listing.
//! The HTTP surface in `http` is a thin axum layer over `db::TaskStore`.

pub mod db;
pub mod http;
pub mod models;

use sqlx::PgPool;

pub use db::{PgTaskStore, StoreError, TaskStore};
pub use http::{run_server, ServerConfig};

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Apply any pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running task schema migrations...");
    MIGRATOR.run(pool).await?;
    Ok(())
}
