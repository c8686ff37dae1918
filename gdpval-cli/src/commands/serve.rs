//! HTTP server command for the task store API

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use gdpval_server::db::{close_pool, create_pool};
use gdpval_server::http::run_server;
use gdpval_server::PgTaskStore;

use crate::config::{redact_url, DatabaseArgs, GdpvalConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Address to bind to (default: 127.0.0.1:8000)
    #[arg(long, short = 'b', env = "GDPVAL_BIND")]
    pub bind: Option<SocketAddr>,

    /// Restrict CORS to localhost origins
    #[arg(long)]
    pub cors_localhost: bool,

    /// Apply pending migrations before accepting requests
    #[arg(long)]
    pub migrate: bool,

    /// Seconds a single store operation may take before the request fails with 504
    #[arg(long)]
    pub operation_timeout: Option<u64>,
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs, config: &GdpvalConfig) -> Result<()> {
    let database_url = config.database_url(&args.database);
    let settings = config.pool_settings(&args.database)?;
    let server_config = config.server_config(args.bind, args.cors_localhost, args.operation_timeout);

    tracing::info!(
        database = %redact_url(&database_url),
        "Starting gdpval server on {}",
        server_config.bind_addr
    );

    // Pool first: no listener until the database is reachable
    let pool = create_pool(&database_url, settings)
        .await
        .context("Failed to create database pool")?;

    if args.migrate {
        gdpval_server::migrate(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let store = Arc::new(PgTaskStore::new(pool.clone()));

    // Run server (blocks until shutdown)
    let result = run_server(store, server_config).await.context("Server error");

    close_pool(&pool).await;
    result
}
