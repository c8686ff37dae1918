//! Apply the embedded schema migrations and exit

use anyhow::{Context, Result};
use clap::Parser;

use gdpval_server::db::{close_pool, create_pool};

use crate::config::{DatabaseArgs, GdpvalConfig};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,
}

pub async fn run_migrate(args: MigrateArgs, config: &GdpvalConfig) -> Result<()> {
    let database_url = config.database_url(&args.database);
    let settings = config.pool_settings(&args.database)?;

    let pool = create_pool(&database_url, settings)
        .await
        .context("Failed to create database pool")?;

    let result = gdpval_server::migrate(&pool)
        .await
        .context("Failed to run migrations");

    close_pool(&pool).await;
    result?;

    println!("Migrations applied");
    Ok(())
}
