//! gdpval CLI - entry point for the GDPVal task store
//!
//! - `serve`: run the HTTP API over PostgreSQL
//! - `migrate`: apply the embedded schema migrations
//! - `config`: inspect configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod tracing_setup;

use commands::{migrate::MigrateArgs, serve::ServeArgs};
use config::{ConfigArgs, GdpvalConfig};

#[derive(Parser, Debug)]
#[command(
    name = "gdpval",
    author,
    version,
    about = "Durable storage and HTTP API for GDPVal task submissions"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (requires the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    /// Config file (default: ~/.gdpval/config.toml)
    #[arg(long, global = true, env = "GDPVAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(ServeArgs),
    /// Apply database migrations
    Migrate(MigrateArgs),
    /// Inspect configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })?;

    let config_path = cli.config.unwrap_or_else(GdpvalConfig::config_path);
    let config = GdpvalConfig::load_from(&config_path)?;

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args, &config).await,
        Commands::Migrate(args) => commands::run_migrate(args, &config).await,
        Commands::Config(args) => config::run_config(args, &config, &config_path),
    };

    tracing_setup::shutdown_otel();
    result
}
