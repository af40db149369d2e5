//! Rolebase CLI
//!
//! Usage:
//!   rolebase seed               Apply the schema script to the configured database
//!   rolebase health             Print a pool health report as JSON
//!   rolebase --verbose <cmd>    Same, with debug logging
//!
//! Connection settings come from `DB_*` environment variables (a `.env`
//! file in the working directory is honored).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rolebase_postgres::{seed, DatabaseSettings, PoolManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rolebase")]
#[command(about = "Schema and health tooling for the rolebase database", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create schemas, tables, indexes and triggers (idempotent)
    Seed,
    /// Check database reachability and pool saturation
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = DatabaseSettings::from_env()
        .context("Failed to load database settings")?;
    info!("Using database {}", settings.redacted_url());

    match cli.command {
        Commands::Seed => run_seed(settings).await?,
        Commands::Health => {
            if !run_health(settings).await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Apply the seeding script inside one transaction.
async fn run_seed(settings: DatabaseSettings) -> Result<()> {
    let manager = PoolManager::new(settings);
    manager
        .connect()
        .await
        .context("Failed to connect to database")?;

    let outcome = seed::run_seeder(&manager).await;
    manager.disconnect().await;

    let applied = outcome.context("Seeding failed")?;
    println!("Applied {} statements", applied);
    Ok(())
}

/// Print the health report; returns whether the database is healthy.
async fn run_health(settings: DatabaseSettings) -> Result<bool> {
    let manager = PoolManager::new(settings);
    manager.connect_lazy();

    let report = manager.health_report().await;
    manager.disconnect().await;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize health report")?
    );
    Ok(report.is_healthy)
}
