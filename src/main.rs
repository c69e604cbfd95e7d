//! Provault CLI - backup ingestion and retrieval service for proformas

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use provault::config;
use provault::storage::SqliteStore;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "provault")]
#[command(version = "0.1.0")]
#[command(about = "Backup ingestion and retrieval service for proforma documents")]
#[command(long_about = r#"
Provault accepts full client-side snapshots of proforma documents and their
line items, reconciles them into persistent storage, and serves the
reconciled state back on demand.

Example usage:
  provault serve --port 4000 --database provault.db
  provault stats --database provault.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the backup service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Path to a provault.toml config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print record counts for a database
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve {
            port,
            database,
            config: config_path,
        } => {
            let file_config = config::load_config(config_path.as_deref())?.unwrap_or_default();

            let port = port.or(file_config.port).unwrap_or(4000);
            let database = database
                .or_else(|| file_config.database.as_deref().map(PathBuf::from))
                .unwrap_or_else(config::default_database_path);

            config::ensure_db_dir(&database)?;
            tracing::info!(database = %database.display(), port, "starting provault");

            // A failed startup connection sequence is fatal: the service
            // must not serve traffic without storage.
            provault::server::start_server(port, database).await?;
        }

        Commands::Stats { database } => {
            let database = database.unwrap_or_else(config::default_database_path);
            let store = SqliteStore::open(&database)?;
            print!("{}", store.stats()?);
        }
    }

    Ok(())
}
