//! mspec-ingest - machine-spec ingestion service
//!
//! Normalizes machine-spec records from multiple upstream sources into one
//! canonical schema, stores them in SQLite and serves list, statistics and
//! mapping-management endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mspec_common::config::{ConfigOverrides, TomlConfig};
use mspec_common::mapping::{FileSource, MappingStore, Normalizer};
use mspec_ingest::{build_router, db, AppState};
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for mspec-ingest
#[derive(Parser, Debug)]
#[command(name = "mspec-ingest")]
#[command(about = "Machine-spec ingestion and normalization service")]
#[command(version)]
struct Args {
    /// TOML configuration file (falls back to MSPEC_CONFIG, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "MSPEC_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "MSPEC_DATABASE")]
    database: Option<PathBuf>,

    /// Mapping document (JSON or TOML)
    #[arg(short, long, env = "MSPEC_MAPPINGS")]
    mappings: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?
        .apply_overrides(ConfigOverrides {
            bind_address: args.bind,
            database_path: args.database,
            mappings_path: args.mappings,
            log_level: args.log_level,
        });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting mspec-ingest v{} (field error policy: {:?})",
        env!("CARGO_PKG_VERSION"),
        config.field_error_policy
    );

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());
    let pool = match db::init_database(&db_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {:#}", e);
            return Err(e);
        }
    };

    // A bad mapping file does not stop startup; /mappings/reload can fix it later
    let store = Arc::new(MappingStore::new(FileSource::new(&config.mappings_path)));
    if let Err(e) = store.load() {
        warn!("Starting with no active mappings: {}", e);
    }

    let normalizer = Arc::new(Normalizer::new(store, config.field_error_policy));
    let state = AppState::new(pool, normalizer, config.max_page_size);
    let app = build_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("mspec-ingest listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("mspec-ingest stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
