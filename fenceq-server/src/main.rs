//! fenceq server
//!
//! Runs the indexing pipeline: a coordinator that admits stored events in
//! fence order and a pool of workers that index them.

mod config;
mod indexer;
mod seed;
mod shutdown;

use clap::Parser;
use config::file::StorageBackend;
use config::{ConfigLoader, LoadedConfig, get_database_url};
use fenceq_core::config::ConfigStore;
use fenceq_core::events::{completion_channel, work_channel};
use fenceq_core::processors::{Coordinator, IndexWorker};
use fenceq_core::storage::{EventStorage, MemoryEventStorage, PgEventStorage};
use indexer::LoggingIndexer;
use shutdown::{shutdown_signal, spawn_config_reload_handler};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// fenceq - ordered admission of index events
#[derive(Parser, Debug)]
#[command(name = "fenceq-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./fenceq.toml")]
    config: PathBuf,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,

    /// Emit logs as JSON
    #[arg(long, env = "FENCEQ_LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Store the events of this JSON-lines file before starting
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_json);

    tracing::info!("Starting fenceq-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = Arc::new(ConfigLoader::new(&args.config));
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let (storage, db_pool) = open_storage(&loaded_config, args.migrate).await?;

    if let Some(seed_path) = &args.seed {
        seed::seed_events(storage.as_ref(), seed_path).await?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (work_tx, work_rx) = work_channel();
    let (completion_tx, completion_rx) = completion_channel();
    let coordinator_config_store = ConfigStore::new(loaded_config.coordinator.clone());

    let coordinator =
        Coordinator::start(storage.clone(), work_tx, coordinator_config_store.current()).await?;
    let mut handles = vec![tokio::spawn(coordinator.run(
        shutdown_rx.clone(),
        completion_rx,
        coordinator_config_store.subscribe(),
    ))];

    let indexer = Arc::new(LoggingIndexer);
    for worker_id in 0..loaded_config.worker_count {
        let worker = IndexWorker::new(
            worker_id,
            indexer.clone(),
            storage.clone(),
            completion_tx.clone(),
        );
        handles.push(tokio::spawn(worker.run(shutdown_rx.clone(), work_rx.clone())));
    }
    drop(completion_tx);
    tracing::info!(workers = loaded_config.worker_count, "Indexing pipeline started");

    // Spawn config reload handler (listens for SIGHUP)
    let reload_notify = spawn_config_reload_handler(config_loader, coordinator_config_store)?;

    let result = shutdown_signal().await;

    // Every task holds a receiver, so this only fails if all have exited.
    shutdown_tx.send_replace(true);
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Pipeline task failed: {}", e);
        }
    }

    // Signal the config reload handler to stop
    reload_notify.notify_one();

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Open the configured storage backend.
///
/// Returns the pool as well when Postgres is used, so it can be closed on
/// shutdown.
async fn open_storage(
    config: &LoadedConfig,
    migrate: bool,
) -> anyhow::Result<(Arc<dyn EventStorage>, Option<PgPool>)> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory event storage");
            if migrate {
                tracing::warn!("--migrate has no effect with in-memory storage");
            }
            let storage: Arc<dyn EventStorage> = Arc::new(MemoryEventStorage::new());
            Ok((storage, None))
        }
        StorageBackend::Postgres => {
            // Get database URL from environment
            let database_url = get_database_url().map_err(|e| {
                tracing::error!("DATABASE_URL environment variable not set");
                e
            })?;

            // Create database connection pool
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.storage.max_connections)
                .connect(&database_url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to database: {}", e);
                    e
                })?;
            tracing::info!("Database connection established");

            // Run migrations if requested
            if migrate {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("../migrations")
                    .run(&db_pool)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to run migrations: {}", e);
                        e
                    })?;
                tracing::info!("Migrations completed successfully");
            }

            let storage: Arc<dyn EventStorage> = Arc::new(PgEventStorage::new(db_pool.clone()));
            Ok((storage, Some(db_pool)))
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
