use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_api::{build_router, ApiConfig, AppState, StoreKind};
use beacon_processing::PipelineConfig;
use beacon_repository::{BeaconStore, InMemoryRepository, PostgresRepository};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Beacon ingestion API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the ingestion API server
    Serve,
    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = ApiConfig::from_env()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let repository = connect(&config).await?;
            repository.run_migrations().await?;
            info!("Database migrations applied");
            Ok(())
        }
    }
}

async fn serve(config: ApiConfig) -> Result<()> {
    let store: Arc<dyn BeaconStore> = match config.store {
        StoreKind::Postgres => {
            let repository = connect(&config).await?;
            if config.run_migrations {
                repository.run_migrations().await?;
            } else {
                warn!("Skipping migrations at user request");
            }
            Arc::new(repository)
        }
        StoreKind::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Arc::new(InMemoryRepository::new())
        }
    };

    let state = AppState::new(
        store,
        PipelineConfig {
            batch_timeout: config.ingest_timeout,
        },
    );
    let router = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect(config: &ApiConfig) -> Result<PostgresRepository> {
    let url = config.require_database_url()?;
    PostgresRepository::connect(url, config.db_max_connections)
        .await
        .context("failed to connect to the database")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
    }
    info!("shutting down");
}
