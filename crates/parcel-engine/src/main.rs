//! Parcel server binary.
//!
//! Loads configuration, connects the claimant record store (Dragonfly) and
//! the cell ownership store (`PostgreSQL`), builds the claim service, and
//! runs the background save and sweep task until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `parcel-config.yaml` (or `PARCEL_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to Dragonfly
//! 4. Connect to `PostgreSQL` and run migrations
//! 5. Build the claim service and start maintenance
//! 6. Wait for Ctrl-C, then flush dirty records and close the pool

mod error;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use parcel_core::{ClaimService, ParcelConfig, spawn_maintenance};
use parcel_db::{DragonflyPool, PgCellStore};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::EngineError;

/// Config file read when `PARCEL_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "parcel-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any startup step fails or the maintenance task dies.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    logging::init(&config.logging);
    info!("parcel-engine starting");
    match &source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }
    info!(
        flush_interval_ms = config.registry.flush_interval_ms,
        sweep_interval_ms = config.registry.sweep_interval_ms,
        spawn_radius = config.protection.spawn_radius,
        max_claims_per_actor = config.protection.max_claims_per_actor,
        "Claim settings"
    );

    // 3. Connect to Dragonfly.
    let dragonfly = DragonflyPool::connect(&config.infrastructure.dragonfly_url)
        .await
        .map_err(EngineError::from)?;

    // 4. Connect to PostgreSQL and run migrations.
    let cell_store = PgCellStore::connect(
        &config.infrastructure.postgres_url,
        config.infrastructure.postgres_max_connections,
    )
    .await
    .map_err(EngineError::from)?;
    cell_store.migrate().await.map_err(EngineError::from)?;

    // 5. Build the claim service and start maintenance.
    let registry_config = config.registry.clone();
    let service = Arc::new(ClaimService::new(
        Arc::new(dragonfly),
        Arc::new(cell_store.clone()),
        config,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = spawn_maintenance(Arc::clone(&service), &registry_config, shutdown_rx);
    info!("Claim service ready");

    // 6. Run until interrupted, then save what is still dirty.
    tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
    info!("Shutdown requested");
    if shutdown_tx.send(true).is_err() {
        warn!("Maintenance task already stopped");
    }
    let report = maintenance.await.map_err(EngineError::from)?;
    if report.failed > 0 {
        warn!(
            failed = report.failed,
            "Some claimant records could not be saved before shutdown"
        );
    }
    cell_store.close().await;

    info!(saved = report.saved, "parcel-engine shutdown complete");
    Ok(())
}

/// The config file to read: `PARCEL_CONFIG` when set, else the default.
fn config_path() -> PathBuf {
    std::env::var_os("PARCEL_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration, falling back to defaults when the file is absent.
///
/// Returns the path actually read, if any.
fn load_config() -> Result<(ParcelConfig, Option<PathBuf>), EngineError> {
    load_config_from(config_path())
}

fn load_config_from(path: PathBuf) -> Result<(ParcelConfig, Option<PathBuf>), EngineError> {
    if path.exists() {
        let config = ParcelConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = ParcelConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok((config, None))
    }
}
