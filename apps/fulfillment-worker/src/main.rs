//! # Fulfillment Worker
//!
//! Runs the expiration sweeper against the storefront database until the
//! process is told to stop.
//!
//! ```text
//! fulfillment-worker [CONFIG_PATH]
//!
//!   CONFIG_PATH   TOML file; defaults to the platform config directory
//!   RUST_LOG      log filter; defaults to info,storefront=debug,sqlx=warn
//! ```

use std::path::PathBuf;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use storefront_db::{Database, DbConfig};
use storefront_fulfillment::{FulfillmentConfig, FulfillmentService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Fulfillment worker starting");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = FulfillmentConfig::load(config_path)?;

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_config = DbConfig::new(&config.database.path)
        .max_connections(config.database.max_connections);
    let db = Database::new(db_config).await?;
    info!(path = %config.database.path.display(), "Database ready");

    let service = FulfillmentService::from_config(db.clone(), config);
    let (sweeper, handle) = service.sweeper();
    let task = tokio::spawn(sweeper.run());

    shutdown_signal().await;

    if let Err(e) = handle.shutdown().await {
        warn!(?e, "Sweeper already stopped");
    }
    if let Err(e) = task.await {
        error!(?e, "Sweeper task panicked");
    }

    db.close().await;
    info!("Fulfillment worker stopped");
    Ok(())
}

/// Logging filter from `RUST_LOG`, or the worker default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
