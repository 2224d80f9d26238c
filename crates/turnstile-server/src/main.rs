//! Turnstile server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `turnstile.yaml` plus environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Connect to the store named by `database.url`
//! 4. Apply migrations (unless disabled)
//! 5. Build the reservation engine, picking the locking strategy
//! 6. Serve the HTTP API until `Ctrl-C`

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use turnstile_db::Store;
use turnstile_engine::ReservationEngine;
use turnstile_server::config::LoggingConfig;
use turnstile_server::{AppState, TurnstileConfig, start_server};

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, store connection, migrations,
/// engine construction or the listener fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = TurnstileConfig::load()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("turnstile starting");

    // 3. Connect to the store.
    let store_config = config.store_config();
    info!(
        backend = %store_config.backend()?,
        max_connections = store_config.max_connections,
        lock_timeout_ms = store_config.lock_timeout.as_millis(),
        "Connecting to store"
    );
    let store = Store::connect(&store_config).await?;

    // 4. Migrations.
    if config.database.run_migrations {
        store.catalog.run_migrations().await?;
        info!("Migrations applied");
    }

    // 5. Engine.
    let engine = ReservationEngine::new(Arc::clone(&store.inventory), config.engine_config())?;
    let state = Arc::new(AppState::new(&store, engine));

    // 6. Serve.
    let served = start_server(&config.server, state).await;
    store.catalog.close().await;
    served?;

    info!("turnstile shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
