//! fraudscope server - fraud-detection training and scoring over HTTP
//!
//! # Usage
//! ```sh
//! MODEL_DIR=models PORT=8000 cargo run
//! ```
//!
//! # Environment Variables
//! - `MODEL_DIR` - Model and metrics store (default: models)
//! - `LOCAL_DATA_PATH` - Dataset used by `use_local_file` training requests
//! - `BIND_ADDRESS` / `PORT` - Listen address (default: 0.0.0.0:8000)
//! - `MAX_UPLOAD_MB` - Upload size limit (default: 200)
//! - `OBSERVABILITY_ENABLED` - Serve `/metrics` (default: true)

use anyhow::{Context, Result};
use fraudscope::config::Config;
use fraudscope::infrastructure::observability::Metrics;
use fraudscope::infrastructure::persistence::FsArtifactStore;
use fraudscope::interfaces::http::{AppState, create_router};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("fraudscope {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: model_dir={:?}, local_data={:?}, metrics={}",
        config.storage.model_dir, config.storage.local_data_path, config.observability.enabled
    );

    let store = FsArtifactStore::init(&config.storage.model_dir)
        .context("Failed to initialise model store")?;
    let metrics = Metrics::new()?;

    let address = config.server.socket_address();
    let state = AppState::new(config, Arc::new(store), metrics);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received. Exiting...");
        })
        .await?;

    Ok(())
}
