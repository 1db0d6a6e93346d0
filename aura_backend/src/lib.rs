//! AURA backend: aflatoxin risk predictions, farmer alerts and batch
//! certifications behind a JSON REST API.
//!
//! The server keeps its documents in an embedded store (RocksDB or memory),
//! scores storage risk through an external ML service with a local fallback,
//! and can mirror issued certifications onto an Ethereum contract.

pub mod api;
pub mod chain;
pub mod config;
pub mod models;
pub mod risk;
pub mod storage;
pub mod verification;

use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::api::{auth::bootstrap_super_admin, create_router, AppState};
use crate::chain::registry_from_config;
use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::storage::{Database, MemoryStorage, RocksDbStorage, Storage};

pub fn build_storage(config: &StorageConfig) -> storage::Result<Arc<dyn Storage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::Rocksdb => Ok(Arc::new(RocksDbStorage::open(&config.path)?)),
    }
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let storage = build_storage(&config.storage)
        .with_context(|| format!("opening storage at {}", config.storage.path.display()))?;
    let db = Database::new(storage);

    match bootstrap_super_admin(&db, &config.auth).await {
        Ok(true) => info!("Bootstrap admin account created"),
        Ok(false) => {}
        Err(e) => error!("Failed to create bootstrap admin: {}", e),
    }

    if config.uses_default_secret() {
        warn!("JWT secret is the built-in default; set AURA_AUTH__JWT_SECRET in production");
    }

    let registry = registry_from_config(&config.blockchain);
    let bind_address = config.bind_address();
    let state = AppState::new(db, config, registry)?;
    let db = state.db.clone();

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("binding {}", bind_address))?;

    info!("AURA backend listening on http://{}", bind_address);
    info!("  GET  /health");
    info!("  POST /api/auth/register | /api/auth/login | /api/auth/invite");
    info!("  GET  /api/auth/me");
    info!("  GET  /api/farmers/:id       PUT /api/farmers/:id");
    info!("  POST /api/predictions       GET /api/predictions/history/:farmerId");
    info!("  GET  /api/alerts/:farmerId  GET /api/alerts/:farmerId/stats");
    info!("  PUT  /api/alerts/:alertId/read | /api/alerts/:alertId/acknowledge");
    info!("  POST /api/certifications    GET /api/certifications/verify/:batchId");
    info!("  GET  /api/certifications/farmer/:farmerId");
    info!("  PUT  /api/certifications/:batchId/status");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutting down, flushing storage");
    db.flush().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
}
