use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::Router;
use configs::{AppConfig, StorageBackend};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::auth::{ServerAuthConfig, ServerState};
use crate::routes;
use service::runtime::{self, StorageTarget, Stores};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Where the running config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    Environment,
}

/// Config file when present, environment variables otherwise. Either way the
/// result is validated; a file that exists but does not parse is an error,
/// never a silent fallback.
pub fn load_config() -> anyhow::Result<(AppConfig, ConfigSource)> {
    let path = configs::config_path();
    if Path::new(&path).exists() {
        let cfg = AppConfig::load_and_validate().with_context(|| format!("invalid config file {path}"))?;
        Ok((cfg, ConfigSource::File(path)))
    } else {
        let cfg = AppConfig::from_env_validated().context("invalid environment config")?;
        Ok((cfg, ConfigSource::Environment))
    }
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

async fn storage_target(cfg: &AppConfig) -> anyhow::Result<StorageTarget> {
    match cfg.storage.backend {
        StorageBackend::File => {
            runtime::ensure_env(&cfg.storage.data_dir).await?;
            Ok(StorageTarget::Files(PathBuf::from(&cfg.storage.data_dir)))
        }
        StorageBackend::Database => {
            let db = models::db::connect_with_config(&cfg.database).await?;
            models::db::ensure_schema(&db).await?;
            Ok(StorageTarget::Database(db))
        }
    }
}

/// Open the stores and assemble the router for them.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<(Router, Stores)> {
    let target = storage_target(cfg).await?;
    let stores = Stores::open(&target).await?;
    let state = ServerState { stores: stores.clone(), auth: ServerAuthConfig::from_settings(&cfg.auth) };
    Ok((routes::build_router(state, build_cors()), stores))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Public entry: build the app, serve until Ctrl+C, then flush the stores.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let (app, stores) = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, backend = ?cfg.storage.backend, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    stores.flush_all().await?;
    info!("server stopped");
    Ok(())
}
