mod config;
mod db;
mod error;
mod extractor;
mod mapper;
mod normalize;
mod persister;
mod pipeline;
mod render;
mod scheduler;
mod shutdown;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, StoreBackend};
use crate::db::{MemoryStore, SqliteStore, StoreConnector};
use crate::error::Result;
use crate::render::{HttpRenderer, PageRenderer};
use crate::scheduler::Scheduler;
use crate::shutdown::{cancel_pair, CancelHandle};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    match run(cfg).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {e}");
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when a one-shot cycle failed. Scheduled runs end only on Ctrl-C.
async fn run(cfg: Config) -> Result<bool> {
    info!(
        url = %cfg.ranking_url,
        persist = cfg.persist_enabled,
        backend = %cfg.store_backend,
        collection = %cfg.collection,
        "fii_sync starting"
    );

    let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(&cfg)?);
    let store = build_store(&cfg).await;

    let (handle, cancel) = cancel_pair();
    tokio::spawn(watch_ctrl_c(handle));

    match cfg.scrape_interval_secs {
        Some(secs) => {
            let period = Duration::from_secs(secs);
            Scheduler::new(cfg, period, renderer, store, cancel).run().await;
            Ok(true)
        }
        None => {
            let report =
                pipeline::run_cycle(&cfg, renderer.as_ref(), store.as_deref(), &cancel).await;
            Ok(report.is_success())
        }
    }
}

async fn build_store(cfg: &Config) -> Option<Arc<dyn StoreConnector>> {
    if !cfg.persist_enabled {
        info!("persistence disabled; cycles stop after mapping");
        return None;
    }
    match cfg.store_backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::new(&cfg.db_path);
            // An unreachable store only fails the cycles that need it.
            if let Err(e) = store.prepare().await {
                warn!(path = %cfg.db_path, "database not ready: {e}");
            }
            Some(Arc::new(store))
        }
        StoreBackend::Memory => {
            warn!("memory store selected; data does not outlive the process");
            Some(Arc::new(MemoryStore::new()))
        }
    }
}

async fn watch_ctrl_c(handle: CancelHandle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Ctrl-C received, cancelling");
            handle.cancel();
        }
        Err(e) => warn!("could not listen for Ctrl-C: {e}"),
    }
}
