//! Revise Server
//!
//! HTTP service for the practice tracker: records revisions, publishes the
//! daily selection, and serves dashboard data.
//!
//! Uses SQLite (embedded) for the catalog and Redis (or an in-memory
//! stand-in) for the daily view.

mod config;
mod error;
mod extractors;
mod handlers;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use revise_core::{KeyValueStore, MemoryStore, RevisionRecorder};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::ServerConfig;
use services::{CatalogSync, DashboardService, EmailNotifier, SelectionJob};
use storage::{Database, RedisStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub recorder: Arc<RevisionRecorder>,
    pub selection: Arc<SelectionJob>,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    pub fn new(config: ServerConfig, db: Arc<Database>, cache: Arc<dyn KeyValueStore>) -> Self {
        let recorder = Arc::new(RevisionRecorder::new(db.clone(), cache.clone()));
        let selection = Arc::new(
            SelectionJob::new(db.clone(), cache.clone(), config.selection_ttl())
                .with_notifier(EmailNotifier::from_config(&config))
                .with_catalog_sync(CatalogSync::from_config(db.clone(), &config)),
        );
        let dashboard = Arc::new(DashboardService::new(db, cache));

        Self {
            config: Arc::new(config),
            recorder,
            selection,
            dashboard,
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Revise Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    info!("Loading configuration...");
    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        "Config loaded: bind={}, db={}",
        config.bind_address, config.database_path
    );

    let db = Arc::new(
        Database::new(&config.database_path)
            .await
            .context("Failed to initialize database")?,
    );

    let cache: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => {
            info!("Using Redis key-value store");
            Arc::new(RedisStore::new(url).context("Invalid REDIS_URL")?)
        }
        None => {
            warn!("REDIS_URL not set, using in-memory key-value store (not persisted)");
            Arc::new(MemoryStore::new())
        }
    };

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;

    let state = AppState::new(config, db, cache);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/commit-question", get(handlers::revisions::commit))
        .route("/fetch-today-question", get(handlers::dashboard::today))
        .route("/get-dashboard", get(handlers::dashboard::dashboard))
        .route("/hit-main", get(handlers::selection::hit_main))
        .route("/cron/daily-update", get(handlers::selection::daily_update))
}
