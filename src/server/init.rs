//! Server initialization and run loop

use super::config::{AppConfig, QuotaBackend, StorageConfig, UsageBackend};
use super::loader::load_config;
use super::providers::resolve_dispatcher;
use super::validation::validate_config;
use crate::api;
use anyhow::{Context, Result};
use chatgate_core::{
    AdmissionGate, CompositeKeyDirectory, Gateway, GatewayMetrics, InMemoryUsageRecorder,
    KeyDirectory, MemoryQuotaStore, MetricsRegistry, QuotaStore, RedisQuotaConfig,
    RedisQuotaStore, SqliteStorage, StaticKeyDirectory, UsageRecorder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub keys: Arc<dyn KeyDirectory>,
    pub storage: SqliteStorage,
}

/// Open the configured SQLite database
pub async fn open_storage(config: &StorageConfig) -> Result<SqliteStorage> {
    let storage = match config.database_path.trim() {
        ":memory:" => SqliteStorage::in_memory().await?,
        "" => SqliteStorage::new(SqliteStorage::default_path()?).await?,
        path => SqliteStorage::new(path).await?,
    };
    Ok(storage)
}

/// Build the configured quota store
pub fn build_quota_store(config: &AppConfig) -> Result<Arc<dyn QuotaStore>> {
    match config.quota.backend {
        QuotaBackend::Redis => {
            let redis = RedisQuotaConfig::new(&config.redis.url)
                .with_prefix(&config.redis.key_prefix)
                .with_timeout(Duration::from_millis(config.redis.timeout_ms))
                .with_ttl(config.quota.ttl());
            let store = RedisQuotaStore::new(redis).context("Failed to create Redis quota store")?;
            info!(url = %config.redis.url, "Using Redis quota store");
            Ok(Arc::new(store))
        }
        QuotaBackend::Memory => {
            let store = Arc::new(MemoryQuotaStore::with_ttl(config.quota.ttl()));
            spawn_purge_task(store.clone());
            info!("Using in-memory quota store");
            Ok(store)
        }
    }
}

/// Pick the usage record sink
pub fn build_usage_recorder(
    config: &StorageConfig,
    storage: &SqliteStorage,
) -> Arc<dyn UsageRecorder> {
    match config.usage_backend {
        UsageBackend::Sqlite => Arc::new(storage.clone()),
        UsageBackend::Memory => {
            info!(capacity = config.usage_capacity, "Keeping usage records in memory");
            Arc::new(InMemoryUsageRecorder::bounded(config.usage_capacity))
        }
    }
}

fn spawn_purge_task(store: Arc<MemoryQuotaStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired quota counters");
            }
        }
    });
}

/// Assemble every collaborator from configuration
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let storage = open_storage(&config.storage)
        .await
        .context("Failed to open usage storage")?;

    let registry = MetricsRegistry::new();
    let metrics = GatewayMetrics::new(&registry);

    let store = build_quota_store(config)?;
    let gate = AdmissionGate::new(store, metrics.clone());
    let dispatcher = Arc::new(resolve_dispatcher(&config.providers)?);

    let static_keys = StaticKeyDirectory::new(config.keys.clone());
    if !static_keys.is_empty() {
        info!(count = static_keys.len(), "Loaded API keys from configuration");
    }
    let directories: Vec<Arc<dyn KeyDirectory>> =
        vec![Arc::new(static_keys), Arc::new(storage.clone())];
    let keys: Arc<dyn KeyDirectory> = Arc::new(CompositeKeyDirectory::new(directories));

    let recorder = build_usage_recorder(&config.storage, &storage);
    let gateway = Gateway::new(gate, dispatcher, recorder, metrics);

    Ok(AppState {
        gateway: Arc::new(gateway),
        keys,
        storage,
    })
}

/// Load configuration and serve until a shutdown signal arrives
pub async fn run() -> Result<()> {
    let config = load_config()?;
    validate_config(&config)?;

    let state = build_state(&config).await?;
    let app = api::router(state, &config.server.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("Chatgate shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
