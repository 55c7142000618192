//! Initialization helpers for the application startup.

use crate::cache::{CacheStore, DisabledCache, ResponseCache};
use crate::config::Config;
use crate::db::DbClient;
use crate::logger::{MemoryLogSink, RequestLogSink, RequestLogger, SharedLogBuffer};
use crate::units::{UnitConverter, UnitRegistry};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Keep moka's internals quiet unless explicitly asked for
        if !filter.contains("moka") {
            filter.push_str(",moka=warn");
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// Opens the SQLite database and makes sure the schema exists.
pub fn init_storage(config: &Config) -> Result<Arc<DbClient>> {
    let client = DbClient::new(
        config.database.path.clone(),
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .with_context(|| format!("Failed to open database at {}", config.database.path))?;
    client
        .initialize()
        .context("Failed to initialize SQLite schema")?;
    Ok(Arc::new(client))
}

/// Builds the response cache and, when enabled, its periodic sweep task.
pub fn init_cache(config: &Config) -> (Arc<dyn ResponseCache>, Option<JoinHandle<()>>) {
    if !config.cache.enable {
        info!("Response cache disabled.");
        return (Arc::new(DisabledCache), None);
    }

    let store = CacheStore::from_config(&config.cache);
    let sweeper = store.spawn_sweeper(Duration::from_secs(config.cache.check_period_seconds));
    info!(
        "Response cache enabled: ttl={}s, sweep every {}s, capacity {}",
        config.cache.ttl_seconds, config.cache.check_period_seconds, config.cache.capacity
    );
    (Arc::new(store), Some(sweeper))
}

/// Builds the converter from the built-in families plus configured units.
pub fn init_converter(config: &Config) -> Arc<UnitConverter> {
    let registry = UnitRegistry::from_definitions(&config.units);
    info!("Unit families loaded: {}", registry.family_names().join(", "));
    Arc::new(UnitConverter::new(registry))
}

/// Builds the request logger.
///
/// Returns the logger and, if the memory sink is configured, the buffer the
/// API reads recent entries from.
pub fn init_request_logger(config: &Config) -> (Arc<RequestLogger>, Option<SharedLogBuffer>) {
    let use_memory_sink = config
        .logging
        .request_log_sinks
        .iter()
        .any(|s| s == "memory");

    let mut extra_sinks: Vec<Box<dyn RequestLogSink>> = Vec::new();
    let mut buffer = None;

    if use_memory_sink {
        let sink = MemoryLogSink::new(config.logging.memory_log_capacity);
        buffer = Some(sink.clone_buffer());
        extra_sinks.push(Box::new(sink));
    }

    (
        RequestLogger::new(config.logging.clone(), extra_sinks),
        buffer,
    )
}
