use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use metrics_service::api::{start_api_server, ApiState};
use metrics_service::config::Config;
use metrics_service::init::{
    init_cache, init_converter, init_request_logger, init_storage, setup_logging,
};
use metrics_service::pipeline::MetricsPipeline;
use metrics_service::stats::StatsCollector;
use metrics_service::store::SqliteMetricStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config_exists = std::path::Path::new(&config_path).exists();
    let config = if config_exists {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting metrics-service...");

    if !config_exists {
        info!("Config file not found, using defaults.");
    }

    // 3. Init Storage
    let db = init_storage(&config)?;
    let store = Arc::new(SqliteMetricStore::new(db));

    // 4. Init Units, Cache, Stats, Request Log
    let converter = init_converter(&config);
    let (cache, sweeper) = init_cache(&config);
    let log_interval = if config.stats.enable {
        config.stats.log_interval_seconds
    } else {
        0
    };
    let stats = StatsCollector::new(log_interval);
    let (logger, logs_buffer) = init_request_logger(&config);

    // 5. Build Pipeline
    let pipeline = Arc::new(MetricsPipeline::new(
        store,
        cache.clone(),
        converter,
        stats.clone(),
        logger,
    ));

    // 6. Start API Server
    let state = Arc::new(ApiState::new(pipeline, stats, cache, logs_buffer));
    let addr = config.listen_addr();

    // 7. Graceful Shutdown
    tokio::select! {
        res = start_api_server(state, &addr) => {
            if let Err(e) = &res {
                error!("API server stopped: {:#}", e);
            }
            res?;
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    if let Some(handle) = sweeper {
        handle.abort();
    }

    Ok(())
}
