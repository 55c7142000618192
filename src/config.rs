use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    /// Extra units layered on top of the built-in families.
    #[serde(default)]
    pub units: Vec<UnitDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enable")]
    pub enable: bool,
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_cache_check_period")]
    pub check_period_seconds: u64,
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_request_log_sinks")]
    pub request_log_sinks: Vec<String>,
    #[serde(default = "default_memory_log_capacity")]
    pub memory_log_capacity: usize,
    #[serde(default = "default_log_requests")]
    pub log_requests: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

/// A unit added through config. `factor` is how many base units of the
/// family one of this unit is worth.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UnitDefinition {
    pub family: String,
    pub code: String,
    pub name: String,
    pub factor: f64,
}

// Defaults
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_database_path() -> String {
    "metrics.db".to_string()
}
fn default_busy_timeout_ms() -> u64 {
    5000
}
fn default_cache_enable() -> bool {
    true
}
fn default_cache_ttl() -> u64 {
    600 // 10 minutes
}
fn default_cache_check_period() -> u64 {
    60
}
fn default_cache_capacity() -> u64 {
    10000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_request_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_memory_log_capacity() -> usize {
    100
}
fn default_log_requests() -> bool {
    true
}
fn default_stats_enable() -> bool {
    true
}
fn default_log_interval() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
            units: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: default_cache_enable(),
            ttl_seconds: default_cache_ttl(),
            check_period_seconds: default_cache_check_period(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            request_log_sinks: default_request_log_sinks(),
            memory_log_capacity: default_memory_log_capacity(),
            log_requests: default_log_requests(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_seconds == 0 {
            bail!("cache.ttl_seconds must be greater than zero");
        }
        if self.cache.check_period_seconds == 0 {
            bail!("cache.check_period_seconds must be greater than zero");
        }
        for unit in &self.units {
            if !unit.factor.is_finite() || unit.factor <= 0.0 {
                bail!(
                    "unit '{}' in family '{}' has invalid factor {}",
                    unit.code,
                    unit.family,
                    unit.factor
                );
            }
            if unit.family.trim().is_empty() || unit.code.trim().is_empty() {
                bail!("unit definitions need a non-empty family and code");
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
