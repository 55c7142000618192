//! Request pipeline for metric reads.
//!
//! Orchestrates, per request:
//! 1. Validation (before any I/O)
//! 2. Cache key derivation and lookup
//! 3. Query planning and storage execution
//! 4. Row shaping
//! 5. Optional unit conversion
//! 6. Cache population (full success only)

use crate::cache::{CacheKey, CachedMetrics, ResponseCache};
use crate::error::{PipelineError, ValidationError};
use crate::logger::{RequestLogEntry, RequestLogger, RequestOutcome};
use crate::query::plan_metrics_query;
use crate::shaper::shape_rows;
use crate::stats::StatsCollector;
use crate::store::MetricStore;
use crate::units::UnitConverter;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Raw query parameters as they arrive at the boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub unit_type: Option<String>,
    pub username: Option<String>,
    pub convert_to_unit: Option<String>,
}

impl FromIterator<(String, String)> for MetricsQuery {
    /// Builds a query from decoded pairs. A repeated parameter keeps its first value.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut query = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "unitType" => &mut query.unit_type,
                "username" => &mut query.username,
                "convertToUnit" => &mut query.convert_to_unit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// A validated request. Empty optional parameters are normalized to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsRequest {
    pub unit_type: String,
    pub username: Option<String>,
    pub convert_to_unit: Option<String>,
}

impl TryFrom<MetricsQuery> for MetricsRequest {
    type Error = ValidationError;

    fn try_from(query: MetricsQuery) -> Result<Self, Self::Error> {
        let unit_type = non_empty(query.unit_type).ok_or(ValidationError::MissingUnitType)?;
        Ok(Self {
            unit_type,
            username: non_empty(query.username),
            convert_to_unit: non_empty(query.convert_to_unit),
        })
    }
}

impl MetricsRequest {
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(
            Some(self.unit_type.as_str()),
            self.username.as_deref(),
            self.convert_to_unit.as_deref(),
        )
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub struct MetricsPipeline {
    store: Arc<dyn MetricStore>,
    cache: Arc<dyn ResponseCache>,
    converter: Arc<UnitConverter>,
    stats: Arc<StatsCollector>,
    logger: Arc<RequestLogger>,
}

impl MetricsPipeline {
    pub fn new(
        store: Arc<dyn MetricStore>,
        cache: Arc<dyn ResponseCache>,
        converter: Arc<UnitConverter>,
        stats: Arc<StatsCollector>,
        logger: Arc<RequestLogger>,
    ) -> Self {
        Self {
            store,
            cache,
            converter,
            stats,
            logger,
        }
    }

    /// Answers one metrics request. On success the payload is shared with the cache.
    pub async fn handle(&self, query: MetricsQuery) -> Result<CachedMetrics, PipelineError> {
        let start = Instant::now();
        self.stats.inc_requests();

        let result = self.run(&query).await;

        let (outcome, record_count) = match &result {
            Ok((metrics, outcome)) => (*outcome, metrics.len()),
            Err(PipelineError::Validation(_)) => {
                self.stats.inc_rejected();
                (RequestOutcome::Rejected, 0)
            }
            Err(PipelineError::NotFound { .. }) => {
                self.stats.inc_not_found();
                (RequestOutcome::NotFound, 0)
            }
            Err(PipelineError::Service(e)) => {
                self.stats.inc_failures();
                error!("Error fetching or converting metrics: {}", e);
                (RequestOutcome::Failed, 0)
            }
        };

        self.logger.log(RequestLogEntry {
            unit_type: query.unit_type,
            username: query.username,
            convert_to_unit: query.convert_to_unit,
            outcome,
            record_count,
            latency_ms: start.elapsed().as_millis() as u64,
        });

        result.map(|(metrics, _)| metrics)
    }

    async fn run(
        &self,
        query: &MetricsQuery,
    ) -> Result<(CachedMetrics, RequestOutcome), PipelineError> {
        let request = MetricsRequest::try_from(query.clone())?;
        let key = request.cache_key();

        // A failed lookup means the cache is skipped for this call entirely
        let mut use_cache = true;
        match self.cache.get(&key).await {
            Ok(Some(metrics)) => {
                self.stats.inc_cache_hit();
                return Ok((metrics, RequestOutcome::CacheHit));
            }
            Ok(None) => self.stats.inc_cache_miss(),
            Err(e) => {
                warn!("Cache lookup failed for {}, recomputing: {}", key, e);
                self.stats.inc_cache_error();
                use_cache = false;
            }
        }

        let planned = plan_metrics_query(&request.unit_type, request.username.as_deref())?;

        let storage_start = Instant::now();
        let rows = self.store.execute(&planned).await?;
        self.stats
            .record_storage_latency(storage_start.elapsed().as_millis() as u64);

        // Empty results are not cached
        if rows.is_empty() {
            return Err(PipelineError::NotFound {
                unit_type: request.unit_type,
            });
        }

        let metrics = shape_rows(&rows)?;
        let metrics = match &request.convert_to_unit {
            Some(to_unit) => {
                self.stats.inc_conversions();
                self.converter
                    .convert(&metrics, &request.unit_type, to_unit)?
            }
            None => metrics,
        };

        let payload: CachedMetrics = Arc::from(metrics);
        if use_cache {
            match self.cache.set(key.clone(), payload.clone()).await {
                Ok(()) => debug!("Cached {} records under {}", payload.len(), key),
                Err(e) => {
                    warn!("Cache store failed for {}: {}", key, e);
                    self.stats.inc_cache_error();
                }
            }
        }

        Ok((payload, RequestOutcome::Fetched))
    }
}
