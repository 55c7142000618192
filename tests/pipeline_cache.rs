use metrics_service::cache::{CacheKey, CacheStore, CachedMetrics, ResponseCache};
use metrics_service::error::{
    CacheError, ConversionError, PipelineError, ServiceError, StorageError, ValidationError,
};
use metrics_service::logger::RequestLogger;
use metrics_service::pipeline::{MetricsPipeline, MetricsQuery};
use metrics_service::query::QueryDescriptor;
use metrics_service::stats::StatsCollector;
use metrics_service::store::{ColumnValue, MetricStore, RawRow};
use metrics_service::units::{UnitConverter, UnitRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Mocks ---

struct MockStore {
    rows: Vec<RawRow>,
    fail: bool,
    call_count: Arc<AtomicUsize>,
    last_query: parking_lot::Mutex<Option<QueryDescriptor>>,
}

impl MockStore {
    fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            fail: false,
            call_count: Arc::new(AtomicUsize::new(0)),
            last_query: parking_lot::Mutex::new(None),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_rows(vec![])
        }
    }
}

#[async_trait::async_trait]
impl MetricStore for MockStore {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Vec<RawRow>, StorageError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock() = Some(query.clone());
        if self.fail {
            return Err(StorageError::Task("connection reset".to_string()));
        }
        Ok(self.rows.clone())
    }
}

/// A cache whose every operation fails.
struct BrokenCache {
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl ResponseCache for BrokenCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedMetrics>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("allocation failed".to_string()))
    }

    async fn set(&self, _key: CacheKey, _value: CachedMetrics) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("allocation failed".to_string()))
    }
}

/// A cache that serves reads but refuses writes.
struct ReadOnlyCache;

#[async_trait::async_trait]
impl ResponseCache for ReadOnlyCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<CachedMetrics>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: CacheKey, _value: CachedMetrics) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("out of memory".to_string()))
    }
}

// --- Helpers ---

fn row(id: i64, value: f64, unit: &str, unit_name: &str, date: &str, username: Option<&str>) -> RawRow {
    RawRow::new()
        .with("id", ColumnValue::Integer(id))
        .with("value", ColumnValue::Real(value))
        .with("date", ColumnValue::Text(date.to_string()))
        .with("unit_name", ColumnValue::Text(unit_name.to_string()))
        .with("unit_type", ColumnValue::Text("weight".to_string()))
        .with("unit", ColumnValue::Text(unit.to_string()))
        .with("full_name", ColumnValue::Null)
        .with(
            "username",
            username.map_or(ColumnValue::Null, |u| ColumnValue::Text(u.to_string())),
        )
}

fn alice_rows() -> Vec<RawRow> {
    vec![
        row(2, 2.2, "lb", "Pound", "2024-02-01T00:00:00.000Z", Some("alice")),
        row(1, 70.0, "kg", "Kilogram", "2024-01-01T00:00:00.000Z", Some("alice")),
    ]
}

fn pipeline(store: Arc<dyn MetricStore>, cache: Arc<dyn ResponseCache>) -> MetricsPipeline {
    MetricsPipeline::new(
        store,
        cache,
        Arc::new(UnitConverter::new(UnitRegistry::builtin())),
        StatsCollector::new(0),
        RequestLogger::disabled(),
    )
}

fn query(unit_type: Option<&str>, username: Option<&str>, to: Option<&str>) -> MetricsQuery {
    MetricsQuery {
        unit_type: unit_type.map(String::from),
        username: username.map(String::from),
        convert_to_unit: to.map(String::from),
    }
}

fn fresh_cache() -> Arc<CacheStore> {
    Arc::new(CacheStore::new(1000, Duration::from_secs(600)))
}

// --- Tests ---

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let p = pipeline(store, fresh_cache());

    let first = p.handle(query(Some("weight"), Some("alice"), Some("kg"))).await.unwrap();
    let second = p.handle(query(Some("weight"), Some("alice"), Some("kg"))).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1, "Should hit storage once");
    assert_eq!(
        serde_json::to_vec(&*first).unwrap(),
        serde_json::to_vec(&*second).unwrap()
    );
}

#[tokio::test]
async fn test_storage_requeried_after_ttl() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let cache = Arc::new(CacheStore::new(1000, Duration::from_millis(50)));
    let p = pipeline(store, cache);

    p.handle(query(Some("weight"), None, None)).await.unwrap();
    p.handle(query(Some("weight"), None, None)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(80)).await;
    p.handle(query(Some("weight"), None, None)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2, "Expired entry must not be served");
}

#[tokio::test]
async fn test_distinct_parameters_use_distinct_entries() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let p = pipeline(store, fresh_cache());

    p.handle(query(Some("weight"), None, None)).await.unwrap();
    p.handle(query(Some("weight"), Some("alice"), None)).await.unwrap();
    p.handle(query(Some("weight"), Some("alice"), Some("kg"))).await.unwrap();
    p.handle(query(Some("weight"), Some("alice"), Some("g"))).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    // Explicit-empty parameters share the entry of the missing ones
    p.handle(query(Some("weight"), Some(""), Some(""))).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_without_conversion_values_are_unmodified() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let p = pipeline(store, fresh_cache());

    let metrics = p.handle(query(Some("weight"), Some("alice"), None)).await.unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics[0].value, 2.2);
    assert_eq!(metrics[0].unit, "lb");
    assert_eq!(metrics[0].unit_name, "Pound");
    assert_eq!(metrics[1].value, 70.0);
    assert_eq!(metrics[1].unit, "kg");
}

#[tokio::test]
async fn test_pounds_converted_to_kilograms() {
    let store = Arc::new(MockStore::with_rows(vec![row(
        1,
        2.2,
        "lb",
        "Pound",
        "2024-02-01T00:00:00.000Z",
        Some("alice"),
    )]));
    let p = pipeline(store, fresh_cache());

    let metrics = p.handle(query(Some("weight"), Some("alice"), Some("kg"))).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert!((metrics[0].value - 1.0).abs() < 0.01);
    assert_eq!(metrics[0].unit, "kg");
    assert_eq!(metrics[0].unit_name, "Kilogram");
    assert_eq!(metrics[0].username.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_missing_unit_type_makes_no_storage_call() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let p = pipeline(store, fresh_cache());

    let err = p.handle(query(None, Some("alice"), Some("kg"))).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::MissingUnitType)
    ));
    assert_eq!(err.to_string(), "unitType is required");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_result_is_not_cached() {
    let store = Arc::new(MockStore::with_rows(vec![]));
    let calls = store.call_count.clone();
    let cache = fresh_cache();
    let p = pipeline(store, cache.clone());

    let err = p.handle(query(Some("height"), None, None)).await.unwrap_err();
    assert_eq!(err.to_string(), "No metrics found for unit type: height");

    let key = CacheKey::derive(Some("height"), None, None);
    assert!(cache.get(&key).await.unwrap().is_none());

    p.handle(query(Some("height"), None, None)).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_incompatible_target_fails_and_is_not_cached() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let p = pipeline(store, fresh_cache());

    let err = p.handle(query(Some("weight"), None, Some("km"))).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Service(ServiceError::Conversion(
            ConversionError::IncompatibleUnit { .. }
        ))
    ));

    p.handle(query(Some("weight"), None, Some("km"))).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_record_unit_fails_whole_batch() {
    let mut rows = alice_rows();
    rows.push(row(3, 1.0, "slug", "Slug", "2023-12-01T00:00:00.000Z", None));
    let p = pipeline(Arc::new(MockStore::with_rows(rows)), fresh_cache());

    let err = p.handle(query(Some("weight"), None, Some("kg"))).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Service(ServiceError::Conversion(
            ConversionError::UnconvertibleRecord { id: 3, .. }
        ))
    ));
}

#[tokio::test]
async fn test_malformed_row_is_service_error() {
    let bad = RawRow::new().with("id", ColumnValue::Integer(1));
    let p = pipeline(Arc::new(MockStore::with_rows(vec![bad])), fresh_cache());

    let err = p.handle(query(Some("weight"), None, None)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Service(ServiceError::Shape(_))));
}

#[tokio::test]
async fn test_storage_failure_is_service_error() {
    let p = pipeline(Arc::new(MockStore::failing()), fresh_cache());

    let err = p.handle(query(Some("weight"), None, None)).await.unwrap_err();
    assert!(matches!(err, PipelineError::Service(ServiceError::Storage(_))));
}

#[tokio::test]
async fn test_broken_cache_falls_through_and_skips_caching() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let calls = store.call_count.clone();
    let cache = Arc::new(BrokenCache {
        get_calls: AtomicUsize::new(0),
        set_calls: AtomicUsize::new(0),
    });
    let stats = StatsCollector::new(0);
    let p = MetricsPipeline::new(
        store,
        cache.clone(),
        Arc::new(UnitConverter::new(UnitRegistry::builtin())),
        stats.clone(),
        RequestLogger::disabled(),
    );

    let metrics = p.handle(query(Some("weight"), None, None)).await.unwrap();
    assert_eq!(metrics.len(), 2);
    p.handle(query(Some("weight"), None, None)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get_calls.load(Ordering::SeqCst), 2);
    assert_eq!(cache.set_calls.load(Ordering::SeqCst), 0);
    assert_eq!(stats.get_snapshot().cache_errors, 2);
}

#[tokio::test]
async fn test_failed_cache_write_still_answers() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let p = pipeline(store, Arc::new(ReadOnlyCache));

    let metrics = p.handle(query(Some("weight"), None, Some("g"))).await.unwrap();
    assert!((metrics[1].value - 70_000.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_username_passed_as_parameter() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let p = pipeline(store.clone(), fresh_cache());

    p.handle(query(Some("weight"), Some("alice"), None)).await.unwrap();
    let planned = store.last_query.lock().clone().unwrap();
    assert_eq!(planned.params, vec!["weight".to_string(), "alice".to_string()]);
}

#[tokio::test]
async fn test_stats_track_outcomes() {
    let store = Arc::new(MockStore::with_rows(alice_rows()));
    let stats = StatsCollector::new(0);
    let p = MetricsPipeline::new(
        store,
        fresh_cache(),
        Arc::new(UnitConverter::new(UnitRegistry::builtin())),
        stats.clone(),
        RequestLogger::disabled(),
    );

    p.handle(query(Some("weight"), None, Some("kg"))).await.unwrap();
    p.handle(query(Some("weight"), None, Some("kg"))).await.unwrap();
    p.handle(query(None, None, None)).await.unwrap_err();

    let s = stats.get_snapshot();
    assert_eq!(s.requests, 3);
    assert_eq!(s.cache_hits, 1);
    assert_eq!(s.cache_misses, 1);
    assert_eq!(s.rejected, 1);
    assert_eq!(s.conversions, 1);
    assert_eq!(s.storage_queries, 1);
}
