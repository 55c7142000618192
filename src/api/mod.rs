use crate::cache::ResponseCache;
use crate::error::PipelineError;
use crate::logger::{recent_entries, RequestLogEntry, SharedLogBuffer};
use crate::pipeline::{MetricsPipeline, MetricsQuery};
use crate::stats::{StatsCollector, StatsSnapshot};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

const INTERNAL_ERROR_MESSAGE: &str = "Error fetching or converting metrics";
const MAX_LOGS: usize = 1000;

pub struct ApiState {
    pipeline: Arc<MetricsPipeline>,
    stats: Arc<StatsCollector>,
    cache: Arc<dyn ResponseCache>,
    logs_buffer: Option<SharedLogBuffer>,
}

impl ApiState {
    pub fn new(
        pipeline: Arc<MetricsPipeline>,
        stats: Arc<StatsCollector>,
        cache: Arc<dyn ResponseCache>,
        logs_buffer: Option<SharedLogBuffer>,
    ) -> Self {
        Self {
            pipeline,
            stats,
            cache,
            logs_buffer,
        }
    }
}

#[derive(Serialize)]
struct ApiStats {
    #[serde(flatten)]
    stats: StatsSnapshot,
    cache_entries: u64,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/metrics", get(get_metrics))
        .route("/api/health", get(get_health))
        .route("/api/stats", get(get_stats))
        .route("/api/logs", get(get_logs))
        .with_state(state)
}

pub async fn start_api_server(state: Arc<ApiState>, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API listener on {}", addr))?;
    tracing::info!("API Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("API server failed")?;
    Ok(())
}

async fn get_metrics(
    State(state): State<Arc<ApiState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    // Pairs rather than a struct so a repeated parameter cannot fail extraction
    let query: MetricsQuery = pairs.into_iter().collect();
    match state.pipeline.handle(query).await {
        Ok(metrics) => Json(&*metrics).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn get_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn get_stats(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(ApiStats {
        stats: state.stats.get_snapshot(),
        cache_entries: state.cache.entry_count(),
    })
}

async fn get_logs(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    // Newest first; empty when the memory sink is off
    let logs: Vec<RequestLogEntry> = state
        .logs_buffer
        .as_ref()
        .map(|buffer| recent_entries(buffer, MAX_LOGS))
        .unwrap_or_default();
    Json(logs)
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        // Service failures are logged by the pipeline; only a generic message leaves the process
        let (status, message) = match &self {
            PipelineError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            PipelineError::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            PipelineError::Service(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
