use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub unit_type: Option<String>,
    pub username: Option<String>,
    pub convert_to_unit: Option<String>,
    pub outcome: RequestOutcome,
    pub record_count: usize,
    pub latency_ms: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum RequestOutcome {
    CacheHit,
    Fetched,
    NotFound,
    Rejected,
    Failed,
}

pub trait RequestLogSink: Send + Sync {
    fn log(&self, entry: &RequestLogEntry);
}
