use crate::config::LoggingConfig;
use crate::logger::types::{RequestLogEntry, RequestLogSink, RequestOutcome};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }
}

impl RequestLogSink for ConsoleLogSink {
    fn log(&self, entry: &RequestLogEntry) {
        if !self.config.log_requests {
            return;
        }

        if self.config.format == "json" {
            // Structured fields, rendered by the JSON subscriber
            info!(
                target: "metrics_request",
                unit_type = ?entry.unit_type,
                username = ?entry.username,
                convert_to = ?entry.convert_to_unit,
                outcome = ?entry.outcome,
                records = entry.record_count,
                lat = entry.latency_ms
            );
        } else {
            let outcome = match entry.outcome {
                RequestOutcome::CacheHit => format!("served {} records from cache", entry.record_count),
                RequestOutcome::Fetched => format!("fetched {} records from storage", entry.record_count),
                RequestOutcome::NotFound => "no matching records".to_string(),
                RequestOutcome::Rejected => "rejected: unitType missing".to_string(),
                RequestOutcome::Failed => "failed".to_string(),
            };

            info!(
                "unitType={} username={} convertToUnit={} -> {} [{}ms]",
                entry.unit_type.as_deref().unwrap_or("-"),
                entry.username.as_deref().unwrap_or("-"),
                entry.convert_to_unit.as_deref().unwrap_or("-"),
                outcome,
                entry.latency_ms
            );
        }
    }
}
