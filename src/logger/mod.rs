pub mod console_sink;
pub mod memory_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::{recent_entries, MemoryLogSink, SharedLogBuffer};
pub use self::types::{RequestLogEntry, RequestLogSink, RequestOutcome};

use crate::config::LoggingConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Fans request log entries out to the configured sinks, each drained by its own task.
pub struct RequestLogger {
    sinks: Vec<mpsc::Sender<RequestLogEntry>>,
}

impl RequestLogger {
    pub fn new(config: LoggingConfig, extra_sinks: Vec<Box<dyn RequestLogSink>>) -> Arc<Self> {
        let mut boxed: Vec<Box<dyn RequestLogSink>> = Vec::new();

        for sink_type in &config.request_log_sinks {
            match sink_type.as_str() {
                "console" => boxed.push(Box::new(ConsoleLogSink::new(config.clone()))),
                // Built by the caller so the buffer can be shared with the API
                "memory" => {}
                other => warn!("Unknown request log sink type: {}", other),
            }
        }
        boxed.extend(extra_sinks);

        let sinks = boxed.into_iter().map(spawn_sink).collect();
        Arc::new(Self { sinks })
    }

    /// Logger with no sinks.
    pub fn disabled() -> Arc<Self> {
        Arc::new(Self { sinks: Vec::new() })
    }

    pub fn log(&self, entry: RequestLogEntry) {
        // Fire and forget, don't block the request if a buffer is full
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                let _ = sink.try_send(entry.clone());
            }
            let _ = last.try_send(entry);
        }
    }
}

fn spawn_sink(sink: Box<dyn RequestLogSink>) -> mpsc::Sender<RequestLogEntry> {
    let (tx, mut rx) = mpsc::channel::<RequestLogEntry>(1000);
    tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            sink.log(&entry);
        }
    });
    tx
}
