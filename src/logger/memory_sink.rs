use super::{RequestLogEntry, RequestLogSink};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

pub type SharedLogBuffer = Arc<RwLock<VecDeque<RequestLogEntry>>>;

/// Keeps the most recent request log entries for the API.
pub struct MemoryLogSink {
    buffer: SharedLogBuffer,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Newest first.
    pub fn get_recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        recent_entries(&self.buffer, limit)
    }

    // Allow sharing the buffer with API handlers
    pub fn clone_buffer(&self) -> SharedLogBuffer {
        self.buffer.clone()
    }
}

pub fn recent_entries(buffer: &SharedLogBuffer, limit: usize) -> Vec<RequestLogEntry> {
    buffer.read().iter().rev().take(limit).cloned().collect()
}

impl RequestLogSink for MemoryLogSink {
    fn log(&self, entry: &RequestLogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut buffer = self.buffer.write();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
    }
}
