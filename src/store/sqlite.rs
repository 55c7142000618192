//! SQLite-backed implementation of the metric store.
//!
//! Queries run on the blocking pool so a slow read does not hold up the
//! async workers serving other requests.

use super::source::MetricStore;
use super::types::RawRow;
use crate::db::DbClient;
use crate::error::StorageError;
use crate::query::QueryDescriptor;
use async_trait::async_trait;
use std::sync::Arc;

/// A metric store that reads from a persistent SQLite database.
pub struct SqliteMetricStore {
    /// Client for database operations.
    db: Arc<DbClient>,
}

impl SqliteMetricStore {
    /// Creates a new `SqliteMetricStore`.
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetricStore for SqliteMetricStore {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Vec<RawRow>, StorageError> {
        let db = self.db.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || db.execute(&query))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}
