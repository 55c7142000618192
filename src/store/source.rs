use crate::error::StorageError;
use crate::query::QueryDescriptor;
use crate::store::types::RawRow;
use async_trait::async_trait;

/// Executes planned queries. Swappable for tests.
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Vec<RawRow>, StorageError>;
}
