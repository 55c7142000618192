pub mod source;
pub mod sqlite;
pub mod types;

pub use self::source::MetricStore;
pub use self::sqlite::SqliteMetricStore;
pub use self::types::{ColumnValue, RawRow};
