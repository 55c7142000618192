use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single observation as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: i64,
    pub value: f64,
    /// Observation time, not insertion time.
    pub date: DateTime<Utc>,
    pub unit_name: String,
    pub unit_type: String,
    /// Short unit code used for conversion lookups, e.g. "kg".
    pub unit: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
}
