//! Query planning for metric reads.
//!
//! The planner only produces SQL text plus positional parameters. It never
//! touches a connection; the store executes the descriptor.

use crate::error::ValidationError;

const SELECT_METRICS: &str = "SELECT m.id, m.value, m.date, u.name AS unit_name, u.unit_type, u.unit, us.full_name, m.username \
     FROM metrics m \
     JOIN units u ON m.unit_id = u.id \
     LEFT JOIN users us ON m.username = us.username \
     WHERE u.unit_type = ?1";

/// SQL text with its bound parameters, in `?N` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    pub sql: String,
    pub params: Vec<String>,
}

/// Builds the metrics query for a unit family, optionally restricted to one owner.
///
/// Results are ordered newest observation first; `m.id` breaks ties so equal
/// dates come back in a stable order.
pub fn plan_metrics_query(
    unit_type: &str,
    username: Option<&str>,
) -> Result<QueryDescriptor, ValidationError> {
    if unit_type.is_empty() {
        return Err(ValidationError::MissingUnitType);
    }

    let mut sql = String::from(SELECT_METRICS);
    let mut params = vec![unit_type.to_string()];

    if let Some(username) = username {
        params.push(username.to_string());
        sql.push_str(&format!(" AND m.username = ?{}", params.len()));
    }

    sql.push_str(" ORDER BY m.date DESC, m.id DESC");

    Ok(QueryDescriptor { sql, params })
}
