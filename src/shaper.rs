//! Maps raw storage rows into `Metric` values.

use crate::error::ShapeError;
use crate::models::Metric;
use crate::store::{ColumnValue, RawRow};
use chrono::{DateTime, Utc};

/// Shapes every row in order. The first malformed row fails the whole batch.
pub fn shape_rows(rows: &[RawRow]) -> Result<Vec<Metric>, ShapeError> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| shape_row(idx, row))
        .collect()
}

fn shape_row(row_idx: usize, row: &RawRow) -> Result<Metric, ShapeError> {
    let id = match required(row_idx, row, "id")? {
        ColumnValue::Integer(i) => *i,
        _ => return Err(unexpected(row_idx, "id", "integer")),
    };

    let value = match required(row_idx, row, "value")? {
        ColumnValue::Real(f) => *f,
        ColumnValue::Integer(i) => *i as f64,
        _ => return Err(unexpected(row_idx, "value", "number")),
    };

    let date = match required(row_idx, row, "date")? {
        ColumnValue::Text(s) => parse_date(row_idx, s)?,
        ColumnValue::Integer(secs) => DateTime::<Utc>::from_timestamp(*secs, 0).ok_or_else(|| {
            ShapeError::InvalidDate {
                row: row_idx,
                value: secs.to_string(),
            }
        })?,
        _ => return Err(unexpected(row_idx, "date", "text or unix seconds")),
    };

    let unit_type = required_text(row_idx, row, "unit_type")?;
    if unit_type.is_empty() {
        return Err(unexpected(row_idx, "unit_type", "non-empty text"));
    }

    Ok(Metric {
        id,
        value,
        date,
        unit_name: required_text(row_idx, row, "unit_name")?,
        unit_type,
        unit: required_text(row_idx, row, "unit")?,
        full_name: optional_text(row_idx, row, "full_name")?,
        username: optional_text(row_idx, row, "username")?,
    })
}

fn required<'a>(
    row_idx: usize,
    row: &'a RawRow,
    column: &'static str,
) -> Result<&'a ColumnValue, ShapeError> {
    row.get(column).ok_or(ShapeError::MissingColumn {
        row: row_idx,
        column,
    })
}

fn required_text(row_idx: usize, row: &RawRow, column: &'static str) -> Result<String, ShapeError> {
    match required(row_idx, row, column)? {
        ColumnValue::Text(s) => Ok(s.clone()),
        _ => Err(unexpected(row_idx, column, "text")),
    }
}

/// Nullable text column. The column itself must still be present.
fn optional_text(
    row_idx: usize,
    row: &RawRow,
    column: &'static str,
) -> Result<Option<String>, ShapeError> {
    match required(row_idx, row, column)? {
        ColumnValue::Null => Ok(None),
        ColumnValue::Text(s) => Ok(Some(s.clone())),
        _ => Err(unexpected(row_idx, column, "text or null")),
    }
}

fn parse_date(row_idx: usize, raw: &str) -> Result<DateTime<Utc>, ShapeError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| ShapeError::InvalidDate {
            row: row_idx,
            value: raw.to_string(),
        })
}

fn unexpected(row: usize, column: &'static str, expected: &'static str) -> ShapeError {
    ShapeError::UnexpectedType {
        row,
        column,
        expected,
    }
}
