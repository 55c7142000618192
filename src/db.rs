use crate::error::StorageError;
use crate::query::QueryDescriptor;
use crate::store::{ColumnValue, RawRow};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, Result};
use std::time::Duration;
use tracing::info;

const IN_MEMORY: &str = ":memory:";

/// A single connection; concurrent reads queue on the mutex.
pub struct DbClient {
    db_path: String,
    conn: Mutex<Connection>,
}

impl DbClient {
    pub fn new(db_path: String, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(&db_path)?;
        if db_path != IN_MEMORY {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            db_path,
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(IN_MEMORY.to_string(), Duration::from_secs(5))
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                unit_type TEXT NOT NULL,
                unit TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                full_name TEXT
            )",
            [],
        )?;

        // Dates are RFC 3339 UTC text, so ORDER BY date sorts chronologically
        conn.execute(
            "CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                value REAL NOT NULL,
                date TEXT NOT NULL,
                unit_id INTEGER NOT NULL REFERENCES units(id),
                username TEXT
            )",
            [],
        )?;

        // Indices
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_units_unit_type ON units(unit_type)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_metrics_username ON metrics(username)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_metrics_date ON metrics(date)",
            [],
        )?;

        info!("SQLite database initialized at {}", self.db_path);
        Ok(())
    }

    /// Runs a planned query and returns every row keyed by column name.
    pub fn execute(&self, query: &QueryDescriptor) -> std::result::Result<Vec<RawRow>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&query.sql)?;
        let names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query(params_from_iter(query.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut raw = RawRow::new();
            for (idx, name) in names.iter().enumerate() {
                raw.insert(name, column_value(row.get_ref(idx)?));
            }
            out.push(raw);
        }
        Ok(out)
    }

    pub fn insert_unit(&self, name: &str, unit_type: &str, unit: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO units (name, unit_type, unit) VALUES (?1, ?2, ?3)",
            params![name, unit_type, unit],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_user(&self, username: &str, full_name: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO users (username, full_name) VALUES (?1, ?2)",
            params![username, full_name],
        )?;
        Ok(())
    }

    pub fn insert_metric(
        &self,
        value: f64,
        date: DateTime<Utc>,
        unit_id: i64,
        username: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO metrics (value, date, unit_id, username) VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![
            value,
            date.to_rfc3339_opts(SecondsFormat::Millis, true),
            unit_id,
            username
        ])?;
        Ok(conn.last_insert_rowid())
    }
}

fn column_value(value: ValueRef<'_>) -> ColumnValue {
    match value {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(i) => ColumnValue::Integer(i),
        ValueRef::Real(f) => ColumnValue::Real(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            ColumnValue::Text(String::from_utf8_lossy(t).into_owned())
        }
    }
}
