use rustc_hash::FxHashMap;

/// A single column value as returned by storage.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    columns: FxHashMap<String, ColumnValue>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: ColumnValue) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: ColumnValue) {
        self.columns.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.get(column)
    }
}
