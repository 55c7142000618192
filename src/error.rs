//! Error types for the metrics pipeline

use thiserror::Error;

/// Request rejected before any I/O happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unitType is required")]
    MissingUnitType,
}

/// Storage collaborator failures
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported an error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking task running the query did not complete
    #[error("query task failed: {0}")]
    Task(String),
}

/// A raw row could not be mapped into a `Metric`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("row {row}: missing column '{column}'")]
    MissingColumn { row: usize, column: &'static str },

    #[error("row {row}: column '{column}' expected {expected}")]
    UnexpectedType {
        row: usize,
        column: &'static str,
        expected: &'static str,
    },

    #[error("row {row}: invalid date '{value}'")]
    InvalidDate { row: usize, value: String },
}

/// Unit conversion failures. All of them fail the whole batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("unknown unit family '{0}'")]
    UnknownFamily(String),

    #[error("unit '{unit}' is not part of the '{family}' family")]
    IncompatibleUnit { unit: String, family: String },

    #[error("record {id} has unit '{unit}' with no conversion factor in '{family}'")]
    UnconvertibleRecord {
        id: i64,
        unit: String,
        family: String,
    },
}

/// Cache faults are recovered locally and never reach the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Everything that maps to a 500
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("shaping error: {0}")]
    Shape(#[from] ShapeError),

    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),
}

/// Outcome of a failed metrics request
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No metrics found for unit type: {unit_type}")]
    NotFound { unit_type: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<StorageError> for PipelineError {
    fn from(e: StorageError) -> Self {
        PipelineError::Service(e.into())
    }
}

impl From<ShapeError> for PipelineError {
    fn from(e: ShapeError) -> Self {
        PipelineError::Service(e.into())
    }
}

impl From<ConversionError> for PipelineError {
    fn from(e: ConversionError) -> Self {
        PipelineError::Service(e.into())
    }
}
