//! Error types for table and case loading
//!
//! The accrual engine itself never fails: lookup misses and inverted date
//! ranges degrade to neutral values. Only reading reference data and case
//! files from disk can produce these errors.

use thiserror::Error;

/// Result type alias for loading and table maintenance operations
pub type Result<T> = std::result::Result<T, RestatementError>;

#[derive(Error, Debug)]
pub enum RestatementError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// A month key that is not `YYYY-MM`
    #[error("Invalid month key '{value}' in {table} at row {row}")]
    InvalidMonthKey { table: String, row: usize, value: String },

    /// A date that is not `YYYY-MM-DD`
    #[error("Invalid date '{value}' in {table} at row {row}")]
    InvalidDate { table: String, row: usize, value: String },

    #[error("Invalid number '{value}' in {table} at row {row}")]
    InvalidNumber { table: String, row: usize, value: String },

    #[error("Table {0} has no entries")]
    EmptyTable(String),

    /// A script table file without the expected literal
    #[error("Malformed script table: {0}")]
    MalformedScript(String),
}
