//! Error types for market data validation
//!
//! Raised when a granularity label cannot be parsed or when a series no longer
//! satisfies its ordering and metadata invariants.

use thiserror::Error;

/// Result type alias for market data validation
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors that can occur while validating market data
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// Granularity label is empty or contains whitespace
    #[error("Invalid granularity label: '{label}'")]
    InvalidGranularity { label: String },

    /// Two consecutive candles are not strictly ascending by timestamp
    #[error("Timestamps not strictly increasing at index {index}: {previous} -> {next}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: i64,
        next: i64,
    },

    /// Series metadata disagrees with its candles
    #[error("Series metadata mismatch: {field} is {recorded}, expected {actual}")]
    MetadataMismatch {
        field: &'static str,
        recorded: i64,
        actual: i64,
    },
}
