//! Error types for the OKX adapter

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Granularity label has no venue bar mapping
    #[error("Unsupported granularity: {granularity}")]
    UnsupportedGranularity {
        /// The label that could not be mapped
        granularity: String,
    },

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Venue returned an error envelope (`code != "0"`)
    #[error("OKX API error {code}: {message}")]
    Api {
        /// Venue error code
        code: String,
        /// Venue error message
        message: String,
    },

    /// JSON parsing error from exchange response
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Required field missing from a candle row
    #[error("Missing required field: {field}")]
    MissingField {
        /// The field that was missing
        field: String,
    },

    /// Invalid numeric value in a candle row
    #[error("Invalid numeric value for {field}: {value}")]
    InvalidNumeric {
        /// Column being parsed
        field: String,
        /// The value that couldn't be parsed
        value: String,
    },

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AdapterError {
    /// Check if this error is recoverable through retry on a later cycle
    pub fn is_recoverable(&self) -> bool {
        match self {
            AdapterError::Http(_) | AdapterError::JsonParse(_) | AdapterError::Api { .. } => true,
            AdapterError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Errors describing a single bad row rather than a failed request
    pub fn is_malformed_record(&self) -> bool {
        matches!(
            self,
            AdapterError::MissingField { .. } | AdapterError::InvalidNumeric { .. }
        )
    }
}
