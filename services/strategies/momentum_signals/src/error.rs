//! Error types for the momentum signals service

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    /// Periods or rule parameters that would invalidate every computation
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] momentum_config::ConfigError),

    #[error("Market data error: {0}")]
    MarketData(#[from] types::TypesError),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database not found at {path:?}; initialize it first")]
    NotInitialized { path: PathBuf },

    #[error("No data for timeframe {timeframe}")]
    TimeframeNotFound { timeframe: String },
}

impl StrategyError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        StrategyError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StrategyError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;
