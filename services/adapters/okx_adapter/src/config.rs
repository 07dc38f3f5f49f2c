//! Configuration management for the OKX adapter

use momentum_config::service::market;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration specific to the OKX candle client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OkxAdapterConfig {
    /// Exchange name recorded in exported documents
    pub name: String,

    /// REST API base URL, without the `/api/v5` path
    pub base_url: String,

    /// Instrument to fetch (e.g. "BTC-USDT")
    pub symbol: String,

    /// Per-request timeout
    pub request_timeout_ms: u64,

    /// Requests allowed per rate limit window
    pub rate_limit_requests: u32,

    pub rate_limit_window_ms: u64,

    /// Venue cap on candles per request; larger limits are clamped
    pub max_candles_per_request: usize,
}

impl OkxAdapterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

impl Default for OkxAdapterConfig {
    fn default() -> Self {
        Self {
            name: market::DEFAULT_EXCHANGE.to_string(),
            base_url: market::OKX_API_BASE.to_string(),
            symbol: market::DEFAULT_SYMBOL.to_string(),
            request_timeout_ms: market::REQUEST_TIMEOUT_MS,
            rate_limit_requests: market::RATE_LIMIT_REQUESTS,
            rate_limit_window_ms: market::RATE_LIMIT_WINDOW_MS,
            max_candles_per_request: market::MAX_CANDLES_PER_REQUEST,
        }
    }
}
