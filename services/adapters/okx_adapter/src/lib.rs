//! # OKX Candle Adapter
//!
//! REST client for the OKX candles endpoint. It feeds raw OHLCV history into
//! the momentum analyzer through the [`CandleSource`] trait, so the analyzer
//! never depends on a concrete venue.
//!
//! Output contract: candles strictly ascending by timestamp (seconds), with
//! malformed rows dropped individually.

pub mod adapter;
pub mod config;
pub mod error;
pub mod rate_limit;

pub use adapter::{okx_bar, parse_candles_response, CandleSource, OkxCandleClient};
pub use config::OkxAdapterConfig;
pub use error::{AdapterError, Result};
pub use rate_limit::RateLimiter;
