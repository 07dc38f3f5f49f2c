//! # Momentum Signals - EMA/MACD Analysis for a Single Instrument
//!
//! ## Purpose
//!
//! Maintains a local database of candlestick history for one instrument across
//! several granularities, annotates every candle with EMA and MACD values, and
//! evaluates a small ordered rule set to flag discretionary buy/sell setups.
//!
//! ## Integration Points
//!
//! - **Input Sources**: OKX REST candles through [`okx_adapter::CandleSource`]
//! - **Storage**: one JSON database file, see [`store::SeriesStore`]
//! - **Output**: signal results and trading plans as JSON on stdout
//! - **Configuration**: `configs/momentum.toml` plus `MOMENTUM__*` overrides
//!
//! ## Architecture Role
//!
//! ```text
//! CandleSource → [IndicatorCalculator] → [SeriesStore] → [SignalEngine]
//!                        ↑                    │
//!                [IncrementalUpdater] ←───────┘  (refresh cycle)
//! ```
//!
//! Each refresh loads the stored series, appends only candles newer than the
//! last stored timestamp, recomputes every indicator over the full raw history
//! and writes the result back. Because the indicator recurrences are
//! prefix-stable, values already on disk never change; only the new tail does.
//!
//! ## Rule Set
//!
//! | Rule | Priority | Trend | Trigger |
//! |---|---|---|---|
//! | Extreme reversal buy | 1 | DEA < 0 | DEA within 10% of its trailing low, contracting bullish candle |
//! | Zero-axis buy | 4 | DEA > 0 | close within 1% of the long EMA after a recent upward DEA cross |
//! | Zero-axis sell | 4 | DEA < 0 | close within 1% of the long EMA after a recent downward DEA cross |
//!
//! Fewer than `rules.min_history` candles, or undefined indicator values on
//! the latest candles, simply mean no match.

pub mod config;
pub mod database;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod signals;
pub mod store;
pub mod updater;

pub use config::{IndicatorConfig, MarketConfig, RuleConfig, StrategyConfig};
pub use database::{DatabaseManager, TimeframeOutcome, UpdateReport};
pub use error::{Result, StrategyError};
pub use indicators::{calculate_ema, calculate_macd, signal_line, IndicatorCalculator, MacdSeries};
pub use signals::{
    Direction, RuleKind, SignalDetector, SignalEngine, SignalResult, SignalType, TradingPlan,
};
pub use store::{DatabaseStatus, ExportDocument, SeriesStore, TimeframeStatus};
pub use updater::{IncrementalUpdater, UpdateOutcome};
