//! Strategy configuration

use crate::error::{Result, StrategyError};
use momentum_config::service::{indicators, logging, market, rules, store};
use momentum_config::{expand_path, load_layered};
use okx_adapter::OkxAdapterConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use types::Granularity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StrategyConfig {
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub exchange: OkxAdapterConfig,
    pub market: MarketConfig,
    pub indicators: IndicatorConfig,
    pub rules: RuleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `~` and `$VAR` are expanded
    pub database_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: store::DEFAULT_DATABASE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Timeframes created by `init` when none are requested explicitly
    pub timeframes: Vec<String>,

    /// Candles fetched per timeframe on `init`
    pub initial_limit: usize,

    /// Per-timeframe overrides of `initial_limit`
    pub initial_limits: BTreeMap<String, usize>,

    /// Candles fetched per timeframe on each `update`
    pub update_limit: usize,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timeframes: market::ALL_TIMEFRAMES.iter().map(|s| s.to_string()).collect(),
            initial_limit: market::DEFAULT_INITIAL_LIMIT,
            initial_limits: BTreeMap::new(),
            update_limit: market::DEFAULT_UPDATE_LIMIT,
        }
    }
}

impl MarketConfig {
    pub fn initial_limit_for(&self, granularity: &Granularity) -> usize {
        self.initial_limits
            .get(granularity.as_str())
            .copied()
            .unwrap_or(self.initial_limit)
    }
}

/// EMA periods and MACD parameters; fixed for the lifetime of a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_periods: indicators::EMA_PERIODS.to_vec(),
            macd_fast: indicators::MACD_FAST,
            macd_slow: indicators::MACD_SLOW,
            macd_signal: indicators::MACD_SIGNAL,
        }
    }
}

impl IndicatorConfig {
    pub fn new(ema_periods: Vec<usize>, macd_fast: usize, macd_slow: usize, macd_signal: usize) -> Result<Self> {
        let config = Self {
            ema_periods,
            macd_fast,
            macd_slow,
            macd_signal,
        };
        config.validate()?;
        Ok(config.normalized())
    }

    pub fn validate(&self) -> Result<()> {
        if self.ema_periods.is_empty() {
            return Err(StrategyError::invalid_config("at least one EMA period is required"));
        }
        if let Some(p) = self.ema_periods.iter().find(|p| **p == 0) {
            return Err(StrategyError::invalid_config(format!("EMA period must be positive, got {}", p)));
        }
        if self.macd_fast == 0 || self.macd_slow == 0 || self.macd_signal == 0 {
            return Err(StrategyError::invalid_config(format!(
                "MACD periods must be positive, got ({}, {}, {})",
                self.macd_fast, self.macd_slow, self.macd_signal
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(StrategyError::invalid_config(format!(
                "MACD fast period ({}) must be below slow period ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }

    /// EMA periods sorted ascending without duplicates
    pub fn normalized(mut self) -> Self {
        self.ema_periods.sort_unstable();
        self.ema_periods.dedup();
        self
    }

    pub fn longest_ema_period(&self) -> Option<usize> {
        self.ema_periods.iter().copied().max()
    }
}

/// Signal rule policy constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub min_history: usize,
    pub lookback: usize,
    pub extreme_proximity: f64,
    pub zero_axis_tolerance: f64,
    pub cross_window: usize,
    pub stop_offset: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            min_history: rules::MIN_HISTORY,
            lookback: rules::LOOKBACK,
            extreme_proximity: rules::EXTREME_PROXIMITY,
            zero_axis_tolerance: rules::ZERO_AXIS_TOLERANCE,
            cross_window: rules::CROSS_WINDOW,
            stop_offset: rules::STOP_OFFSET,
        }
    }
}

impl RuleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_history < 2 {
            return Err(StrategyError::invalid_config("rules.min_history must be at least 2"));
        }
        if self.lookback == 0 {
            return Err(StrategyError::invalid_config("rules.lookback must be positive"));
        }
        if self.cross_window < 2 {
            return Err(StrategyError::invalid_config("rules.cross_window must be at least 2"));
        }
        let finite_non_negative = |v: f64| v.is_finite() && v >= 0.0;
        if !finite_non_negative(self.extreme_proximity)
            || !finite_non_negative(self.zero_axis_tolerance)
            || !finite_non_negative(self.stop_offset)
        {
            return Err(StrategyError::invalid_config(
                "rules.extreme_proximity, zero_axis_tolerance and stop_offset must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Settings whose environment overrides are comma-separated lists
const ENV_LIST_KEYS: &[&str] = &["market.timeframes", "indicators.ema_periods"];

impl StrategyConfig {
    /// Load defaults, then `path` (if present), then `MOMENTUM__*` overrides, and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = load_layered(path, &Self::default(), logging::ENV_PREFIX, ENV_LIST_KEYS)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()?;
        self.rules.validate()?;
        if self.market.update_limit == 0 {
            return Err(StrategyError::invalid_config("market.update_limit must be positive"));
        }
        self.default_timeframes()?;
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        Ok(expand_path(&self.store.database_path)?)
    }

    pub fn default_timeframes(&self) -> Result<Vec<Granularity>> {
        self.market
            .timeframes
            .iter()
            .map(|label| Granularity::new(label.as_str()).map_err(StrategyError::from))
            .collect()
    }
}
