//! Service configuration defaults
//!
//! Default values shared by the analyzer services so every entry point agrees
//! on them.

/// Logging and config discovery defaults
pub mod logging {
    /// Default tracing filter when `RUST_LOG` is unset
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Env var naming an alternative config file
    pub const CONFIG_PATH_ENV: &str = "MOMENTUM_CONFIG_PATH";

    pub const DEFAULT_CONFIG_PATH: &str = "configs/momentum.toml";

    /// Prefix for `MOMENTUM__SECTION__KEY` overrides
    pub const ENV_PREFIX: &str = "MOMENTUM";
}

/// Exchange fetch defaults
pub mod market {
    pub const DEFAULT_SYMBOL: &str = "BTC-USDT";
    pub const DEFAULT_EXCHANGE: &str = "okx";
    pub const OKX_API_BASE: &str = "https://www.okx.com";

    /// Every granularity the OKX adapter can map
    pub const ALL_TIMEFRAMES: [&str; 8] = ["2d", "1d", "12h", "6h", "4h", "2h", "1h", "30m"];

    /// Candles fetched per granularity when a database is initialized
    pub const DEFAULT_INITIAL_LIMIT: usize = 200;

    /// Candles fetched per granularity on each refresh; enough to cover the
    /// newest bars between runs
    pub const DEFAULT_UPDATE_LIMIT: usize = 10;

    /// Venue cap on candles per request
    pub const MAX_CANDLES_PER_REQUEST: usize = 300;

    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;

    /// OKX allows 20 requests per 2 seconds on the candles endpoint
    pub const RATE_LIMIT_REQUESTS: u32 = 20;
    pub const RATE_LIMIT_WINDOW_MS: u64 = 2_000;
}

/// Store defaults
pub mod store {
    pub const DEFAULT_DATABASE_PATH: &str = "./data/database/btc_database.json";
}

/// Indicator defaults: EMA26/EMA52 and MACD(12, 26, 9)
pub mod indicators {
    pub const EMA_PERIODS: [usize; 2] = [26, 52];
    pub const MACD_FAST: usize = 12;
    pub const MACD_SLOW: usize = 26;
    pub const MACD_SIGNAL: usize = 9;
}

/// Signal rule constants, in the instrument's native price units where priced
pub mod rules {
    /// Candles required before any detector runs
    pub const MIN_HISTORY: usize = 10;

    /// Trailing window for the DEA extreme and the price targets
    pub const LOOKBACK: usize = 50;

    /// Latest DEA must sit within this fraction of the trailing extreme
    pub const EXTREME_PROXIMITY: f64 = 0.9;

    /// Max relative distance between close and the longest EMA
    pub const ZERO_AXIS_TOLERANCE: f64 = 0.01;

    /// Trailing window searched for a DEA zero crossing
    pub const CROSS_WINDOW: usize = 10;

    /// Fixed stop distance from the longest EMA
    pub const STOP_OFFSET: f64 = 300.0;
}
