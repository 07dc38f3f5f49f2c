//! Technical indicators for signal generation
//!
//! EMA and MACD are computed as whole-series recurrences over closing prices.
//! Every function here is pure: the same closes always produce the same
//! output, and recomputing over a longer history reproduces every shared
//! leading value bit for bit. The incremental updater relies on that.

use crate::config::IndicatorConfig;
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use types::{AnnotatedCandle, Candle, EmaValues, Granularity};

/// Exponential moving average seeded with the simple mean of the first
/// `period` values.
///
/// The output has the same length as `values`. The first `period - 1`
/// entries are `None`; when `values` is shorter than `period` every entry is.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = Vec::with_capacity(values.len());
    ema.resize(period - 1, None);

    let seed = values[..period].iter().sum::<f64>() / period as f64;
    ema.push(Some(seed));

    let mut prev = seed;
    for value in &values[period..] {
        prev = (value - prev) * multiplier + prev;
        ema.push(Some(prev));
    }

    ema
}

/// DIF, DEA and histogram lines, each aligned with the input closes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacdSeries {
    pub dif: Vec<Option<f64>>,
    pub dea: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

fn pairwise_diff(a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(x - y),
            _ => None,
        })
        .collect()
}

/// True when every defined entry comes after every undefined one
fn defined_suffix_only(values: &[Option<f64>]) -> bool {
    let first_defined = values.iter().position(Option::is_some).unwrap_or(values.len());
    values[first_defined..].iter().all(Option::is_some)
}

/// EMA of the defined entries of `dif`, left-padded back to `dif.len()`.
///
/// The EMA runs over the compacted subsequence of defined values, then
/// `dif.len() - result.len()` undefined markers are prepended. For a DIF
/// line built from two EMAs the defined entries always form a contiguous
/// suffix, so the padding lands exactly on the undefined prefix. Interior
/// gaps are not re-inserted; values after a gap shift left.
pub fn signal_line(dif: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let valid: Vec<f64> = dif.iter().flatten().copied().collect();
    if valid.len() < period {
        return vec![None; dif.len()];
    }

    if !defined_suffix_only(dif) {
        warn!("DIF line has interior gaps; signal line padding will not preserve their positions");
    }

    let compact = calculate_ema(&valid, period);
    let mut dea = vec![None; dif.len() - compact.len()];
    dea.extend(compact);
    dea
}

/// MACD over `closes` with explicit periods
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let dif = pairwise_diff(&ema_fast, &ema_slow);
    let dea = signal_line(&dif, signal);
    let histogram = pairwise_diff(&dif, &dea);

    MacdSeries { dif, dea, histogram }
}

/// Annotates candles with the configured EMA set and MACD triple
#[derive(Debug, Clone)]
pub struct IndicatorCalculator {
    config: IndicatorConfig,
}

impl IndicatorCalculator {
    pub fn new(config: IndicatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.normalized(),
        })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn longest_ema_period(&self) -> usize {
        // validate() guarantees at least one period
        self.config.longest_ema_period().unwrap_or_default()
    }

    pub fn calculate_macd(&self, closes: &[f64]) -> MacdSeries {
        calculate_macd(
            closes,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
        )
    }

    /// Merge every configured indicator onto the candles by position
    pub fn annotate_candles(&self, candles: &[Candle]) -> Vec<AnnotatedCandle> {
        if candles.is_empty() {
            return Vec::new();
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let ema_lines: Vec<(usize, Vec<Option<f64>>)> = self
            .config
            .ema_periods
            .iter()
            .map(|&period| (period, calculate_ema(&closes, period)))
            .collect();
        let macd = self.calculate_macd(&closes);

        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let mut ema = EmaValues::new();
                for (period, line) in &ema_lines {
                    ema.insert(*period, line[i]);
                }

                AnnotatedCandle {
                    ema,
                    dif: macd.dif[i],
                    dea: macd.dea[i],
                    histogram: macd.histogram[i],
                    ..AnnotatedCandle::from_raw(*candle)
                }
            })
            .collect()
    }

    /// Annotate several granularities independently
    pub fn annotate_multi_timeframe(
        &self,
        data: &BTreeMap<Granularity, Vec<Candle>>,
    ) -> BTreeMap<Granularity, Vec<AnnotatedCandle>> {
        data.iter()
            .map(|(granularity, candles)| {
                debug!("Calculating indicators for {} ({} candles)", granularity, candles.len());
                (granularity.clone(), self.annotate_candles(candles))
            })
            .collect()
    }
}
