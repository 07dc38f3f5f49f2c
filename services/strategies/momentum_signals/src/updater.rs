//! Incremental series updates
//!
//! New raw candles are appended to the stored raw history and every derived
//! field is recomputed over the whole concatenation. Nothing is patched in
//! place: the indicator recurrences are prefix-stable, so every index that
//! existed before the update keeps its value and only the appended tail is new.

use crate::indicators::IndicatorCalculator;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use types::{Candle, Series};

/// Result of merging one fetched batch into a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { added: usize, total: usize },
    NoNewData,
}

#[derive(Debug, Clone)]
pub struct IncrementalUpdater {
    calculator: IndicatorCalculator,
}

impl IncrementalUpdater {
    pub fn new(calculator: IndicatorCalculator) -> Self {
        Self { calculator }
    }

    /// Candles strictly newer than `last_timestamp`, in ascending order.
    ///
    /// Rows at or before the running maximum are treated as already known, and
    /// rows with non-finite prices are dropped.
    pub fn fresh_candles(&self, last_timestamp: i64, batch: &[Candle]) -> Vec<Candle> {
        let mut cursor = last_timestamp;
        let mut fresh = Vec::new();

        for candle in batch {
            if candle.timestamp <= cursor {
                continue;
            }
            if !candle.is_finite() {
                warn!("Dropping candle at {} with non-finite values", candle.timestamp);
                continue;
            }
            cursor = candle.timestamp;
            fresh.push(*candle);
        }

        fresh
    }

    /// Merge `batch` into `series` in place
    pub fn apply(&self, series: &mut Series, batch: &[Candle], now: DateTime<Utc>) -> UpdateOutcome {
        // An empty series accepts any timestamp, including 0 and negatives
        let cursor = series.latest().map(|c| c.timestamp).unwrap_or(i64::MIN);
        let fresh = self.fresh_candles(cursor, batch);
        if fresh.is_empty() {
            debug!(
                "No candles newer than {} in batch of {}",
                series.last_timestamp,
                batch.len()
            );
            return UpdateOutcome::NoNewData;
        }

        let added = fresh.len();
        let mut raw = series.raw_candles();
        raw.extend(fresh);

        let annotated = self.calculator.annotate_candles(&raw);
        series.replace_candles(annotated, now);

        UpdateOutcome::Updated {
            added,
            total: series.count,
        }
    }

    /// Pure form of [`IncrementalUpdater::apply`]
    pub fn update(&self, series: &Series, batch: &[Candle], now: DateTime<Utc>) -> Series {
        let mut updated = series.clone();
        self.apply(&mut updated, batch, now);
        updated
    }

    /// Annotate a fresh history into a new series
    pub fn build(&self, candles: &[Candle], now: DateTime<Utc>) -> Series {
        let fresh = self.fresh_candles(i64::MIN, candles);
        Series::new(self.calculator.annotate_candles(&fresh), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorConfig;
    use chrono::TimeZone;

    fn updater() -> IncrementalUpdater {
        IncrementalUpdater::new(IndicatorCalculator::new(IndicatorConfig::default()).unwrap())
    }

    fn candles(range: std::ops::Range<i64>) -> Vec<Candle> {
        range
            .map(|i| {
                let close = 30_000.0 + (i as f64 * 0.7).cos() * 150.0 + i as f64 * 4.0;
                Candle::new(i * 3600, close - 10.0, close + 25.0, close - 30.0, close, 12.5)
            })
            .collect()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let updater = updater();
        let series = updater.build(&candles(0..80), t(1));

        let updated = updater.update(&series, &[], t(2));
        assert_eq!(updated, series);
    }

    #[test]
    fn test_overlapping_batch_is_noop() {
        let updater = updater();
        let series = updater.build(&candles(0..80), t(1));

        let mut target = series.clone();
        let outcome = updater.apply(&mut target, &candles(70..80), t(2));
        assert_eq!(outcome, UpdateOutcome::NoNewData);
        assert_eq!(target, series);
    }

    #[test]
    fn test_update_matches_full_recompute() {
        let updater = updater();
        let mut series = updater.build(&candles(0..60), t(1));

        let outcome = updater.apply(&mut series, &candles(55..75), t(2));
        assert_eq!(outcome, UpdateOutcome::Updated { added: 15, total: 75 });

        let expected = updater.build(&candles(0..75), t(2));
        assert_eq!(series, expected);
        assert_eq!(series.last_timestamp, 74 * 3600);
        assert_eq!(series.last_updated, t(2));
    }

    #[test]
    fn test_update_preserves_prior_values() {
        let updater = updater();
        let before = updater.build(&candles(0..60), t(1));
        let after = updater.update(&before, &candles(60..61), t(2));

        assert_eq!(&after.candles[..60], &before.candles[..]);
        assert_eq!(after.count, 61);
    }

    #[test]
    fn test_update_crosses_warmup_boundary() {
        let updater = updater();
        let before = updater.build(&candles(0..50), t(1));
        assert!(before.latest().unwrap().ema(52).is_none());

        let after = updater.update(&before, &candles(50..53), t(2));
        assert!(after.candles[50].ema(52).is_none());
        assert!(after.candles[51].ema(52).is_some());
        assert!(after.candles[52].ema(52).is_some());
    }

    #[test]
    fn test_update_empty_series() {
        let updater = updater();
        let empty = Series::new(Vec::new(), t(0));
        let after = updater.update(&empty, &candles(0..5), t(1));
        assert_eq!(after.count, 5);
        assert_eq!(after.candles[0].timestamp, 0);
        assert_eq!(after.last_timestamp, 4 * 3600);
        assert_eq!(after, updater.build(&candles(0..5), t(1)));
    }

    #[test]
    fn test_update_empty_series_keeps_non_positive_timestamps() {
        let updater = updater();
        let empty = Series::new(Vec::new(), t(0));
        let after = updater.update(&empty, &candles(-2..2), t(1));

        let timestamps: Vec<i64> = after.candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![-7200, -3600, 0, 3600]);
    }

    #[test]
    fn test_fresh_candles_drops_unordered_and_invalid() {
        let updater = updater();
        let mut batch = candles(10..14);
        batch.swap(1, 2);
        batch.push(Candle::new(20 * 3600, f64::NAN, 1.0, 1.0, 1.0, 1.0));

        let fresh = updater.fresh_candles(10 * 3600, &batch);
        let timestamps: Vec<i64> = fresh.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![12 * 3600, 13 * 3600]);
    }
}
