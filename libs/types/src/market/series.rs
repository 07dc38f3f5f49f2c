//! Per-granularity series and the database that groups them

use crate::common::errors::{Result, TypesError};
use crate::market::candle::{AnnotatedCandle, Candle};
use crate::market::granularity::Granularity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version stamped into newly created databases
pub const DATABASE_VERSION: &str = "1.0.0";

/// Annotated candles for one granularity plus bookkeeping metadata.
///
/// `last_timestamp` and `count` always describe `candles`; use
/// [`Series::replace_candles`] rather than mutating `candles` directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub candles: Vec<AnnotatedCandle>,
    /// Timestamp of the final candle, 0 for an empty series
    pub last_timestamp: i64,
    pub last_updated: DateTime<Utc>,
    pub count: usize,
}

impl Series {
    pub fn new(candles: Vec<AnnotatedCandle>, now: DateTime<Utc>) -> Self {
        let last_timestamp = candles.last().map(|c| c.timestamp).unwrap_or(0);
        Self {
            count: candles.len(),
            candles,
            last_timestamp,
            last_updated: now,
        }
    }

    /// Swap in a freshly computed candle sequence and refresh the metadata
    pub fn replace_candles(&mut self, candles: Vec<AnnotatedCandle>, now: DateTime<Utc>) {
        *self = Self::new(candles, now);
    }

    pub fn latest(&self) -> Option<&AnnotatedCandle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Raw OHLCV history with every derived field stripped
    pub fn raw_candles(&self) -> Vec<Candle> {
        self.candles.iter().map(AnnotatedCandle::raw).collect()
    }

    /// Last `limit` candles, or all of them when `limit` is `None`
    pub fn tail(&self, limit: Option<usize>) -> &[AnnotatedCandle] {
        match limit {
            Some(n) if n < self.candles.len() => &self.candles[self.candles.len() - n..],
            _ => &self.candles,
        }
    }

    /// Check ordering and metadata invariants, e.g. after loading from disk
    pub fn validate(&self) -> Result<()> {
        for (index, pair) in self.candles.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(TypesError::NonMonotonicTimestamps {
                    index: index + 1,
                    previous: pair[0].timestamp,
                    next: pair[1].timestamp,
                });
            }
        }

        if self.count != self.candles.len() {
            return Err(TypesError::MetadataMismatch {
                field: "count",
                recorded: self.count as i64,
                actual: self.candles.len() as i64,
            });
        }

        if let Some(last) = self.candles.last() {
            if self.last_timestamp != last.timestamp {
                return Err(TypesError::MetadataMismatch {
                    field: "last_timestamp",
                    recorded: self.last_timestamp,
                    actual: last.timestamp,
                });
            }
        }

        Ok(())
    }
}

/// All persisted series, keyed by granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub timeframes: BTreeMap<Granularity, Series>,
}

impl Database {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: DATABASE_VERSION.to_string(),
            created_at: now,
            last_updated: now,
            timeframes: BTreeMap::new(),
        }
    }

    pub fn series(&self, granularity: &Granularity) -> Option<&Series> {
        self.timeframes.get(granularity)
    }

    pub fn series_mut(&mut self, granularity: &Granularity) -> Option<&mut Series> {
        self.timeframes.get_mut(granularity)
    }

    pub fn insert_series(&mut self, granularity: Granularity, series: Series) {
        self.timeframes.insert(granularity, series);
    }

    pub fn granularities(&self) -> Vec<Granularity> {
        self.timeframes.keys().cloned().collect()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now;
    }

    /// Validate every contained series
    pub fn validate(&self) -> Result<()> {
        self.timeframes.values().try_for_each(Series::validate)
    }
}
