//! Raw and indicator-annotated candles

use chrono::{DateTime, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One OHLCV bucket as delivered by the fetch layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, seconds since the Unix epoch
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close above open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// All price and volume fields are finite numbers
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// EMA values keyed by period, kept sorted by period.
///
/// Serialized as flat `ema{period}` keys (`"ema26": 41250.3`) so an
/// [`AnnotatedCandle`] reads the same as a plain candle record with
/// indicator columns appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmaValues {
    values: Vec<(usize, Option<f64>)>,
}

impl EmaValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `period`, replacing any previous one
    pub fn insert(&mut self, period: usize, value: Option<f64>) {
        match self.values.binary_search_by_key(&period, |(p, _)| *p) {
            Ok(idx) => self.values[idx].1 = value,
            Err(idx) => self.values.insert(idx, (period, value)),
        }
    }

    /// Value for `period`; `None` when the period is unknown or still warming up
    pub fn get(&self, period: usize) -> Option<f64> {
        self.values
            .binary_search_by_key(&period, |(p, _)| *p)
            .ok()
            .and_then(|idx| self.values[idx].1)
    }

    pub fn contains_period(&self, period: usize) -> bool {
        self.values
            .binary_search_by_key(&period, |(p, _)| *p)
            .is_ok()
    }

    /// Entry with the largest period
    pub fn longest(&self) -> Option<(usize, Option<f64>)> {
        self.values.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<f64>)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn parse_key(key: &str) -> Option<usize> {
        let digits = key.strip_prefix("ema")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|p| *p > 0)
    }
}

impl Serialize for EmaValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (period, value) in &self.values {
            map.serialize_entry(&format!("ema{}", period), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmaValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EmaVisitor;

        impl<'de> Visitor<'de> for EmaVisitor {
            type Value = EmaValues;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of ema<period> keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<EmaValues, A::Error> {
                let mut values = EmaValues::new();
                while let Some(key) = map.next_key::<String>()? {
                    match EmaValues::parse_key(&key) {
                        Some(period) => values.insert(period, map.next_value()?),
                        // Unrelated columns (e.g. a display datetime) are skipped
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(EmaVisitor)
    }
}

/// A candle with its derived momentum indicators.
///
/// Derived fields are `None` while an indicator is still inside its warm-up
/// window. They are only ever replaced by a full recomputation over the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedCandle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(flatten)]
    pub ema: EmaValues,
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub histogram: Option<f64>,
}

impl AnnotatedCandle {
    /// Wrap a raw candle with every derived field undefined
    pub fn from_raw(candle: Candle) -> Self {
        Self {
            timestamp: candle.timestamp,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            ema: EmaValues::new(),
            dif: None,
            dea: None,
            histogram: None,
        }
    }

    /// Raw OHLCV projection with derived fields stripped
    pub fn raw(&self) -> Candle {
        Candle {
            timestamp: self.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }

    pub fn ema(&self, period: usize) -> Option<f64> {
        self.ema.get(period)
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnnotatedCandle {
        let mut candle =
            AnnotatedCandle::from_raw(Candle::new(1_700_000_000, 10.0, 12.0, 9.0, 11.0, 3.5));
        candle.ema.insert(52, None);
        candle.ema.insert(26, Some(10.5));
        candle.dif = Some(0.25);
        candle
    }

    #[test]
    fn test_annotated_candle_shape_helpers() {
        let candle = sample();
        assert!(candle.is_bullish());
        assert!(!candle.is_bearish());
        assert_eq!(candle.range(), 3.0);
        assert_eq!(candle.range(), candle.raw().range());
    }

    #[test]
    fn test_ema_values_sorted_by_period() {
        let candle = sample();
        let periods: Vec<usize> = candle.ema.iter().map(|(p, _)| p).collect();
        assert_eq!(periods, vec![26, 52]);
        assert_eq!(candle.ema.longest(), Some((52, None)));
        assert_eq!(candle.ema(26), Some(10.5));
        assert_eq!(candle.ema(52), None);
        assert!(candle.ema.contains_period(52));
        assert!(!candle.ema.contains_period(12));
    }

    #[test]
    fn test_annotated_candle_json_layout() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["timestamp"], 1_700_000_000);
        assert_eq!(json["ema26"], 10.5);
        assert!(json["ema52"].is_null());
        assert_eq!(json["dif"], 0.25);
        assert!(json["dea"].is_null());
        assert!(json.get("ema").is_none());
    }

    #[test]
    fn test_annotated_candle_reads_legacy_columns() {
        let raw = r#"{
            "timestamp": 1700000000,
            "datetime": "2023-11-14 22:13:20",
            "open": 10, "high": 12.0, "low": 9.0, "close": 11.0, "volume": 3.5,
            "ema26": 10.5, "ema52": null,
            "dif": 0.25, "dea": null, "histogram": null
        }"#;

        let candle: AnnotatedCandle = serde_json::from_str(raw).unwrap();
        assert_eq!(candle, sample());
    }

    #[test]
    fn test_raw_projection_strips_indicators() {
        let candle = sample();
        let raw = candle.raw();
        assert_eq!(raw, Candle::new(1_700_000_000, 10.0, 12.0, 9.0, 11.0, 3.5));
        assert_eq!(AnnotatedCandle::from_raw(raw).dif, None);
    }

    #[test]
    fn test_candle_shape() {
        let up = Candle::new(0, 1.0, 3.0, 0.5, 2.0, 1.0);
        let down = Candle::new(0, 2.0, 3.0, 0.5, 1.0, 1.0);
        assert!(up.is_bullish() && !up.is_bearish());
        assert!(down.is_bearish() && !down.is_bullish());
        assert_eq!(up.range(), 2.5);
        assert!(!Candle::new(0, f64::NAN, 1.0, 1.0, 1.0, 1.0).is_finite());
    }
}
