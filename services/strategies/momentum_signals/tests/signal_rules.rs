//! Rule engine over databases read back from disk

use momentum_signals::{
    Direction, IndicatorCalculator, IndicatorConfig, RuleConfig, RuleKind, SeriesStore,
    SignalEngine, SignalType,
};
use serde_json::json;
use std::fs;
use tempfile::tempdir;
use types::{Candle, Granularity};

fn engine() -> SignalEngine {
    SignalEngine::new(RuleConfig::default(), 52)
}

/// Database document with hand-set indicator values on every candle
fn database_json(rows: &[(f64, f64, f64, Option<f64>, Option<f64>)]) -> serde_json::Value {
    let candles: Vec<_> = rows
        .iter()
        .enumerate()
        .map(|(i, &(open, close, ema52, dea, histogram))| {
            json!({
                "timestamp": 1_700_000_000 + i as i64 * 3600,
                "datetime": "ignored",
                "open": open,
                "high": open.max(close) + 20.0,
                "low": open.min(close) - 20.0,
                "close": close,
                "volume": 5.0,
                "ema26": ema52,
                "ema52": ema52,
                "dif": dea.zip(histogram).map(|(d, h)| d + h),
                "dea": dea,
                "histogram": histogram,
            })
        })
        .collect();

    json!({
        "version": "1.0.0",
        "created_at": "2024-01-01T00:00:00Z",
        "last_updated": "2024-01-02T00:00:00Z",
        "timeframes": {
            "1h": {
                "last_timestamp": 1_700_000_000 + (rows.len() as i64 - 1) * 3600,
                "last_updated": "2024-01-02T00:00:00Z",
                "count": rows.len(),
                "candles": candles,
            }
        }
    })
}

fn load(document: serde_json::Value) -> types::Database {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db.json");
    fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
    SeriesStore::new(&path).load_required().unwrap()
}

#[test]
fn zero_axis_buy_after_upward_cross() {
    let deas = [-50.0, -41.0, -33.0, -25.0, -18.0, -12.0, -7.0, -3.0, 5.0, 9.0];
    let hists = [12.0, 11.0, 10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0];
    let rows: Vec<_> = deas
        .iter()
        .zip(hists)
        .map(|(&dea, hist)| (42_000.0, 42_150.0, 42_000.0, Some(dea), Some(hist)))
        .collect();

    let db = load(database_json(&rows));
    let h1 = Granularity::new("1h").unwrap();
    let result = engine().analyze_timeframe(&db, &h1);

    assert_eq!(result.signal, SignalType::Buy);
    assert_eq!(result.rule, Some(RuleKind::ZeroAxisBuy));
    assert_eq!(result.entry, Some(42_150.0));
    assert_eq!(result.stop_loss, Some(41_700.0));
    assert_eq!(result.target1, Some(42_000.0));
    assert_eq!(result.target2, Some(42_170.0));

    let serialized = serde_json::to_value(&result).unwrap();
    assert_eq!(serialized["signal"], "buy");
    assert_eq!(serialized["rule_name"], "zero_axis_buy");

    let plan = engine().generate_trading_plan(&db, &h1);
    assert_eq!(plan.direction, Direction::Long);
    assert_eq!(plan.entry, Some(42_150.0));
}

#[test]
fn extreme_reversal_takes_priority_over_zero_axis_sell() {
    let deas = [40.0, 15.0, -30.0, -70.0, -95.0, -110.0, -108.0, -105.0, -103.0, -101.0];
    let hists = [-15.0, -14.0, -13.0, -12.0, -11.0, -10.0, -9.0, -8.0, -7.0, -6.0];
    let rows: Vec<_> = deas
        .iter()
        .zip(hists)
        .map(|(&dea, hist)| (41_900.0, 42_050.0, 42_000.0, Some(dea), Some(hist)))
        .collect();

    let db = load(database_json(&rows));
    let result = engine().analyze_timeframe(&db, &Granularity::new("1h").unwrap());
    assert_eq!(result.rule, Some(RuleKind::ExtremeReversalBuy));
    // open - 2 * (high - low) with a 190 range
    assert_eq!(result.stop_loss, Some(41_900.0 - 380.0));
}

#[test]
fn warm_up_series_waits_with_placeholders() {
    let rows: Vec<_> = (0..12)
        .map(|_| (42_000.0, 42_100.0, 42_000.0, None, None))
        .collect();
    let mut document = database_json(&rows);
    for candle in document["timeframes"]["1h"]["candles"].as_array_mut().unwrap() {
        candle["ema52"] = serde_json::Value::Null;
    }

    let db = load(document);
    let h1 = Granularity::new("1h").unwrap();
    let result = engine().analyze_timeframe(&db, &h1);
    assert_eq!(result.signal, SignalType::Wait);
    assert!(result.rationale.contains("DEA=n/a"));

    let plan = engine().generate_trading_plan(&db, &h1);
    assert_eq!(plan.direction, Direction::Flat);
    assert!(plan.stop_loss.is_none());
}

#[test]
fn freshly_annotated_trend_is_evaluated_deterministically() {
    let calculator = IndicatorCalculator::new(IndicatorConfig::default()).unwrap();
    let candles: Vec<Candle> = (0..150)
        .map(|i| {
            let close = 30_000.0 + (i as f64 / 9.0).sin() * 1_500.0;
            Candle::new(i * 3600, close - 30.0, close + 60.0, close - 80.0, close, 7.0)
        })
        .collect();
    let annotated = calculator.annotate_candles(&candles);

    let engine = SignalEngine::new(RuleConfig::default(), calculator.longest_ema_period());
    let first = engine.evaluate(&annotated);
    let second = engine.evaluate(&annotated);
    assert_eq!(first, second);
    assert!(first.signal == SignalType::Wait || first.entry == Some(annotated[149].close));
}
