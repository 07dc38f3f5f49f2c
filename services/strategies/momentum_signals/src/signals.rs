//! Trading signal definitions and rule evaluation
//!
//! The engine runs a fixed set of detectors over one annotated series in
//! priority order and returns the first match. With no match it returns a
//! `wait` result describing where the series currently sits. Evaluation is
//! read-only and keeps no state between calls.

use crate::config::RuleConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use types::{AnnotatedCandle, Database, Granularity, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Buy,
    Sell,
    Wait,
}

/// The rules a detector can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Bullish reversal candle while DEA sits near its trailing low
    ExtremeReversalBuy,
    /// Pullback to the long EMA shortly after DEA crossed above zero
    ZeroAxisBuy,
    /// Rally to the long EMA shortly after DEA crossed below zero
    ZeroAxisSell,
}

impl RuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::ExtremeReversalBuy => "extreme_reversal_buy",
            RuleKind::ZeroAxisBuy => "zero_axis_buy",
            RuleKind::ZeroAxisSell => "zero_axis_sell",
        }
    }

    /// Lower runs first
    pub fn priority(&self) -> u8 {
        match self {
            RuleKind::ExtremeReversalBuy => 1,
            RuleKind::ZeroAxisBuy | RuleKind::ZeroAxisSell => 4,
        }
    }

    pub fn signal_type(&self) -> SignalType {
        match self {
            RuleKind::ExtremeReversalBuy | RuleKind::ZeroAxisBuy => SignalType::Buy,
            RuleKind::ZeroAxisSell => SignalType::Sell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub signal: SignalType,

    /// Latest close for buy/sell, absent for wait
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub target1: Option<f64>,
    pub target2: Option<f64>,

    #[serde(rename = "rule_name")]
    pub rule: Option<RuleKind>,

    /// Human-readable reason for signal
    pub rationale: String,
}

impl SignalResult {
    pub fn wait(rationale: impl Into<String>) -> Self {
        Self {
            signal: SignalType::Wait,
            entry: None,
            stop_loss: None,
            target1: None,
            target2: None,
            rule: None,
            rationale: rationale.into(),
        }
    }

    fn matched(rule: RuleKind, latest: &AnnotatedCandle, levels: Levels, rationale: String) -> Self {
        Self {
            signal: rule.signal_type(),
            entry: Some(latest.close),
            stop_loss: Some(levels.stop_loss),
            target1: Some(levels.target1),
            target2: Some(levels.target2),
            rule: Some(rule),
            rationale,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.signal != SignalType::Wait
    }
}

struct Levels {
    stop_loss: f64,
    target1: f64,
    target2: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    /// DEA goes from `<= 0` to `> 0`
    Upward,
    /// DEA goes from `>= 0` to `< 0`
    Downward,
}

/// Read-only view of a series with the rule parameters applied
pub struct SeriesContext<'a> {
    candles: &'a [AnnotatedCandle],
    rules: &'a RuleConfig,
    ema_period: usize,
}

impl<'a> SeriesContext<'a> {
    pub fn new(candles: &'a [AnnotatedCandle], rules: &'a RuleConfig, ema_period: usize) -> Self {
        Self {
            candles,
            rules,
            ema_period,
        }
    }

    pub fn rules(&self) -> &RuleConfig {
        self.rules
    }

    pub fn ema_period(&self) -> usize {
        self.ema_period
    }

    pub fn has_min_history(&self) -> bool {
        self.candles.len() >= self.rules.min_history.max(2)
    }

    pub fn latest(&self) -> Option<&'a AnnotatedCandle> {
        self.candles.last()
    }

    pub fn previous(&self) -> Option<&'a AnnotatedCandle> {
        self.candles.len().checked_sub(2).map(|i| &self.candles[i])
    }

    /// Longest configured EMA on the latest candle
    pub fn ema_long(&self) -> Option<f64> {
        self.latest().and_then(|c| c.ema(self.ema_period))
    }

    /// Trailing `lookback` candles
    pub fn lookback(&self) -> &'a [AnnotatedCandle] {
        let start = self.candles.len().saturating_sub(self.rules.lookback);
        &self.candles[start..]
    }

    pub fn max_high(&self) -> Option<f64> {
        self.lookback().iter().map(|c| c.high).reduce(f64::max)
    }

    pub fn min_low(&self) -> Option<f64> {
        self.lookback().iter().map(|c| c.low).reduce(f64::min)
    }

    /// Minimum defined DEA over the lookback window
    pub fn min_dea(&self) -> Option<f64> {
        self.lookback().iter().filter_map(|c| c.dea).reduce(f64::min)
    }

    /// `|hist[latest]| < |hist[prev]|`, false when either is undefined
    pub fn histogram_contracting(&self) -> bool {
        match (
            self.latest().and_then(|c| c.histogram),
            self.previous().and_then(|c| c.histogram),
        ) {
            (Some(latest), Some(prev)) => latest.abs() < prev.abs(),
            _ => false,
        }
    }

    /// Relative distance of the latest close from the long EMA
    pub fn ema_distance(&self) -> Option<f64> {
        let latest = self.latest()?;
        let ema = self.ema_long()?;
        let distance = (latest.close - ema).abs() / ema;
        distance.is_finite().then_some(distance)
    }

    /// Whether DEA crossed zero in `direction` between any two adjacent
    /// candles of the trailing crossing window
    pub fn has_zero_cross(&self, direction: CrossDirection) -> bool {
        let start = self.candles.len().saturating_sub(self.rules.cross_window);
        self.candles[start..].windows(2).any(|pair| match (pair[0].dea, pair[1].dea) {
            (Some(before), Some(after)) => match direction {
                CrossDirection::Upward => before <= 0.0 && after > 0.0,
                CrossDirection::Downward => before >= 0.0 && after < 0.0,
            },
            _ => false,
        })
    }
}

pub trait SignalDetector: Send + Sync {
    fn rule(&self) -> RuleKind;

    fn priority(&self) -> u8 {
        self.rule().priority()
    }

    /// `None` when the series does not match
    fn detect(&self, ctx: &SeriesContext<'_>) -> Option<SignalResult>;
}

pub struct ExtremeReversalBuyDetector;

impl SignalDetector for ExtremeReversalBuyDetector {
    fn rule(&self) -> RuleKind {
        RuleKind::ExtremeReversalBuy
    }

    fn detect(&self, ctx: &SeriesContext<'_>) -> Option<SignalResult> {
        if !ctx.has_min_history() {
            return None;
        }
        let latest = ctx.latest()?;
        let dea = latest.dea?;
        if dea >= 0.0 {
            return None;
        }

        let min_dea = ctx.min_dea()?;
        if dea > min_dea * ctx.rules().extreme_proximity {
            return None;
        }
        if !latest.is_bullish() || !ctx.histogram_contracting() {
            return None;
        }

        let levels = Levels {
            stop_loss: latest.open - 2.0 * latest.range(),
            target1: ctx.ema_long()?,
            target2: ctx.max_high()?,
        };
        let rationale = format!(
            "Extreme reversal buy: DEA {:.0} near trailing extreme {:.0}, contracting bullish candle",
            dea, min_dea
        );
        Some(SignalResult::matched(self.rule(), latest, levels, rationale))
    }
}

pub struct ZeroAxisBuyDetector;

impl SignalDetector for ZeroAxisBuyDetector {
    fn rule(&self) -> RuleKind {
        RuleKind::ZeroAxisBuy
    }

    fn detect(&self, ctx: &SeriesContext<'_>) -> Option<SignalResult> {
        if !ctx.has_min_history() {
            return None;
        }
        let latest = ctx.latest()?;
        if latest.dea? <= 0.0 {
            return None;
        }

        let distance = ctx.ema_distance()?;
        if distance > ctx.rules().zero_axis_tolerance {
            return None;
        }
        if !latest.is_bullish() || !ctx.histogram_contracting() {
            return None;
        }
        if !ctx.has_zero_cross(CrossDirection::Upward) {
            return None;
        }

        let ema = ctx.ema_long()?;
        let levels = Levels {
            stop_loss: ema - ctx.rules().stop_offset,
            target1: ema,
            target2: ctx.max_high()?,
        };
        let rationale = format!(
            "Zero-axis buy: first leg after DEA crossed above zero, close {:.1}% from EMA{}, contracting bullish candle",
            distance * 100.0,
            ctx.ema_period()
        );
        Some(SignalResult::matched(self.rule(), latest, levels, rationale))
    }
}

pub struct ZeroAxisSellDetector;

impl SignalDetector for ZeroAxisSellDetector {
    fn rule(&self) -> RuleKind {
        RuleKind::ZeroAxisSell
    }

    fn detect(&self, ctx: &SeriesContext<'_>) -> Option<SignalResult> {
        if !ctx.has_min_history() {
            return None;
        }
        let latest = ctx.latest()?;
        if latest.dea? >= 0.0 {
            return None;
        }

        let distance = ctx.ema_distance()?;
        if distance > ctx.rules().zero_axis_tolerance {
            return None;
        }
        if !latest.is_bearish() || !ctx.histogram_contracting() {
            return None;
        }
        if !ctx.has_zero_cross(CrossDirection::Downward) {
            return None;
        }

        let ema = ctx.ema_long()?;
        let levels = Levels {
            stop_loss: ema + ctx.rules().stop_offset,
            target1: ema,
            target2: ctx.min_low()?,
        };
        let rationale = format!(
            "Zero-axis sell: first leg after DEA crossed below zero, close {:.1}% from EMA{}, contracting bearish candle",
            distance * 100.0,
            ctx.ema_period()
        );
        Some(SignalResult::matched(self.rule(), latest, levels, rationale))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingPlan {
    pub timeframe: Granularity,
    pub direction: Direction,
    pub entry: Option<f64>,
    pub stop_loss: Option<f64>,
    pub target1: Option<f64>,
    pub target2: Option<f64>,
    pub reason: String,
    pub rule: Option<RuleKind>,
}

pub struct SignalEngine {
    rules: RuleConfig,
    ema_period: usize,
    detectors: Vec<Box<dyn SignalDetector>>,
}

impl SignalEngine {
    /// Engine with the standard detector set; `ema_period` is the longest
    /// configured EMA
    pub fn new(rules: RuleConfig, ema_period: usize) -> Self {
        Self::with_detectors(
            rules,
            ema_period,
            vec![
                Box::new(ExtremeReversalBuyDetector),
                Box::new(ZeroAxisBuyDetector),
                Box::new(ZeroAxisSellDetector),
            ],
        )
    }

    /// Detectors run by ascending priority; equal priorities keep the given order
    pub fn with_detectors(
        rules: RuleConfig,
        ema_period: usize,
        mut detectors: Vec<Box<dyn SignalDetector>>,
    ) -> Self {
        detectors.sort_by_key(|d| d.priority());
        Self {
            rules,
            ema_period,
            detectors,
        }
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    pub fn evaluate(&self, candles: &[AnnotatedCandle]) -> SignalResult {
        let ctx = SeriesContext::new(candles, &self.rules, self.ema_period);

        for detector in &self.detectors {
            if let Some(result) = detector.detect(&ctx) {
                debug!("Rule {} matched", detector.rule().name());
                return result;
            }
        }

        SignalResult::wait(self.wait_rationale(&ctx))
    }

    pub fn evaluate_signals(&self, series: &Series) -> SignalResult {
        self.evaluate(&series.candles)
    }

    fn wait_rationale(&self, ctx: &SeriesContext<'_>) -> String {
        let Some(latest) = ctx.latest() else {
            return "Waiting for a setup (no candles)".to_string();
        };

        let dea = latest
            .dea
            .map(|d| format!("{:.0}", d))
            .unwrap_or_else(|| "n/a".to_string());
        let distance = ctx
            .ema_long()
            .map(|ema| (latest.close - ema) / ema * 100.0)
            .filter(|pct| pct.is_finite())
            .map(|pct| format!("{:+.1}%", pct))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "Waiting for a setup (DEA={}, close vs EMA{}={})",
            dea, self.ema_period, distance
        )
    }

    pub fn analyze_timeframe(&self, database: &Database, timeframe: &Granularity) -> SignalResult {
        match database.series(timeframe) {
            Some(series) => self.evaluate_signals(series),
            None => SignalResult::wait(format!("No data for {}", timeframe)),
        }
    }

    pub fn analyze_all(&self, database: &Database) -> BTreeMap<Granularity, SignalResult> {
        database
            .timeframes
            .iter()
            .map(|(timeframe, series)| {
                let result = self.evaluate_signals(series);
                if result.is_actionable() {
                    debug!("{:?} signal on {}", result.signal, timeframe);
                }
                (timeframe.clone(), result)
            })
            .collect()
    }

    pub fn generate_trading_plan(&self, database: &Database, timeframe: &Granularity) -> TradingPlan {
        let signal = self.analyze_timeframe(database, timeframe);
        let direction = match signal.signal {
            SignalType::Buy => Direction::Long,
            SignalType::Sell => Direction::Short,
            SignalType::Wait => Direction::Flat,
        };

        if !signal.is_actionable() {
            let stop_loss = database
                .series(timeframe)
                .and_then(|s| s.latest())
                .and_then(|c| c.ema(self.ema_period))
                .map(|ema| ema - self.rules.stop_offset);

            return TradingPlan {
                timeframe: timeframe.clone(),
                direction,
                entry: None,
                stop_loss,
                target1: None,
                target2: None,
                reason: signal.rationale,
                rule: None,
            };
        }

        TradingPlan {
            timeframe: timeframe.clone(),
            direction,
            entry: signal.entry,
            stop_loss: signal.stop_loss,
            target1: signal.target1,
            target2: signal.target2,
            reason: signal.rationale,
            rule: signal.rule,
        }
    }
}
