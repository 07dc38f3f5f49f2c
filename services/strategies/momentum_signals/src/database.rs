//! Database lifecycle: initial population and refresh cycles
//!
//! Every timeframe is handled on its own. A failed or empty fetch is logged
//! and recorded in the [`UpdateReport`], and the remaining timeframes still
//! run. Only store and configuration errors abort a cycle.

use crate::config::MarketConfig;
use crate::error::Result;
use crate::store::SeriesStore;
use crate::updater::{IncrementalUpdater, UpdateOutcome};
use chrono::Utc;
use okx_adapter::CandleSource;
use serde::Serialize;
use tracing::{info, warn};
use types::{Candle, Database, Granularity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimeframeOutcome {
    Initialized { count: usize },
    Updated { added: usize, total: usize },
    NoNewData,
    Skipped { reason: String },
}

impl TimeframeOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TimeframeOutcome::Skipped { .. })
    }
}

/// Per-timeframe outcomes of one `initialize` or `update` run, in run order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub timeframes: Vec<(Granularity, TimeframeOutcome)>,
}

impl UpdateReport {
    fn record(&mut self, timeframe: &Granularity, outcome: TimeframeOutcome) {
        self.timeframes.push((timeframe.clone(), outcome));
    }

    pub fn outcome(&self, timeframe: &Granularity) -> Option<&TimeframeOutcome> {
        self.timeframes
            .iter()
            .find(|(tf, _)| tf == timeframe)
            .map(|(_, outcome)| outcome)
    }

    pub fn skipped(&self) -> usize {
        self.timeframes.iter().filter(|(_, o)| o.is_skipped()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.timeframes.len() - self.skipped()
    }
}

pub struct DatabaseManager<S> {
    source: S,
    store: SeriesStore,
    updater: IncrementalUpdater,
    market: MarketConfig,
}

impl<S: CandleSource> DatabaseManager<S> {
    pub fn new(source: S, store: SeriesStore, updater: IncrementalUpdater, market: MarketConfig) -> Self {
        Self {
            source,
            store,
            updater,
            market,
        }
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    async fn fetch(&self, timeframe: &Granularity, limit: usize) -> std::result::Result<Vec<Candle>, String> {
        match self.source.fetch_candles(timeframe, limit).await {
            Ok(candles) if candles.is_empty() => {
                warn!(timeframe = %timeframe, "No candles returned, skipping");
                Err("no candles returned".to_string())
            }
            Ok(candles) => Ok(candles),
            Err(e) => {
                warn!(timeframe = %timeframe, recoverable = e.is_recoverable(), "Fetch failed, skipping: {}", e);
                Err(e.to_string())
            }
        }
    }

    /// Build a fresh database from `timeframes` and save it, replacing any
    /// existing file
    pub async fn initialize(&self, timeframes: &[Granularity]) -> Result<(Database, UpdateReport)> {
        let mut database = Database::new(Utc::now());
        let mut report = UpdateReport::default();

        for timeframe in timeframes {
            let limit = self.market.initial_limit_for(timeframe);
            info!(timeframe = %timeframe, "Fetching {} candles", limit);

            let outcome = match self.fetch(timeframe, limit).await {
                Ok(candles) => {
                    let series = self.updater.build(&candles, Utc::now());
                    let count = series.count;
                    database.insert_series(timeframe.clone(), series);
                    info!(timeframe = %timeframe, "Initialized with {} candles", count);
                    TimeframeOutcome::Initialized { count }
                }
                Err(reason) => TimeframeOutcome::Skipped { reason },
            };
            report.record(timeframe, outcome);
        }

        database.touch(Utc::now());
        self.store.save(&database)?;

        info!(
            "Database initialized: {}/{} timeframes",
            report.succeeded(),
            timeframes.len()
        );
        Ok((database, report))
    }

    /// Refresh `timeframes`, or every stored timeframe when `None`
    pub async fn update(&self, timeframes: Option<&[Granularity]>) -> Result<(Database, UpdateReport)> {
        let mut database = self.store.load_required()?;
        let targets = match timeframes {
            Some(list) => list.to_vec(),
            None => database.granularities(),
        };
        let mut report = UpdateReport::default();

        for timeframe in &targets {
            if database.series(timeframe).is_none() {
                warn!(timeframe = %timeframe, "Timeframe not in database, skipping");
                report.record(
                    timeframe,
                    TimeframeOutcome::Skipped {
                        reason: "timeframe not in database".to_string(),
                    },
                );
                continue;
            }

            let candles = match self.fetch(timeframe, self.market.update_limit).await {
                Ok(candles) => candles,
                Err(reason) => {
                    report.record(timeframe, TimeframeOutcome::Skipped { reason });
                    continue;
                }
            };

            let Some(series) = database.series_mut(timeframe) else {
                continue;
            };
            let outcome = match self.updater.apply(series, &candles, Utc::now()) {
                UpdateOutcome::Updated { added, total } => {
                    info!(timeframe = %timeframe, "Added {} candles, {} total", added, total);
                    TimeframeOutcome::Updated { added, total }
                }
                UpdateOutcome::NoNewData => {
                    info!(timeframe = %timeframe, "No new candles");
                    TimeframeOutcome::NoNewData
                }
            };
            report.record(timeframe, outcome);
        }

        database.touch(Utc::now());
        self.store.save(&database)?;
        Ok((database, report))
    }
}
