//! JSON series store
//!
//! The whole database lives in one file. Loads validate every series; saves
//! write a sibling temp file and rename it over the target so a crash never
//! leaves a half-written database behind.

use crate::error::{Result, StrategyError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use types::{AnnotatedCandle, Database, Granularity};

#[derive(Debug, Clone)]
pub struct SeriesStore {
    path: PathBuf,
}

/// Summary of one stored timeframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeStatus {
    pub timeframe: Granularity,
    pub count: usize,
    pub last_timestamp: i64,
    pub last_candle_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DatabaseStatus {
    NotInitialized {
        path: PathBuf,
    },
    Ready {
        path: PathBuf,
        version: String,
        created_at: DateTime<Utc>,
        last_updated: DateTime<Utc>,
        timeframes: Vec<TimeframeStatus>,
    },
}

/// Standalone dump of one timeframe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub symbol: String,
    pub exchange: String,
    pub timeframe: Granularity,
    pub export_time: DateTime<Utc>,
    pub count: usize,
    pub candles: Vec<AnnotatedCandle>,
}

impl SeriesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the database, or `None` when the file does not exist yet
    pub fn load(&self) -> Result<Option<Database>> {
        if !self.exists() {
            debug!("No database at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| StrategyError::io(&self.path, e))?;
        let database: Database = serde_json::from_str(&content)?;
        database.validate()?;

        debug!(
            "Loaded database {:?} with {} timeframes",
            self.path,
            database.timeframes.len()
        );
        Ok(Some(database))
    }

    /// Like [`SeriesStore::load`] but a missing file is an error
    pub fn load_required(&self) -> Result<Database> {
        self.load()?.ok_or_else(|| StrategyError::NotInitialized {
            path: self.path.clone(),
        })
    }

    pub fn save(&self, database: &Database) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StrategyError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(database)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StrategyError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StrategyError::io(&self.path, e))?;

        info!(
            "Saved database to {:?} ({} timeframes)",
            self.path,
            database.timeframes.len()
        );
        Ok(())
    }

    /// Last `limit` candles of a timeframe; empty when the database or the
    /// timeframe does not exist
    pub fn get_timeframe_data(
        &self,
        timeframe: &Granularity,
        limit: Option<usize>,
    ) -> Result<Vec<AnnotatedCandle>> {
        Ok(self
            .load()?
            .and_then(|db| db.series(timeframe).map(|s| s.tail(limit).to_vec()))
            .unwrap_or_default())
    }

    pub fn status(&self) -> Result<DatabaseStatus> {
        let Some(database) = self.load()? else {
            return Ok(DatabaseStatus::NotInitialized {
                path: self.path.clone(),
            });
        };

        let timeframes = database
            .timeframes
            .iter()
            .map(|(timeframe, series)| TimeframeStatus {
                timeframe: timeframe.clone(),
                count: series.count,
                last_timestamp: series.last_timestamp,
                last_candle_time: series.latest().and_then(AnnotatedCandle::datetime),
                last_updated: series.last_updated,
            })
            .collect();

        Ok(DatabaseStatus::Ready {
            path: self.path.clone(),
            version: database.version,
            created_at: database.created_at,
            last_updated: database.last_updated,
            timeframes,
        })
    }

    /// Write one timeframe to `output` as an [`ExportDocument`]
    pub fn export_timeframe(
        &self,
        timeframe: &Granularity,
        output: &Path,
        symbol: &str,
        exchange: &str,
        now: DateTime<Utc>,
    ) -> Result<ExportDocument> {
        let candles = self.get_timeframe_data(timeframe, None)?;
        if candles.is_empty() {
            return Err(StrategyError::TimeframeNotFound {
                timeframe: timeframe.to_string(),
            });
        }

        let document = ExportDocument {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
            timeframe: timeframe.clone(),
            export_time: now,
            count: candles.len(),
            candles,
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StrategyError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(output, content).map_err(|e| StrategyError::io(output, e))?;

        info!("Exported {} {} candles to {:?}", document.count, timeframe, output);
        Ok(document)
    }
}
