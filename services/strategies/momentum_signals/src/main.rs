//! Momentum signals CLI
//!
//! Usage:
//!   momentum_signals init --timeframes 4h,1d
//!   momentum_signals update
//!   momentum_signals signals --timeframe 4h
//!   momentum_signals plan 1d

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use momentum_config::service::logging::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use momentum_config::{render_toml, resolve_config_path};
use momentum_signals::logging::init_strategy_logging;
use momentum_signals::{
    DatabaseManager, IncrementalUpdater, IndicatorCalculator, SeriesStore, SignalEngine,
    StrategyConfig, UpdateReport,
};
use okx_adapter::OkxCandleClient;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use types::Granularity;

#[derive(Parser, Debug)]
#[command(name = "momentum_signals")]
#[command(about = "EMA/MACD momentum database and signal scanner")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to $MOMENTUM_CONFIG_PATH or configs/momentum.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch initial history and create the database
    Init {
        /// Comma-separated timeframes, e.g. "1h,4h"
        #[arg(short, long)]
        timeframes: Option<String>,
    },
    /// Append new candles to stored timeframes
    Update {
        #[arg(short, long)]
        timeframes: Option<String>,
    },
    /// Show database summary
    Status,
    /// Write one timeframe to a standalone JSON file
    Export {
        timeframe: String,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Evaluate signal rules for one or all timeframes
    Signals {
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Build a trading plan for one timeframe
    Plan { timeframe: String },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| resolve_config_path(CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH));
    let config = StrategyConfig::load(Some(&config_path))
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    init_strategy_logging(
        "momentum_signals",
        &config.logging.level,
        args.json_logs || config.logging.json,
    )
    .context("Failed to initialize logging")?;

    let store = SeriesStore::new(config.database_path().context("Invalid database path")?);

    match args.command {
        Command::Init { timeframes } => {
            let timeframes = match timeframes {
                Some(list) => parse_timeframes(&list)?,
                None => config.default_timeframes()?,
            };
            info!("Initializing {} timeframes into {:?}", timeframes.len(), store.path());
            let manager = build_manager(&config, store)?;
            let (_, report) = manager
                .initialize(&timeframes)
                .await
                .context("Database initialization failed")?;
            print_report(&report)?;
        }
        Command::Update { timeframes } => {
            let timeframes = timeframes.map(|list| parse_timeframes(&list)).transpose()?;
            let manager = build_manager(&config, store)?;
            let (_, report) = manager
                .update(timeframes.as_deref())
                .await
                .context("Database update failed")?;
            print_report(&report)?;
        }
        Command::Status => {
            let status = store.status().context("Failed to read database")?;
            print_json(&status)?;
        }
        Command::Export { timeframe, output } => {
            let timeframe = parse_timeframe(&timeframe)?;
            let document = store
                .export_timeframe(
                    &timeframe,
                    &output,
                    &config.exchange.symbol,
                    &config.exchange.name,
                    Utc::now(),
                )
                .with_context(|| format!("Failed to export {}", timeframe))?;
            info!("Wrote {} candles to {:?}", document.count, output);
        }
        Command::Signals { timeframe } => {
            let database = store.load_required().context("Failed to load database")?;
            let engine = build_engine(&config)?;
            match timeframe {
                Some(label) => {
                    let timeframe = parse_timeframe(&label)?;
                    print_json(&engine.analyze_timeframe(&database, &timeframe))?;
                }
                None => print_json(&engine.analyze_all(&database))?,
            }
        }
        Command::Plan { timeframe } => {
            let timeframe = parse_timeframe(&timeframe)?;
            let database = store.load_required().context("Failed to load database")?;
            let plan = build_engine(&config)?.generate_trading_plan(&database, &timeframe);
            print_json(&plan)?;
        }
        Command::Config => {
            print!("{}", render_toml(&config).context("Failed to render configuration")?);
        }
    }

    Ok(())
}

fn parse_timeframe(label: &str) -> Result<Granularity> {
    Granularity::new(label).with_context(|| format!("Invalid timeframe {:?}", label))
}

fn parse_timeframes(list: &str) -> Result<Vec<Granularity>> {
    let timeframes = Granularity::parse_list(list).with_context(|| format!("Invalid timeframe list {:?}", list))?;
    if timeframes.is_empty() {
        anyhow::bail!("No timeframes given");
    }
    Ok(timeframes)
}

fn build_engine(config: &StrategyConfig) -> Result<SignalEngine> {
    let calculator = IndicatorCalculator::new(config.indicators.clone())?;
    Ok(SignalEngine::new(config.rules.clone(), calculator.longest_ema_period()))
}

fn build_manager(config: &StrategyConfig, store: SeriesStore) -> Result<DatabaseManager<OkxCandleClient>> {
    let client = OkxCandleClient::new(config.exchange.clone()).context("Failed to create OKX client")?;
    let calculator = IndicatorCalculator::new(config.indicators.clone())?;
    Ok(DatabaseManager::new(
        client,
        store,
        IncrementalUpdater::new(calculator),
        config.market.clone(),
    ))
}

fn print_report(report: &UpdateReport) -> Result<()> {
    if report.skipped() > 0 {
        warn!("{} of {} timeframes skipped", report.skipped(), report.timeframes.len());
    }
    print_json(report)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
