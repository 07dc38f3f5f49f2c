//! # Momentum Analyzer Types
//!
//! Shared data model for the momentum analyzer services.
//!
//! ## Design Philosophy
//!
//! - **Fixed-shape records**: derived indicator fields are explicit `Option<f64>`
//!   members, never injected dynamically
//! - **Raw data is immutable**: a [`Candle`] is produced once by the fetch layer
//!   and only ever copied
//! - **Whole-series replacement**: a [`Series`] is rebuilt as a unit, so its
//!   metadata always matches its contents
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{AnnotatedCandle, Candle, Granularity, Series};
//!
//! let candle = Candle::new(1_700_000_000, 100.0, 105.0, 99.0, 104.0, 12.5);
//! assert!(candle.is_bullish());
//!
//! let tf: Granularity = "4h".parse().unwrap();
//! let series = Series::new(vec![AnnotatedCandle::from_raw(candle)], chrono::Utc::now());
//! assert_eq!(series.count, 1);
//! assert_eq!(tf.as_str(), "4h");
//! ```

pub mod common;
pub mod market;

pub use common::errors::{Result, TypesError};
pub use market::candle::{AnnotatedCandle, Candle, EmaValues};
pub use market::granularity::Granularity;
pub use market::series::{Database, Series, DATABASE_VERSION};
