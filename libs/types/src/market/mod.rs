//! Candle, series and database records

pub mod candle;
pub mod granularity;
pub mod series;
