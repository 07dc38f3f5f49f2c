//! # OKX Candle Client
//!
//! Fetches OHLCV history from `GET /api/v5/market/candles`.
//!
//! ## Response Handling
//! - **Envelope**: `{"code": "0", "msg": "", "data": [[ts, o, h, l, c, vol, ...], ...]}`
//! - **Ordering**: the venue returns newest first; output is reversed to ascending
//! - **Malformed rows**: dropped one at a time with a warning, the batch continues
//! - **Timestamps**: milliseconds on the wire, seconds in [`Candle`]

use crate::config::OkxAdapterConfig;
use crate::error::{AdapterError, Result};
use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use types::{Candle, Granularity};

const CANDLES_PATH: &str = "/api/v5/market/candles";
const USER_AGENT: &str = "momentum-analyzer/0.1";

/// Source of raw candles for one instrument.
///
/// Implementations return candles strictly ascending by timestamp. An error
/// means "no new data this cycle" for that granularity; callers skip it.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, granularity: &Granularity, limit: usize) -> Result<Vec<Candle>>;
}

/// Map a granularity label to the OKX `bar` parameter
pub fn okx_bar(granularity: &Granularity) -> Option<&'static str> {
    match granularity.as_str() {
        "2d" => Some("2D"),
        "1d" => Some("1D"),
        "12h" => Some("12H"),
        "6h" => Some("6H"),
        "4h" => Some("4H"),
        "2h" => Some("2H"),
        "1h" => Some("1H"),
        "30m" => Some("30m"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CandlesResponse {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

fn parse_number(row: &[Value], column: usize) -> Result<f64> {
    let field = COLUMNS[column];
    let value = row.get(column).ok_or_else(|| AdapterError::MissingField {
        field: field.to_string(),
    })?;

    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(AdapterError::InvalidNumeric {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse one `[ts_ms, open, high, low, close, volume, ...]` row
fn parse_row(row: &[Value]) -> Result<Candle> {
    let timestamp_ms = parse_number(row, 0)?;
    Ok(Candle {
        timestamp: (timestamp_ms as i64).div_euclid(1000),
        open: parse_number(row, 1)?,
        high: parse_number(row, 2)?,
        low: parse_number(row, 3)?,
        close: parse_number(row, 4)?,
        volume: parse_number(row, 5)?,
    })
}

/// Parse a candles response body into ascending candles.
///
/// Envelope errors fail the whole call; row errors only drop that row.
pub fn parse_candles_response(body: &str) -> Result<Vec<Candle>> {
    let response: CandlesResponse = serde_json::from_str(body)?;

    if response.code != "0" {
        return Err(AdapterError::Api {
            code: response.code,
            message: response.msg,
        });
    }

    let mut candles: Vec<Candle> = Vec::with_capacity(response.data.len());
    for row in response.data.iter().rev() {
        match parse_row(row) {
            Ok(candle) => {
                if let Some(last) = candles.last() {
                    if candle.timestamp <= last.timestamp {
                        warn!(
                            "Dropping out-of-order candle {} (last kept {})",
                            candle.timestamp, last.timestamp
                        );
                        continue;
                    }
                }
                candles.push(candle);
            }
            Err(e) if e.is_malformed_record() => warn!("Dropping malformed candle {:?}: {}", row, e),
            Err(e) => return Err(e),
        }
    }

    Ok(candles)
}

/// OKX REST client
pub struct OkxCandleClient {
    config: OkxAdapterConfig,
    http: reqwest::Client,
    rate_limiter: RateLimiter,
}

impl OkxCandleClient {
    pub fn new(config: OkxAdapterConfig) -> Result<Self> {
        if !config.base_url.starts_with("https://") && !config.base_url.starts_with("http://") {
            return Err(AdapterError::Configuration(format!(
                "Invalid base URL scheme: {}",
                config.base_url
            )));
        }

        if config.symbol.trim().is_empty() {
            return Err(AdapterError::Configuration(
                "No symbol configured".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window());

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &OkxAdapterConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), CANDLES_PATH)
    }

    /// Fetch up to `limit` most recent candles for `granularity`
    pub async fn fetch_from_okx(&self, granularity: &Granularity, limit: usize) -> Result<Vec<Candle>> {
        let bar = okx_bar(granularity).ok_or_else(|| AdapterError::UnsupportedGranularity {
            granularity: granularity.to_string(),
        })?;

        let limit = limit.clamp(1, self.config.max_candles_per_request.max(1));
        let url = self.endpoint();

        info!("Fetching {} candles for {} from OKX", limit, granularity);
        debug!("GET {} instId={} bar={} limit={}", url, self.config.symbol, bar, limit);

        if !self.rate_limiter.check() {
            debug!("Rate limit reached, waiting before fetching {}", granularity);
            self.rate_limiter.wait().await;
        }

        let limit_param = limit.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("instId", self.config.symbol.as_str()),
                ("bar", bar),
                ("limit", limit_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let candles = parse_candles_response(&body)?;

        if candles.is_empty() {
            warn!("No data returned for {}", granularity);
        } else {
            info!("Fetched {} candles for {}", candles.len(), granularity);
        }

        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for OkxCandleClient {
    async fn fetch_candles(&self, granularity: &Granularity, limit: usize) -> Result<Vec<Candle>> {
        self.fetch_from_okx(granularity, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "code": "0",
        "msg": "",
        "data": [
            ["1700007200000", "102", "104", "101", "103", "7.5", "0", "0", "1"],
            ["1700003600000", "101", "103", "100", "102", "6.0", "0", "0", "1"],
            ["1700000000000", "100", "102", "99", "101", "5.25", "0", "0", "1"]
        ]
    }"#;

    fn tf(label: &str) -> Granularity {
        Granularity::new(label).unwrap()
    }

    #[test]
    fn test_okx_bar_mapping() {
        assert_eq!(okx_bar(&tf("4h")), Some("4H"));
        assert_eq!(okx_bar(&tf("30m")), Some("30m"));
        assert_eq!(okx_bar(&tf("2d")), Some("2D"));
        assert_eq!(okx_bar(&tf("3m")), None);
    }

    #[test]
    fn test_parse_reverses_to_ascending() {
        let candles = parse_candles_response(BODY).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0], Candle::new(1_700_000_000, 100.0, 102.0, 99.0, 101.0, 5.25));
        assert_eq!(candles[2].timestamp, 1_700_007_200);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_parse_drops_malformed_rows() {
        let body = r#"{
            "code": "0",
            "data": [
                ["1700007200000", "102", "104", "101", "103", "7.5"],
                ["1700003600000", "101", "oops", "100", "102", "6.0"],
                ["1700001800000", "101", "103"],
                ["1700000000000", "100", "102", "99", "101", "5.25"]
            ]
        }"#;

        let candles = parse_candles_response(body).unwrap();
        let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
        assert_eq!(timestamps, vec![1_700_000_000, 1_700_007_200]);
    }

    #[test]
    fn test_parse_drops_duplicate_timestamps() {
        let body = r#"{
            "code": "0",
            "data": [
                ["1700003600000", "101", "103", "100", "102", "6.0"],
                ["1700003600000", "101", "103", "100", "102", "6.0"],
                ["1700000000000", "100", "102", "99", "101", "5.25"]
            ]
        }"#;

        let candles = parse_candles_response(body).unwrap();
        assert_eq!(candles.len(), 2);
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"code": "51001", "msg": "Instrument ID does not exist", "data": []}"#;
        match parse_candles_response(body) {
            Err(AdapterError::Api { code, message }) => {
                assert_eq!(code, "51001");
                assert_eq!(message, "Instrument ID does not exist");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_row_errors() {
        let short: Vec<Value> = vec![Value::from("1700000000000"), Value::from("1")];
        assert!(matches!(
            parse_row(&short),
            Err(AdapterError::MissingField { ref field }) if field == "high"
        ));

        let nan: Vec<Value> = ["1700000000000", "NaN", "1", "1", "1", "1"]
            .iter()
            .map(|s| Value::from(*s))
            .collect();
        assert!(matches!(
            parse_row(&nan),
            Err(AdapterError::InvalidNumeric { ref field, .. }) if field == "open"
        ));
    }

    fn client_for(base_url: String) -> OkxCandleClient {
        OkxCandleClient::new(OkxAdapterConfig {
            base_url,
            ..OkxAdapterConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_from_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", CANDLES_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("instId".into(), "BTC-USDT".into()),
                Matcher::UrlEncoded("bar".into(), "4H".into()),
                Matcher::UrlEncoded("limit".into(), "300".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let client = client_for(server.url());
        let candles = client.fetch_candles(&tf("4h"), 1_000).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", CANDLES_PATH)
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(server.url());
        let err = client.fetch_candles(&tf("1h"), 10).await.unwrap_err();
        assert!(matches!(err, AdapterError::HttpStatus { status: 503, .. }));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_fetch_waits_when_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", CANDLES_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(BODY)
            .expect(2)
            .create_async()
            .await;

        let client = OkxCandleClient::new(OkxAdapterConfig {
            base_url: server.url(),
            rate_limit_requests: 1,
            rate_limit_window_ms: 200,
            ..OkxAdapterConfig::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        client.fetch_candles(&tf("1h"), 10).await.unwrap();
        client.fetch_candles(&tf("1h"), 10).await.unwrap();

        assert!(started.elapsed() >= std::time::Duration::from_millis(150));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_unsupported_granularity() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let err = client.fetch_candles(&tf("3m"), 10).await.unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedGranularity { .. }));
    }

    #[test]
    fn test_rejects_bad_config() {
        let result = OkxCandleClient::new(OkxAdapterConfig {
            base_url: "ftp://example.com".to_string(),
            ..OkxAdapterConfig::default()
        });
        assert!(matches!(result, Err(AdapterError::Configuration(_))));
    }
}
