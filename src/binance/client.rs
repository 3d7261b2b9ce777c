// =============================================================================
// Binance Public Market Data Client
// =============================================================================
//
// Unsigned REST calls only: spot klines. Funding rates live on the futures
// host and are fetched by `futures_intel::funding_rate`.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use super::rate_limit::WeightTracker;
use crate::types::Candle;

/// Request weight Binance charges for one klines call.
const KLINES_WEIGHT: u32 = 2;

/// Binance spot REST client for public endpoints.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    weight: Arc<WeightTracker>,
}

impl BinanceClient {
    /// Create a client against `base_url` (e.g. `https://api.binance.com`)
    /// that re-uses an existing HTTP client.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BinanceClient initialised");
        Self {
            base_url,
            client,
            weight: Arc::new(WeightTracker::new()),
        }
    }

    pub fn weight_tracker(&self) -> &WeightTracker {
        &self.weight
    }

    /// GET /api/v3/klines.
    ///
    /// Array indices of each entry:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume, ...
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        if !self.weight.can_send_request(KLINES_WEIGHT) {
            anyhow::bail!("Binance request weight budget exhausted, retry in a minute");
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("interval", interval), ("limit", limit.as_str())])
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.weight.update_from_headers(resp.headers());

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

/// Parse Binance's array-of-arrays kline payload.
///
/// Entries with fewer than six elements are skipped with a warning.
pub fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        let timestamp = arr[0].as_i64().context("kline open time is not an integer")?;
        candles.push(Candle::new(
            timestamp,
            parse_str_f64(&arr[1])?,
            parse_str_f64(&arr[2])?,
            parse_str_f64(&arr[3])?,
            parse_str_f64(&arr[4])?,
            parse_str_f64(&arr[5])?,
        ));
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
pub(crate) fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("weight", &self.weight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance::test_server::CannedServer;
    use serde_json::json;
    use std::time::Duration;

    const KLINE_ROW: &str = r#"[[1700000000000,"1.0","2.0","0.5","1.5","10.0",1700003599999,"15.0",5,"5.0","7.5","0"]]"#;

    #[test]
    fn parses_kline_rows() {
        let body = json!([
            [1700000000000_i64, "37000.00", "37050.00", "36990.00", "37020.00", "123.456",
             1700003599999_i64, "4567890.12", 1500, "60.123", "2224455.66", "0"],
            [1700003600000_i64, "37020.00", "37100.00", "37000.00", "37080.50", "99.1",
             1700007199999_i64, "1.0", 10, "1.0", "1.0", "0"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert!((candles[0].close - 37020.0).abs() < f64::EPSILON);
        assert!((candles[1].high - 37100.0).abs() < f64::EPSILON);
        assert!((candles[1].volume - 99.1).abs() < 1e-9);
    }

    #[test]
    fn skips_short_rows() {
        let body = json!([[1, "1", "2"], [2, "1", "2", "0.5", "1.5", "10"]]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, 2);
    }

    #[test]
    fn rejects_non_array_body() {
        assert!(parse_klines(&json!({"code": -1121, "msg": "Invalid symbol."})).is_err());
    }

    #[test]
    fn rejects_unparseable_price() {
        let body = json!([[1, "abc", "2", "0.5", "1.5", "10"]]);
        assert!(parse_klines(&body).is_err());
    }

    #[test]
    fn parse_str_f64_accepts_numbers() {
        assert_eq!(parse_str_f64(&json!(1.5)).unwrap(), 1.5);
        assert_eq!(parse_str_f64(&json!("2.25")).unwrap(), 2.25);
        assert!(parse_str_f64(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn error_status_surfaces_upstream_body() {
        let server =
            CannedServer::start(400, &[], r#"{"code":-1121,"msg":"Invalid symbol."}"#).await;
        let client = BinanceClient::with_client(&server.base_url, reqwest::Client::new());

        let err = client.get_klines("NOPE", "1h", 10).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("400"), "{msg}");
        assert!(msg.contains("Invalid symbol."), "{msg}");
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn fetches_and_tracks_weight() {
        let server = CannedServer::start(200, &[("X-MBX-USED-WEIGHT-1M", "12")], KLINE_ROW).await;
        let client = BinanceClient::with_client(&server.base_url, reqwest::Client::new());

        let candles = client.get_klines("BTCUSDT", "1h", 1).await.unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(client.weight_tracker().snapshot().used_weight_1m, 12);
    }

    #[tokio::test]
    async fn exhausted_budget_is_refused_locally() {
        let server = CannedServer::start(200, &[("X-MBX-USED-WEIGHT-1M", "999")], KLINE_ROW).await;
        let client = BinanceClient::with_client(&server.base_url, reqwest::Client::new());

        assert!(client.get_klines("BTCUSDT", "1h", 1).await.is_ok());
        let err = client.get_klines("BTCUSDT", "1h", 1).await.unwrap_err();
        assert!(err.to_string().contains("budget exhausted"));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_recovers_after_window() {
        let server = CannedServer::start(200, &[("X-MBX-USED-WEIGHT-1M", "999")], KLINE_ROW).await;
        let client = BinanceClient {
            base_url: server.base_url.clone(),
            client: reqwest::Client::new(),
            weight: Arc::new(WeightTracker::with_window(Duration::from_millis(100))),
        };

        assert!(client.get_klines("BTCUSDT", "1h", 1).await.is_ok());
        assert!(client.get_klines("BTCUSDT", "1h", 1).await.is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(client.get_klines("BTCUSDT", "1h", 1).await.is_ok());
        assert_eq!(server.hits(), 2);
    }
}
