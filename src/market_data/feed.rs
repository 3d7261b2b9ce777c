// ---------------------------------------------------------------------------
// MarketFeed -- cached access to candles and funding rates
// ---------------------------------------------------------------------------
//
// The signal engine never touches the network or a cache; this is the layer
// that does. Candles are cached per `(symbol, interval, limit)` and funding
// snapshots per symbol, each with its own TTL. Concurrent misses on the same
// candle key share one upstream fetch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;

use super::cache::TtlCache;
use super::CandleKey;
use crate::binance::BinanceClient;
use crate::error::ApiError;
use crate::futures_intel::{FundingRateMonitor, FundingSnapshot};
use crate::runtime_config::RuntimeConfig;
use crate::types::OhlcvSeries;

type FetchGate = Arc<tokio::sync::Mutex<()>>;

pub struct MarketFeed {
    binance: BinanceClient,
    funding_monitor: FundingRateMonitor,
    pub(crate) ohlcv_cache: TtlCache<CandleKey, Arc<OhlcvSeries>>,
    pub(crate) funding_cache: TtlCache<String, FundingSnapshot>,
    /// Symbol -> last funding error, for symbols without a usable perpetual.
    funding_misses: TtlCache<String, String>,
    in_flight: Mutex<HashMap<CandleKey, FetchGate>>,
}

impl MarketFeed {
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            binance: BinanceClient::with_client(&config.spot_base_url, client.clone()),
            funding_monitor: FundingRateMonitor::with_client(&config.futures_base_url, client),
            ohlcv_cache: TtlCache::new(
                Duration::from_secs(config.ohlcv_cache_secs),
                config.cache_capacity,
            ),
            funding_cache: TtlCache::new(
                Duration::from_secs(config.funding_cache_secs),
                config.cache_capacity,
            ),
            funding_misses: TtlCache::new(
                Duration::from_secs(config.funding_miss_cache_secs),
                config.cache_capacity,
            ),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn binance(&self) -> &BinanceClient {
        &self.binance
    }

    /// Validated candle series for `key`, served from cache when fresh.
    pub async fn ohlcv(&self, key: &CandleKey) -> Result<Arc<OhlcvSeries>, ApiError> {
        if let Some(series) = self.ohlcv_cache.get(key) {
            debug!(key = %key, "ohlcv cache hit");
            return Ok(series);
        }

        let gate = self.in_flight.lock().entry(key.clone()).or_default().clone();
        let _guard = gate.lock().await;

        // Filled by a concurrent request while we waited on the gate.
        if let Some(series) = self.ohlcv_cache.get(key) {
            debug!(key = %key, "ohlcv cache filled by concurrent fetch");
            return Ok(series);
        }

        debug!(key = %key, "ohlcv cache miss");
        let result = self.fetch_ohlcv(key).await;

        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|g| Arc::ptr_eq(g, &gate)) {
            in_flight.remove(key);
        }
        result
    }

    async fn fetch_ohlcv(&self, key: &CandleKey) -> Result<Arc<OhlcvSeries>, ApiError> {
        let candles = self
            .binance
            .get_klines(&key.symbol, &key.interval, key.limit)
            .await
            .with_context(|| format!("fetching klines for {key}"))?;

        let series = Arc::new(OhlcvSeries::new(candles)?);
        self.ohlcv_cache.insert(key.clone(), series.clone());
        Ok(series)
    }

    /// Latest funding snapshot for `symbol`, served from cache when fresh.
    /// Failed lookups are remembered for a short while and fail fast.
    pub async fn funding(&self, symbol: &str) -> Result<FundingSnapshot> {
        let key = symbol.to_string();
        if let Some(snapshot) = self.funding_cache.get(&key) {
            debug!(symbol, "funding cache hit");
            return Ok(snapshot);
        }
        if let Some(reason) = self.funding_misses.get(&key) {
            debug!(symbol, "funding miss cache hit");
            anyhow::bail!("funding unavailable for {symbol} (cached): {reason}");
        }

        match self.funding_monitor.fetch(symbol).await {
            Ok(snapshot) => {
                self.funding_cache.insert(key, snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                self.funding_misses.insert(key, format!("{e:#}"));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance::test_server::CannedServer;

    const KLINE_ROWS: &str = r#"[
        [1700000000000,"100.0","101.0","99.0","100.5","10.0"],
        [1700003600000,"100.5","102.0","100.0","101.5","12.0"],
        [1700007200000,"101.5","103.0","101.0","102.5","9.0"]
    ]"#;
    const INVALID_SYMBOL: &str = r#"{"code":-1121,"msg":"Invalid symbol."}"#;

    fn feed_for(spot: &str, futures: &str, funding_miss_cache_secs: u64) -> MarketFeed {
        let config = RuntimeConfig {
            spot_base_url: spot.to_string(),
            futures_base_url: futures.to_string(),
            http_timeout_secs: 5,
            funding_miss_cache_secs,
            ..RuntimeConfig::default()
        };
        MarketFeed::new(&config).unwrap()
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let server =
            CannedServer::start_delayed(200, &[], KLINE_ROWS, Duration::from_millis(100)).await;
        let feed = feed_for(&server.base_url, "http://127.0.0.1:9", 30);
        let key = CandleKey::new("BTCUSDT", "1h", 3, 1000).unwrap();

        let (a, b) = tokio::join!(feed.ohlcv(&key), feed.ohlcv(&key));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.len(), 3);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(server.hits(), 1);
        assert!(feed.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn cached_series_skips_upstream() {
        let server = CannedServer::start(200, &[], KLINE_ROWS).await;
        let feed = feed_for(&server.base_url, "http://127.0.0.1:9", 30);
        let key = CandleKey::new("BTCUSDT", "1h", 3, 1000).unwrap();

        feed.ohlcv(&key).await.unwrap();
        feed.ohlcv(&key).await.unwrap();
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn failed_funding_lookup_is_remembered() {
        let server = CannedServer::start(400, &[], INVALID_SYMBOL).await;
        let feed = feed_for("http://127.0.0.1:9", &server.base_url, 30);

        assert!(feed.funding("SPOTONLY").await.is_err());
        let err = feed.funding("SPOTONLY").await.unwrap_err();
        assert!(err.to_string().contains("cached"));
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn funding_miss_expires() {
        let server = CannedServer::start(400, &[], INVALID_SYMBOL).await;
        let feed = feed_for("http://127.0.0.1:9", &server.base_url, 0);

        assert!(feed.funding("SPOTONLY").await.is_err());
        assert!(feed.funding("SPOTONLY").await.is_err());
        assert_eq!(server.hits(), 2);
    }
}
