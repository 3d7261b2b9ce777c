// =============================================================================
// Central Application State
// =============================================================================
//
// Shared by every handler through `Arc<AppState>`. The engine is immutable
// and stateless; all interior mutability lives in the market feed caches.
// =============================================================================

use std::time::Instant;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::market_data::{CandleKey, MarketFeed};
use crate::runtime_config::RuntimeConfig;
use crate::signals::SignalEngine;

pub struct AppState {
    pub runtime_config: RuntimeConfig,
    pub engine: SignalEngine,
    pub feed: MarketFeed,
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: Instant,
}

impl AppState {
    /// Build state from `config`, validating the engine parameters up front.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let engine = SignalEngine::new(config.engine).context("invalid engine parameters")?;
        let feed = MarketFeed::new(&config)?;

        Ok(Self {
            runtime_config: config,
            engine,
            feed,
            start_time: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Fetch every configured warm pair into the OHLCV cache concurrently.
    /// Failures are logged and otherwise ignored.
    pub async fn warm_caches(&self) {
        let cfg = &self.runtime_config;
        let keys: Vec<CandleKey> = cfg
            .warm_pairs
            .iter()
            .filter_map(|pair| {
                match CandleKey::new(&pair.symbol, &pair.timeframe, cfg.default_limit, cfg.max_limit) {
                    Ok(key) => Some(key),
                    Err(e) => {
                        warn!(symbol = %pair.symbol, timeframe = %pair.timeframe, error = %e, "skipping invalid warm pair");
                        None
                    }
                }
            })
            .collect();

        let results = join_all(keys.iter().map(|key| self.feed.ohlcv(key))).await;

        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(series) => info!(key = %key, rows = series.len(), "cache warm completed"),
                Err(e) => warn!(key = %key, error = %e, "cache warm failed"),
            }
        }
    }
}
