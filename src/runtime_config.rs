// =============================================================================
// Runtime Configuration
// =============================================================================
//
// Every tunable of the service lives here: bind address, upstream hosts,
// cache lifetimes and the signal engine parameters. All fields carry
// `#[serde(default)]` so that a partial (or empty) JSON file still loads.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::signals::EngineParams;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_spot_base_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_futures_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_timeframe() -> String {
    "1h".to_string()
}

fn default_limit() -> u32 {
    300
}

fn default_max_limit() -> u32 {
    1000
}

fn default_ohlcv_cache_secs() -> u64 {
    60
}

fn default_funding_cache_secs() -> u64 {
    300
}

fn default_funding_miss_cache_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    64
}

fn default_warm_pairs() -> Vec<WarmPair> {
    vec![
        WarmPair {
            symbol: "BTCUSDT".to_string(),
            timeframe: "1h".to_string(),
        },
        WarmPair {
            symbol: "ETHUSDT".to_string(),
            timeframe: "4h".to_string(),
        },
    ]
}

// =============================================================================
// WarmPair
// =============================================================================

/// A `(symbol, timeframe)` pair fetched into the cache at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmPair {
    pub symbol: String,
    pub timeframe: String,
}

/// Parse `"BTCUSDT:1h,ETHUSDT:4h"`. Entries without a timeframe use
/// `default_timeframe`.
pub fn parse_warm_pairs(raw: &str, default_timeframe: &str) -> Vec<WarmPair> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((sym, tf)) => WarmPair {
                symbol: sym.trim().to_uppercase(),
                timeframe: tf.trim().to_string(),
            },
            None => WarmPair {
                symbol: entry.to_uppercase(),
                timeframe: default_timeframe.to_string(),
            },
        })
        .collect()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Server -------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Upstream -----------------------------------------------------------

    /// Binance spot REST host (klines).
    #[serde(default = "default_spot_base_url")]
    pub spot_base_url: String,

    /// Binance USDⓈ-M futures REST host (premium index / funding).
    #[serde(default = "default_futures_base_url")]
    pub futures_base_url: String,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    // --- Request defaults ---------------------------------------------------

    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,

    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Upper bound accepted for the `limit` query parameter.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    // --- Caching ------------------------------------------------------------

    #[serde(default = "default_ohlcv_cache_secs")]
    pub ohlcv_cache_secs: u64,

    #[serde(default = "default_funding_cache_secs")]
    pub funding_cache_secs: u64,

    /// How long a failed funding lookup is remembered, so symbols without
    /// a perpetual do not pay a futures round trip on every signal.
    #[serde(default = "default_funding_miss_cache_secs")]
    pub funding_miss_cache_secs: u64,

    /// Maximum entries per cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Pairs fetched into the OHLCV cache at startup.
    #[serde(default = "default_warm_pairs")]
    pub warm_pairs: Vec<WarmPair>,

    // --- Engine -------------------------------------------------------------

    #[serde(default)]
    pub engine: EngineParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            spot_base_url: default_spot_base_url(),
            futures_base_url: default_futures_base_url(),
            http_timeout_secs: default_http_timeout_secs(),
            default_timeframe: default_timeframe(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            ohlcv_cache_secs: default_ohlcv_cache_secs(),
            funding_cache_secs: default_funding_cache_secs(),
            funding_miss_cache_secs: default_funding_miss_cache_secs(),
            cache_capacity: default_cache_capacity(),
            warm_pairs: default_warm_pairs(),
            engine: EngineParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `SIGNAL_BIND_ADDR` and `SIGNAL_WARM_PAIRS` overrides.
    pub fn apply_env(&mut self) {
        if let Ok(addr) = std::env::var("SIGNAL_BIND_ADDR") {
            if !addr.trim().is_empty() {
                self.bind_addr = addr.trim().to_string();
            }
        }
        if let Ok(pairs) = std::env::var("SIGNAL_WARM_PAIRS") {
            self.warm_pairs = parse_warm_pairs(&pairs, &self.default_timeframe);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.default_limit, 300);
        assert_eq!(cfg.max_limit, 1000);
        assert_eq!(cfg.funding_cache_secs, 300);
        assert_eq!(cfg.funding_miss_cache_secs, 30);
        assert_eq!(cfg.warm_pairs.len(), 2);
        assert_eq!(cfg.warm_pairs[1].timeframe, "4h");
        assert_eq!(cfg.engine.rsi_period, 14);
        assert_eq!(cfg.engine.macd.slow, 26);
        assert_eq!(cfg.engine.level_lookback, 100);
        assert_eq!(cfg.engine.classifier.max_reasons, 5);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8000");
        assert_eq!(cfg.engine, EngineParams::default());
    }

    #[test]
    fn deserialise_partial_engine_fills_defaults() {
        let json = r#"{ "engine": { "rsi_period": 21, "macd": { "fast": 8 } } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.engine.rsi_period, 21);
        assert_eq!(cfg.engine.macd.fast, 8);
        assert_eq!(cfg.engine.macd.slow, 26);
        assert!((cfg.engine.classifier.rsi_overbought - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(RuntimeConfig::load("/nonexistent/signal_config.json").is_err());
    }

    #[test]
    fn parse_warm_pairs_handles_defaults() {
        let pairs = parse_warm_pairs(" btcusdt:1h, SOLUSDT ,,", "4h");
        assert_eq!(
            pairs,
            vec![
                WarmPair {
                    symbol: "BTCUSDT".into(),
                    timeframe: "1h".into()
                },
                WarmPair {
                    symbol: "SOLUSDT".into(),
                    timeframe: "4h".into()
                },
            ]
        );
    }
}
