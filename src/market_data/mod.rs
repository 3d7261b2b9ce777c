pub mod cache;
pub mod feed;

pub use feed::MarketFeed;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Kline intervals Binance accepts.
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

pub const SUPPORTED_EXCHANGES: &[&str] = &["binance"];

/// Identifies one cached candle request.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub interval: String,
    pub limit: u32,
}

impl std::fmt::Display for CandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}x{}", self.symbol, self.interval, self.limit)
    }
}

impl CandleKey {
    /// Normalise and validate raw request parameters.
    pub fn new(symbol: &str, interval: &str, limit: u32, max_limit: u32) -> EngineResult<Self> {
        let symbol = normalize_symbol(symbol)?;
        if !SUPPORTED_INTERVALS.contains(&interval) {
            return Err(EngineError::invalid(format!(
                "unsupported timeframe '{interval}'"
            )));
        }
        if limit == 0 || limit > max_limit {
            return Err(EngineError::invalid(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(Self {
            symbol,
            interval: interval.to_string(),
            limit,
        })
    }
}

/// `"btc/usdt"` => `"BTCUSDT"`.
pub fn normalize_symbol(raw: &str) -> EngineResult<String> {
    let symbol: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '/' && *c != '-')
        .collect::<String>()
        .to_uppercase();

    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(EngineError::invalid(format!("invalid symbol '{raw}'")));
    }
    Ok(symbol)
}

pub fn check_exchange(exchange: &str) -> EngineResult<()> {
    if SUPPORTED_EXCHANGES
        .iter()
        .any(|e| e.eq_ignore_ascii_case(exchange.trim()))
    {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "unsupported exchange '{exchange}'"
        )))
    }
}
