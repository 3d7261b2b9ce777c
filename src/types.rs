// =============================================================================
// Shared types used across the signal service
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single OHLCV bar. `timestamp` is the bar open time in epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn prices_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Ordered candle series with strictly increasing timestamps.
///
/// The only way to build one is through validation, and candles can be
/// appended but never mutated or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OhlcvSeries {
    candles: Vec<Candle>,
}

impl OhlcvSeries {
    /// Validate `candles` and wrap them.
    ///
    /// Fails with [`EngineError::MalformedSeries`] on a duplicate or
    /// decreasing timestamp, or on a non-finite price/volume.
    pub fn new(candles: Vec<Candle>) -> EngineResult<Self> {
        let mut series = Self {
            candles: Vec::with_capacity(candles.len()),
        };
        for candle in candles {
            series.push(candle)?;
        }
        Ok(series)
    }

    /// Append one bar, rejecting it if it breaks ordering.
    pub fn push(&mut self, candle: Candle) -> EngineResult<()> {
        let index = self.candles.len();

        if !candle.prices_finite() {
            return Err(EngineError::MalformedSeries {
                index,
                reason: "non-finite price or volume".to_string(),
            });
        }

        if let Some(prev) = self.candles.last() {
            if candle.timestamp == prev.timestamp {
                return Err(EngineError::MalformedSeries {
                    index,
                    reason: format!("duplicate timestamp {}", candle.timestamp),
                });
            }
            if candle.timestamp < prev.timestamp {
                return Err(EngineError::MalformedSeries {
                    index,
                    reason: format!(
                        "timestamp {} is earlier than previous {}",
                        candle.timestamp, prev.timestamp
                    ),
                });
            }
        }

        self.candles.push(candle);
        Ok(())
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Close prices in series order.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

/// Discrete trading action emitted by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Wait,
}

impl Default for Action {
    fn default() -> Self {
        Self::Wait
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
            Self::Wait => write!(f, "wait"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, 10.0)
    }

    #[test]
    fn accepts_strictly_increasing() {
        let series = OhlcvSeries::new(vec![bar(1, 1.0), bar(2, 2.0), bar(5, 3.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let err = OhlcvSeries::new(vec![bar(1, 1.0), bar(1, 2.0)]).unwrap_err();
        assert!(matches!(err, EngineError::MalformedSeries { index: 1, .. }));
    }

    #[test]
    fn rejects_decreasing_timestamp() {
        let err = OhlcvSeries::new(vec![bar(1, 1.0), bar(3, 2.0), bar(2, 3.0)]).unwrap_err();
        assert!(matches!(err, EngineError::MalformedSeries { index: 2, .. }));
    }

    #[test]
    fn rejects_nan_close() {
        let err = OhlcvSeries::new(vec![bar(1, f64::NAN)]).unwrap_err();
        assert!(matches!(err, EngineError::MalformedSeries { index: 0, .. }));
    }

    #[test]
    fn failed_push_leaves_series_untouched() {
        let mut series = OhlcvSeries::new(vec![bar(10, 1.0)]).unwrap();
        assert!(series.push(bar(9, 2.0)).is_err());
        assert_eq!(series.len(), 1);
        series.push(bar(11, 2.0)).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn action_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"buy\"");
        assert_eq!(Action::default(), Action::Wait);
    }
}
