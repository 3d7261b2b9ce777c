// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   dif  = EMA(close, fast) - EMA(close, slow)
//   dea  = EMA(dif, signal)
//   hist = 2 * (dif - dea)
//
// Alignment with the input closes:
//   dif        defined from index slow - 1
//   dea, hist  defined from index slow + signal - 2
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;
use super::left_pad;
use crate::error::{EngineError, EngineResult};

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

/// MACD look-back periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    #[serde(default = "default_fast")]
    pub fast: usize,
    #[serde(default = "default_slow")]
    pub slow: usize,
    #[serde(default = "default_signal")]
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            slow: default_slow(),
            signal: default_signal(),
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> EngineResult<()> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(EngineError::invalid(format!(
                "MACD periods must be positive (fast={}, slow={}, signal={})",
                self.fast, self.slow, self.signal
            )));
        }
        if self.fast >= self.slow {
            return Err(EngineError::invalid(format!(
                "MACD fast period {} must be shorter than slow period {}",
                self.fast, self.slow
            )));
        }
        Ok(())
    }

    /// Smallest series length accepted by [`calculate_macd`].
    pub fn min_len(&self) -> usize {
        self.slow + self.signal
    }
}

/// MACD lines aligned index-for-index with the input closes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub dif: Vec<Option<f64>>,
    pub dea: Vec<Option<f64>>,
    pub hist: Vec<Option<f64>>,
}

/// Latest defined values of each MACD line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub dif: f64,
    pub dea: f64,
    pub hist: f64,
}

impl MacdSeries {
    /// Values at the last bar, if all three lines are defined there.
    pub fn latest(&self) -> Option<MacdPoint> {
        Some(MacdPoint {
            dif: (*self.dif.last()?)?,
            dea: (*self.dea.last()?)?,
            hist: (*self.hist.last()?)?,
        })
    }
}

/// Compute MACD over `closes`.
///
/// # Errors
/// - invalid periods => [`EngineError::InvalidParameter`]
/// - `closes.len() < slow + signal` => [`EngineError::InsufficientData`]
pub fn calculate_macd(closes: &[f64], params: &MacdParams) -> EngineResult<MacdSeries> {
    params.validate()?;
    let required = params.min_len();
    if closes.len() < required {
        return Err(EngineError::InsufficientData {
            indicator: "MACD",
            required,
            actual: closes.len(),
        });
    }

    let fast = calculate_ema(closes, params.fast);
    let slow = calculate_ema(closes, params.slow);

    // Both compact series end at the last close; skip the head of the fast
    // one so the two line up.
    let offset = params.slow - params.fast;
    let dif: Vec<f64> = fast[offset..]
        .iter()
        .zip(&slow)
        .map(|(f, s)| f - s)
        .collect();

    let dea = calculate_ema(&dif, params.signal);
    let hist: Vec<f64> = dif[params.signal - 1..]
        .iter()
        .zip(&dea)
        .map(|(d, e)| 2.0 * (d - e))
        .collect();

    let n = closes.len();
    Ok(MacdSeries {
        dif: left_pad(n, dif),
        dea: left_pad(n, dea),
        hist: left_pad(n, hist),
    })
}
