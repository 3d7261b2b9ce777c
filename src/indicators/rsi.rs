// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3 — Apply Wilder's smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
// =============================================================================

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Smallest series length that yields at least one RSI value.
pub fn min_len(period: usize) -> usize {
    period + 1
}

/// Running Wilder averages carried through the fold.
#[derive(Debug, Clone, Copy)]
struct WilderState {
    avg_gain: f64,
    avg_loss: f64,
}

impl WilderState {
    fn advance(&mut self, delta: f64, period: f64) {
        self.avg_gain = (self.avg_gain * (period - 1.0) + gain(delta)) / period;
        self.avg_loss = (self.avg_loss * (period - 1.0) + loss(delta)) / period;
    }

    /// - Both averages zero (no movement) => 50.0.
    /// - Average loss zero => 100.0.
    fn rsi(&self) -> f64 {
        let rsi = if self.avg_loss == 0.0 && self.avg_gain == 0.0 {
            50.0
        } else if self.avg_loss == 0.0 {
            100.0
        } else {
            let rs = self.avg_gain / self.avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        };
        rsi.clamp(0.0, 100.0)
    }
}

fn gain(delta: f64) -> f64 {
    if delta > 0.0 {
        delta
    } else {
        0.0
    }
}

fn loss(delta: f64) -> f64 {
    if delta < 0.0 {
        -delta
    } else {
        0.0
    }
}

/// Compute the RSI series aligned index-for-index with `closes`.
///
/// Indices `< period` are `None`; the first value lands at index `period`.
///
/// # Errors
/// - `period == 0` => [`EngineError::InvalidParameter`]
/// - `closes.len() < period + 1` => [`EngineError::InsufficientData`]
pub fn calculate_rsi(closes: &[f64], period: usize) -> EngineResult<Vec<Option<f64>>> {
    if period == 0 {
        return Err(EngineError::invalid("RSI period must be positive"));
    }
    let required = min_len(period);
    if closes.len() < required {
        return Err(EngineError::InsufficientData {
            indicator: "RSI",
            required,
            actual: closes.len(),
        });
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let period_f = period as f64;

    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| (g + gain(d), l + loss(d)));

    let seed = WilderState {
        avg_gain: sum_gain / period_f,
        avg_loss: sum_loss / period_f,
    };

    let mut result = Vec::with_capacity(closes.len());
    result.resize(period, None);
    result.push(Some(seed.rsi()));
    result.extend(deltas[period..].iter().scan(seed, |state, &delta| {
        state.advance(delta, period_f);
        Some(Some(state.rsi()))
    }));

    Ok(result)
}
