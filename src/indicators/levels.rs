// =============================================================================
// Support / Resistance Level Finder
// =============================================================================
//
// support    = min(low)  over the last `lookback` bars
// resistance = max(high) over the last `lookback` bars
//
// When several bars share the extreme, the most recent one is reported.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::OhlcvSeries;

pub const DEFAULT_LEVEL_LOOKBACK: usize = 100;

/// Price floor and ceiling over the look-back window, with the timestamps of
/// the bars that set them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Levels {
    pub support: f64,
    pub resistance: f64,
    pub support_at: i64,
    pub resistance_at: i64,
}

pub fn find_levels(series: &OhlcvSeries, lookback: usize) -> EngineResult<Levels> {
    if lookback == 0 {
        return Err(EngineError::invalid("level lookback must be positive"));
    }
    let candles = series.candles();
    let first = candles.len().saturating_sub(lookback);
    let window = &candles[first..];

    let Some(seed) = window.first() else {
        return Err(EngineError::InsufficientData {
            indicator: "levels",
            required: 1,
            actual: 0,
        });
    };

    let init = Levels {
        support: seed.low,
        resistance: seed.high,
        support_at: seed.timestamp,
        resistance_at: seed.timestamp,
    };

    // `<=` / `>=` so later bars win ties.
    Ok(window[1..].iter().fold(init, |mut acc, c| {
        if c.low <= acc.support {
            acc.support = c.low;
            acc.support_at = c.timestamp;
        }
        if c.high >= acc.resistance {
            acc.resistance = c.high;
            acc.resistance_at = c.timestamp;
        }
        acc
    }))
}
