// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations. Every series-producing
// function returns values aligned index-for-index with its input, using
// `None` for leading bars where the indicator is not yet defined.

pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;

use serde::Serialize;

use crate::error::{EngineError, EngineResult};

pub use levels::{find_levels, Levels};
pub use macd::{calculate_macd, MacdParams, MacdPoint, MacdSeries};
pub use rsi::calculate_rsi;

/// Indicators that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Rsi,
    Macd,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 2] = [IndicatorKind::Rsi, IndicatorKind::Macd];

    pub fn parse(name: &str) -> EngineResult<Self> {
        match name.trim().to_uppercase().as_str() {
            "RSI" => Ok(Self::Rsi),
            "MACD" => Ok(Self::Macd),
            other => Err(EngineError::invalid(format!(
                "unsupported indicator '{other}' (expected RSI or MACD)"
            ))),
        }
    }

    /// Parse a comma-separated list such as `"RSI,MACD"`.
    ///
    /// Blank entries are skipped and duplicates collapse; an empty list means
    /// every supported indicator.
    pub fn parse_list(list: &str) -> EngineResult<Vec<Self>> {
        let mut kinds = Vec::new();
        for name in list.split(',').filter(|s| !s.trim().is_empty()) {
            let kind = Self::parse(name)?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            kinds.extend(Self::ALL);
        }
        Ok(kinds)
    }
}

/// Indicator arrays aligned with the input series. Indicators that were not
/// requested are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndicatorSet {
    #[serde(rename = "RSI", skip_serializing_if = "Option::is_none")]
    pub rsi: Option<Vec<Option<f64>>>,
    #[serde(rename = "MACD", skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdSeries>,
}

/// Left-pad a compact indicator series with `None` up to `len`.
pub(crate) fn left_pad(len: usize, compact: Vec<f64>) -> Vec<Option<f64>> {
    let lead = len.saturating_sub(compact.len());
    let mut out = Vec::with_capacity(len);
    out.resize(lead, None);
    out.extend(compact.into_iter().map(Some));
    out
}
