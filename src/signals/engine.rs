// =============================================================================
// Signal Engine
// =============================================================================
//
// Stateless facade over the indicator calculators and the classifier. Every
// call is a pure function of the series it is given: no caching, no locks, no
// I/O, so one engine can be shared freely between concurrent requests.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::indicators::levels::DEFAULT_LEVEL_LOOKBACK;
use crate::indicators::rsi::{self, DEFAULT_RSI_PERIOD};
use crate::indicators::{
    calculate_macd, calculate_rsi, find_levels, IndicatorKind, IndicatorSet, Levels, MacdParams,
};
use crate::signals::classifier::{classify, ClassifierInput, ClassifierThresholds};
use crate::types::{Action, OhlcvSeries};

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_level_lookback() -> usize {
    DEFAULT_LEVEL_LOOKBACK
}

/// All tunables of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default)]
    pub macd: MacdParams,
    #[serde(default = "default_level_lookback")]
    pub level_lookback: usize,
    #[serde(default)]
    pub classifier: ClassifierThresholds,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            macd: MacdParams::default(),
            level_lookback: default_level_lookback(),
            classifier: ClassifierThresholds::default(),
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> EngineResult<()> {
        if self.rsi_period == 0 {
            return Err(EngineError::invalid("RSI period must be positive"));
        }
        self.macd.validate()?;
        if self.level_lookback == 0 {
            return Err(EngineError::invalid("level lookback must be positive"));
        }
        if self.classifier.max_reasons == 0 {
            return Err(EngineError::invalid("max_reasons must be positive"));
        }
        Ok(())
    }
}

/// Latest-bar values reported with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub rsi: f64,
    /// Funding rate in percent, 0.0 when unavailable.
    pub funding: f64,
    pub macd_hist: f64,
    pub dif: f64,
    pub dea: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub action: Action,
    pub scores: Scores,
    pub reasons: Vec<String>,
    pub levels: Levels,
}

#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: EngineParams,
}

impl SignalEngine {
    pub fn new(params: EngineParams) -> EngineResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Compute the requested indicators over `series`.
    ///
    /// Only the requested indicators are length-checked, so an RSI-only
    /// request succeeds on a series too short for MACD.
    pub fn indicators(
        &self,
        series: &OhlcvSeries,
        kinds: &[IndicatorKind],
    ) -> EngineResult<IndicatorSet> {
        let closes = series.closes();
        let mut set = IndicatorSet::default();

        for kind in kinds {
            match kind {
                IndicatorKind::Rsi => {
                    set.rsi = Some(calculate_rsi(&closes, self.params.rsi_period)?);
                }
                IndicatorKind::Macd => {
                    set.macd = Some(calculate_macd(&closes, &self.params.macd)?);
                }
            }
        }

        Ok(set)
    }

    /// Derive a trading signal from the latest bar of `series`.
    ///
    /// `funding_pct` is the perpetual funding rate in percent; pass `None`
    /// when the feed is unavailable and the funding rules are skipped.
    pub fn signal(&self, series: &OhlcvSeries, funding_pct: Option<f64>) -> EngineResult<Signal> {
        let closes = series.closes();

        let rsi_series = calculate_rsi(&closes, self.params.rsi_period)?;
        let macd_series = calculate_macd(&closes, &self.params.macd)?;

        let rsi = rsi_series
            .last()
            .copied()
            .flatten()
            .ok_or(EngineError::InsufficientData {
                indicator: "RSI",
                required: rsi::min_len(self.params.rsi_period),
                actual: closes.len(),
            })?;
        let macd = macd_series.latest().ok_or(EngineError::InsufficientData {
            indicator: "MACD",
            required: self.params.macd.min_len(),
            actual: closes.len(),
        })?;

        let levels = find_levels(series, self.params.level_lookback)?;
        // Non-empty: the RSI length check above already passed.
        let close = closes.last().copied().unwrap_or_default();

        let input = ClassifierInput {
            rsi,
            macd,
            funding_pct,
            levels,
            close,
        };
        let classification = classify(&input, &self.params.classifier);

        debug!(
            action = %classification.action,
            rsi,
            hist = macd.hist,
            funding_pct = ?funding_pct,
            "signal classified"
        );

        Ok(Signal {
            action: classification.action,
            scores: Scores {
                rsi,
                funding: funding_pct.unwrap_or(0.0),
                macd_hist: macd.hist,
                dif: macd.dif,
                dea: macd.dea,
            },
            reasons: classification.reasons,
            levels,
        })
    }
}

impl Default for SignalEngine {
    fn default() -> Self {
        Self {
            params: EngineParams::default(),
        }
    }
}
