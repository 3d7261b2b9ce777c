// =============================================================================
// Signal Classifier — rule-precedence action with accumulated reasons
// =============================================================================
//
// Rules are evaluated in order. The first rule that fires decides the action;
// every rule that fires contributes its reason, in evaluation order. When no
// rule fires the action is `wait`.
//
//   1. RSI > overbought AND hist < 0   => sell
//   2. RSI < oversold   AND hist > 0   => buy
//   3. funding > funding_high          => sell
//   4. funding < funding_low           => buy
//   5. hist > 0 AND dif > dea          => buy
//   6. hist < 0 AND dif < dea          => sell
//
// Two informational conditions follow (price testing support / resistance).
// They add reasons but never change the action. Reasons are capped at
// `max_reasons`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{Levels, MacdPoint};
use crate::types::Action;

pub const REASON_NO_SIGNAL: &str = "No strong signal";

fn default_rsi_overbought() -> f64 {
    75.0
}

fn default_rsi_oversold() -> f64 {
    25.0
}

fn default_funding_high_pct() -> f64 {
    0.05
}

fn default_funding_low_pct() -> f64 {
    -0.05
}

fn default_max_reasons() -> usize {
    5
}

fn default_level_proximity_pct() -> f64 {
    0.5
}

/// Tunable thresholds for [`classify`]. Funding values are percentages
/// (0.05 means 0.05 %).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierThresholds {
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    #[serde(default = "default_funding_high_pct")]
    pub funding_high_pct: f64,
    #[serde(default = "default_funding_low_pct")]
    pub funding_low_pct: f64,
    #[serde(default = "default_max_reasons")]
    pub max_reasons: usize,
    /// Distance from a level, as a percentage of the close, that counts as
    /// testing it.
    #[serde(default = "default_level_proximity_pct")]
    pub level_proximity_pct: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            funding_high_pct: default_funding_high_pct(),
            funding_low_pct: default_funding_low_pct(),
            max_reasons: default_max_reasons(),
            level_proximity_pct: default_level_proximity_pct(),
        }
    }
}

/// Latest-bar inputs to the classifier.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput {
    pub rsi: f64,
    pub macd: MacdPoint,
    /// Funding rate in percent; `None` when the feed was unavailable.
    pub funding_pct: Option<f64>,
    pub levels: Levels,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub action: Action,
    pub reasons: Vec<String>,
}

struct Rule {
    action: Action,
    reason: &'static str,
    fires: fn(&ClassifierInput, &ClassifierThresholds) -> bool,
}

const RULES: [Rule; 6] = [
    Rule {
        action: Action::Sell,
        reason: "RSI overbought + MACD turning down",
        fires: |i, t| i.rsi > t.rsi_overbought && i.macd.hist < 0.0,
    },
    Rule {
        action: Action::Buy,
        reason: "RSI oversold + MACD turning up",
        fires: |i, t| i.rsi < t.rsi_oversold && i.macd.hist > 0.0,
    },
    Rule {
        action: Action::Sell,
        reason: "Funding rate elevated (crowded long)",
        fires: |i, t| i.funding_pct.is_some_and(|f| f > t.funding_high_pct),
    },
    Rule {
        action: Action::Buy,
        reason: "Funding rate negative (crowded short)",
        fires: |i, t| i.funding_pct.is_some_and(|f| f < t.funding_low_pct),
    },
    Rule {
        action: Action::Buy,
        reason: "MACD bullish crossover",
        fires: |i, _| i.macd.hist > 0.0 && i.macd.dif > i.macd.dea,
    },
    Rule {
        action: Action::Sell,
        reason: "MACD bearish crossover",
        fires: |i, _| i.macd.hist < 0.0 && i.macd.dif < i.macd.dea,
    },
];

fn near_support(input: &ClassifierInput, t: &ClassifierThresholds) -> bool {
    input.close > 0.0
        && input.close >= input.levels.support
        && (input.close - input.levels.support) / input.close * 100.0 <= t.level_proximity_pct
}

fn near_resistance(input: &ClassifierInput, t: &ClassifierThresholds) -> bool {
    input.close > 0.0
        && input.close <= input.levels.resistance
        && (input.levels.resistance - input.close) / input.close * 100.0 <= t.level_proximity_pct
}

pub fn classify(input: &ClassifierInput, thresholds: &ClassifierThresholds) -> Classification {
    let fired: Vec<&Rule> = RULES
        .iter()
        .filter(|rule| (rule.fires)(input, thresholds))
        .collect();

    let action = fired.first().map_or(Action::Wait, |rule| rule.action);

    let mut reasons: Vec<String> = if fired.is_empty() {
        vec![REASON_NO_SIGNAL.to_string()]
    } else {
        fired.iter().map(|rule| rule.reason.to_string()).collect()
    };

    if near_support(input, thresholds) {
        reasons.push("Price testing support".to_string());
    }
    if near_resistance(input, thresholds) {
        reasons.push("Price testing resistance".to_string());
    }

    reasons.truncate(thresholds.max_reasons);

    Classification { action, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rsi: f64, dif: f64, dea: f64, funding_pct: Option<f64>) -> ClassifierInput {
        ClassifierInput {
            rsi,
            macd: MacdPoint {
                dif,
                dea,
                hist: 2.0 * (dif - dea),
            },
            funding_pct,
            levels: Levels {
                support: 90.0,
                resistance: 110.0,
                support_at: 0,
                resistance_at: 0,
            },
            close: 100.0,
        }
    }

    fn run(i: ClassifierInput) -> Classification {
        classify(&i, &ClassifierThresholds::default())
    }

    #[test]
    fn overbought_turning_down_sells() {
        let c = run(input(80.0, 1.0, 2.0, None));
        assert_eq!(c.action, Action::Sell);
        assert_eq!(
            c.reasons,
            vec!["RSI overbought + MACD turning down", "MACD bearish crossover"]
        );
    }

    #[test]
    fn oversold_turning_up_buys() {
        let c = run(input(20.0, 2.0, 1.0, None));
        assert_eq!(c.action, Action::Buy);
        assert_eq!(c.reasons[0], "RSI oversold + MACD turning up");
        assert_eq!(c.reasons[1], "MACD bullish crossover");
    }

    #[test]
    fn funding_outranks_macd() {
        // Bullish MACD, but funding is crowded long: rule 3 comes first.
        let c = run(input(50.0, 2.0, 1.0, Some(0.08)));
        assert_eq!(c.action, Action::Sell);
        assert_eq!(
            c.reasons,
            vec!["Funding rate elevated (crowded long)", "MACD bullish crossover"]
        );
    }

    #[test]
    fn negative_funding_buys() {
        let c = run(input(50.0, 1.0, 1.0, Some(-0.06)));
        assert_eq!(c.action, Action::Buy);
        assert_eq!(c.reasons, vec!["Funding rate negative (crowded short)"]);
    }

    #[test]
    fn rsi_rule_outranks_funding() {
        let c = run(input(20.0, 2.0, 1.0, Some(0.08)));
        assert_eq!(c.action, Action::Buy);
        assert_eq!(
            c.reasons,
            vec![
                "RSI oversold + MACD turning up",
                "Funding rate elevated (crowded long)",
                "MACD bullish crossover",
            ]
        );
    }

    #[test]
    fn missing_funding_skips_funding_rules() {
        let c = run(input(50.0, 1.0, 1.0, None));
        assert_eq!(c.action, Action::Wait);
        assert_eq!(c.reasons, vec![REASON_NO_SIGNAL]);
    }

    #[test]
    fn thresholds_are_strict() {
        let c = run(input(75.0, 1.0, 1.0, Some(0.05)));
        assert_eq!(c.action, Action::Wait);
    }

    #[test]
    fn level_proximity_is_informational() {
        let mut i = input(50.0, 1.0, 1.0, None);
        i.close = 90.3;
        let c = run(i);
        assert_eq!(c.action, Action::Wait);
        assert_eq!(c.reasons, vec![REASON_NO_SIGNAL, "Price testing support"]);

        i.close = 109.8;
        let c = run(i);
        assert_eq!(c.reasons, vec![REASON_NO_SIGNAL, "Price testing resistance"]);
    }

    #[test]
    fn reasons_are_capped() {
        let mut i = input(80.0, 1.0, 2.0, Some(0.1));
        i.levels.support = 100.0;
        i.levels.resistance = 100.0;
        // Fires rules 1, 3, 6 plus both proximity reasons = 5.
        let thresholds = ClassifierThresholds {
            max_reasons: 2,
            ..ClassifierThresholds::default()
        };
        let c = classify(&i, &thresholds);
        assert_eq!(c.action, Action::Sell);
        assert_eq!(
            c.reasons,
            vec![
                "RSI overbought + MACD turning down",
                "Funding rate elevated (crowded long)",
            ]
        );

        let c = run(i);
        assert_eq!(c.reasons.len(), 5);
    }
}
