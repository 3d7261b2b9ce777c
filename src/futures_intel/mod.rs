// =============================================================================
// Futures Intelligence Module
// =============================================================================
//
// Data pulled from the Binance futures API that feeds the signal classifier.
// Currently only the perpetual funding rate.

pub mod funding_rate;

pub use funding_rate::{FundingRateMonitor, FundingSnapshot};
