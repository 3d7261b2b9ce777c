// =============================================================================
// Signals Module
// =============================================================================
//
// - Rule-precedence classifier (action + reasons)
// - Stateless engine tying indicators, levels and classifier together

pub mod classifier;
pub mod engine;

pub use engine::{EngineParams, Signal, SignalEngine};
