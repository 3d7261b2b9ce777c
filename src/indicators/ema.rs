// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   k     = 2 / (period + 1)
//   EMA_t = value_t * k + EMA_{t-1} * (1 - k)
//
// The very first EMA value is seeded with the SMA of the first `period` values,
// so the first defined output sits at index `period - 1`.
// =============================================================================

/// Compute the compact EMA series for `values` with look-back `period`.
///
/// Element `i` of the result corresponds to `values[i + period - 1]`.
/// Returns an empty `Vec` when `period == 0` or the input is shorter than
/// `period`.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(seed);
    result.extend(values[period..].iter().scan(seed, |prev, &value| {
        *prev = value * k + *prev * (1.0 - k);
        Some(*prev)
    }));
    result
}
