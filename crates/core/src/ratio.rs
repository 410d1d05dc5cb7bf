//! Guarded arithmetic. Every ratio in the toolkit goes through here so an
//! empty denominator becomes `None` rather than infinity or NaN.

/// `numerator / denominator`, or `None` when the denominator is zero or the
/// result is not finite.
pub fn safe_div(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// `numerator / denominator * 100`, guarded like [`safe_div`].
pub fn safe_pct(numerator: f64, denominator: f64) -> Option<f64> {
    safe_div(numerator, denominator).map(|v| v * 100.0)
}

/// Percentage that collapses an undefined ratio to `0.0`.
pub fn pct_or_zero(numerator: f64, denominator: f64) -> f64 {
    safe_pct(numerator, denominator).unwrap_or(0.0)
}
