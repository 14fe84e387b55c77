//! Rate-unit normalization.
//!
//! RULE: the warehouse reports rates as fractions, caps are percent.
//! Every fraction passes through `fraction_to_percent` exactly once,
//! at the point it is read off a flow row.

/// Convert a fraction (0.0125) to percent (1.25).
pub fn fraction_to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Apply a percent rate to a monetary base.
pub fn apply_percent(base: f64, percent: f64) -> f64 {
    base * percent / 100.0
}

/// Value-weighted mean. Zero total weight yields 0.0.
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let (weighted, total) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(w, t), (value, weight)| (w + value * weight, t + weight));
    if total > 0.0 { weighted / total } else { 0.0 }
}
