//! Numeric display helpers

/// Round `value` to `precision` decimal places
///
/// Halves round away from zero, e.g. `round(0.125, 2) == 0.13`.
pub fn round(value: f64, precision: u32) -> f64 {
    let multiplier = 10f64.powi(precision as i32);
    (value * multiplier).round() / multiplier
}
