/// Smallest max-displacement magnitude still treated as a usable denominator.
pub const MIN_DENOMINATOR: f64 = 1e-9;

/// Round to two decimals, halves to even.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round_ties_even() / 100.0
}

/// Integer hundredths; two values join when their keys are equal.
pub fn conc_key(x: f64) -> i64 {
    (x * 100.0).round_ties_even() as i64
}

/// `round(part / whole * 100, 2)`, or `None` when `whole` cannot divide.
pub fn percent_of(part: f64, whole: f64) -> Option<f64> {
    if !whole.is_finite() || whole.abs() < MIN_DENOMINATOR || !part.is_finite() {
        return None;
    }
    Some(round2(part / whole * 100.0))
}
