/// Level reported for digital silence.
pub const SILENCE_DB: f64 = f64::NEG_INFINITY;

/// Convert decibels to a linear amplitude factor.
pub fn db_to_gain(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert a linear amplitude factor to decibels (`-inf` for zero).
pub fn gain_to_db(gain: f64) -> f64 {
    if gain <= 0.0 {
        return SILENCE_DB;
    }
    20.0 * gain.log10()
}

/// Linear interpolation between `a` and `b` with factor `t`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
