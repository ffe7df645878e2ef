use fixed::types::I32F32;

/// Q32.32 fixed-point seconds. Stay accumulation uses this so that the
/// same tick sequence always produces the same total, regardless of float
/// rounding order.
pub type Seconds = I32F32;

/// Convert a producer-side `f32` delta to [`Seconds`]. Non-finite or
/// negative deltas become zero.
#[inline]
pub fn seconds_from_f32(v: f32) -> Seconds {
    if v.is_finite() && v > 0.0 {
        Seconds::saturating_from_num(v)
    } else {
        Seconds::ZERO
    }
}

/// Convert an `f64` (save files) to [`Seconds`]. Non-finite or negative
/// values become zero.
#[inline]
pub fn seconds_from_f64(v: f64) -> Seconds {
    if v.is_finite() && v > 0.0 {
        Seconds::saturating_from_num(v)
    } else {
        Seconds::ZERO
    }
}

/// Convert [`Seconds`] to `f64`. Use only for display and save files.
#[inline]
pub fn seconds_to_f64(v: Seconds) -> f64 {
    v.to_num::<f64>()
}
