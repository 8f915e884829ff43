//! Numeric conversion helpers for the combat formulas.
//!
//! Every float-to-integer conversion in the engine goes through this module so
//! rounding stays consistent: halves round to the nearest even integer, and
//! results saturate at the `i32` range instead of wrapping.

use num_traits::cast::cast;

/// Round a f64 half-to-even and clamp it to the i32 range, returning 0 for NaN.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round_ties_even();
    cast::<f64, i32>(clamped).unwrap_or(0)
}

/// Round a f32 half-to-even and clamp it to the i32 range, returning 0 for NaN.
#[must_use]
pub fn round_f32_to_i32(value: f32) -> i32 {
    round_f64_to_i32(f64::from(value))
}

/// Scale an integer by a float factor and round the product.
#[must_use]
pub fn scale_round(value: i32, factor: f32) -> i32 {
    round_f64_to_i32(f64::from(value) * f64::from(factor))
}

/// Widen an unsigned count into the signed arithmetic the formulas use.
#[must_use]
pub fn count_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
