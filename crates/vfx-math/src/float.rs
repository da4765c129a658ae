//! Float hygiene helpers.
//!
//! Guards used wherever a formula would otherwise divide by zero, take the
//! log of a non-positive value or hand a non-finite value to a GPU texture.

/// Smallest positive normal `f32`; `log` inputs are clamped to it.
pub const FLT_MIN: f32 = f32::MIN_POSITIVE;

/// Largest finite `f32`.
pub const FLT_MAX: f32 = f32::MAX;

/// Largest finite half value (65504).
pub const HALF_MAX: f32 = 65504.0;

/// Smallest positive normal half value (2^-14).
pub const HALF_NRM_MIN: f32 = 6.103_515_6e-5;

/// Largest half denormal (2^-14 - 2^-24).
pub const HALF_DENRM_MAX: f32 = 6.097_555_2e-5;

/// `max(0, x)^e`.
///
/// Negative inputs clamp to zero before the power so the result is never
/// NaN; `0^0` is 1.
///
/// ```rust
/// use vfx_math::pow_clamped;
///
/// assert_eq!(pow_clamped(-2.0, 2.0), 0.0);
/// assert_eq!(pow_clamped(0.0, 0.0), 1.0);
/// assert_eq!(pow_clamped(2.0, 2.0), 4.0);
/// ```
#[inline]
pub fn pow_clamped(x: f32, e: f32) -> f32 {
    x.max(0.0).powf(e)
}

/// Replaces NaN with 0 and infinities with `±FLT_MAX`.
///
/// Applied to every value uploaded as texture data.
#[inline]
pub fn sanitize_float(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else if v == f32::INFINITY {
        FLT_MAX
    } else if v == f32::NEG_INFINITY {
        -FLT_MAX
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_float(f32::NAN), 0.0);
        assert_eq!(sanitize_float(f32::INFINITY), f32::MAX);
        assert_eq!(sanitize_float(f32::NEG_INFINITY), -f32::MAX);
        assert_eq!(sanitize_float(0.25), 0.25);
    }

    #[test]
    fn test_half_constants() {
        assert_eq!(HALF_NRM_MIN, 2f32.powi(-14));
        assert_eq!(HALF_DENRM_MAX, 2f32.powi(-14) - 2f32.powi(-24));
    }

    #[test]
    fn test_pow_clamped() {
        assert_eq!(pow_clamped(2.0, 0.0), 1.0);
        assert_eq!(pow_clamped(2.0, -2.0), 0.25);
        assert_eq!(pow_clamped(-1.0, 1.5), 0.0);
    }
}
