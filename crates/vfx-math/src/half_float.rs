//! Half-float encoding for half-domain LUTs.
//!
//! A half-domain 1D LUT has one entry per 16-bit half pattern (65536
//! entries). Looking up a float means converting it to a half and using the
//! raw bits as the table index, then interpolating towards the neighbouring
//! half.
//!
//! Two encoders live here:
//!
//! - [`half_bits`] / [`half_edges`] use the [`half`] crate and drive the CPU path
//! - [`raw_half_index`] recomputes the bit pattern with float arithmetic only,
//!   the same formula the GPU shader uses (shading languages do not portably
//!   expose bit casts)

use half::f16;

use crate::{HALF_DENRM_MAX, HALF_MAX, HALF_NRM_MIN};

/// Number of entries in a half-domain LUT.
pub const HALF_DOMAIN_SIZE: usize = 65536;

/// Bit pattern of the half nearest to `f`.
#[inline]
pub fn half_bits(f: f32) -> u16 {
    f16::from_f32(f).to_bits()
}

/// Float value of a half bit pattern.
#[inline]
pub fn half_to_f32(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Lower/upper half indices bracketing a float, plus the blend fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfEdges {
    /// Index of the half at (or just below, in magnitude) the input.
    pub lower: u16,
    /// Index of the next half away from zero.
    pub upper: u16,
    /// Position of the input between the two, in [0, 1).
    pub fraction: f32,
}

/// Finds the two half values that bracket `f`.
///
/// Infinite halves are replaced by `±HALF_MAX` so the table never indexes
/// the infinity entries through interpolation. A NaN fraction (equal edges)
/// becomes 0.
pub fn half_edges(f: f32) -> HalfEdges {
    let mut value = f;
    let mut h = f16::from_f32(value);
    if h.is_infinite() {
        h = if h.is_sign_negative() { -f16::MAX } else { f16::MAX };
        value = h.to_f32();
    }

    let (lower, upper) = if h.to_f32().abs() > value.abs() {
        let upper = h.to_bits();
        (upper.wrapping_sub(1), upper)
    } else {
        let lower = h.to_bits();
        let mut upper = f16::from_bits(lower.wrapping_add(1));
        if upper.is_infinite() {
            upper = if upper.is_sign_negative() { -f16::MAX } else { f16::MAX };
        }
        (lower, upper.to_bits())
    };

    let fa = half_to_f32(lower);
    let fb = half_to_f32(upper);
    let mut fraction = (value - fa) / (fb - fa);
    if fraction.is_nan() {
        fraction = 0.0;
    }
    HalfEdges { lower, upper, fraction }
}

/// Half bit pattern computed with float arithmetic only.
///
/// Normals recombine `floor(log2|f|)`, the scaled mantissa and the exponent
/// bias as `(e + m + 15) * 1024`; denormals scale linearly. Non-positive
/// inputs get the sign bit (so `+0` maps to `0x8000`, like `-0`).
pub fn raw_half_index(f: f32) -> f32 {
    const NEG_MIN_EXP: f32 = 15.0;
    const EXP_SCALE: f32 = 1024.0;

    let abs_f = f.abs();
    let mut dep = if abs_f > HALF_NRM_MIN {
        let absarr = abs_f.min(HALF_MAX);
        let exponent = absarr.log2().floor();
        let lower = 2f32.powf(exponent);
        let mantissa = (absarr - lower) / lower;
        (exponent + mantissa + NEG_MIN_EXP) * EXP_SCALE
    } else {
        abs_f * 1023.0 / HALF_DENRM_MAX
    };
    if f <= 0.0 {
        dep += 32768.0;
    }
    dep
}
