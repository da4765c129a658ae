//! 1D LUT: N RGB samples over `[0, 1]`, or one sample per half float.
//!
//! A standard LUT of length `L` samples the domain at `i / (L - 1)`. A
//! half-domain LUT has 65536 entries and is indexed by the half-float bit
//! pattern of the input, so it covers the full float range with constant
//! relative precision. Raw-half LUTs store output values as half bit
//! patterns; they are decoded when the LUT is evaluated.
//!
//! The inverse is evaluated either exactly, by searching the (flattened,
//! monotonic) table, or through a baked half-domain forward LUT.

use std::borrow::Cow;

use vfx_math::{HALF_DOMAIN_SIZE, half_to_f32};

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::optimizer::LutInverseStyle;
use crate::{OpsError, OpsResult};

/// Interpolation between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lut1DInterpolation {
    /// Nearest sample.
    Nearest,
    /// Linear interpolation.
    Linear,
    /// Best available (linear).
    Best,
    /// Default (linear).
    #[default]
    Default,
}

impl Lut1DInterpolation {
    /// Resolves `Best` and `Default`.
    pub fn resolved(self) -> Self {
        match self {
            Lut1DInterpolation::Nearest => Lut1DInterpolation::Nearest,
            _ => Lut1DInterpolation::Linear,
        }
    }

    /// Name used in cache-IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lut1DInterpolation::Nearest => "nearest",
            Lut1DInterpolation::Linear => "linear",
            Lut1DInterpolation::Best => "best",
            Lut1DInterpolation::Default => "default",
        }
    }
}

/// Hue preservation around the per-channel lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HueAdjust {
    /// Channels are independent.
    #[default]
    None,
    /// Restores the middle channel's position between min and max.
    Dw3,
}

/// 1D LUT payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1DData {
    /// Interleaved RGB samples, `3 * len` floats.
    pub values: Vec<f32>,
    /// Interpolation.
    pub interpolation: Lut1DInterpolation,
    /// Indexed by half bit pattern instead of `[0, 1]`.
    pub input_half_domain: bool,
    /// Values are half bit patterns.
    pub output_raw_halfs: bool,
    /// Hue adjustment.
    pub hue_adjust: HueAdjust,
    /// Direction.
    pub direction: Direction,
}

impl Lut1DData {
    /// Standard-domain LUT from interleaved RGB samples.
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            interpolation: Lut1DInterpolation::Default,
            input_half_domain: false,
            output_raw_halfs: false,
            hue_adjust: HueAdjust::None,
            direction: Direction::Forward,
        }
    }

    /// Standard-domain LUT sampling `f` at `i / (len - 1)`.
    pub fn from_fn(len: usize, f: impl Fn(f32) -> [f32; 3]) -> Self {
        let denom = len.saturating_sub(1).max(1) as f32;
        let values = (0..len).flat_map(|i| f(i as f32 / denom)).collect();
        Self::new(values)
    }

    /// Half-domain LUT sampling `f` at every half value.
    ///
    /// Non-finite halves get `f(±HALF_MAX)` (infinities) or 0 (NaN).
    pub fn half_domain_from_fn(f: impl Fn(f32) -> [f32; 3]) -> Self {
        let values = (0..HALF_DOMAIN_SIZE)
            .flat_map(|i| {
                let x = half_to_f32(i as u16);
                if x.is_nan() {
                    [0.0; 3]
                } else {
                    f(x.clamp(-vfx_math::HALF_MAX, vfx_math::HALF_MAX))
                }
            })
            .collect();
        Self { input_half_domain: true, ..Self::new(values) }
    }

    /// Identity LUT of `len` samples.
    pub fn identity(len: usize) -> Self {
        Self::from_fn(len, |x| [x, x, x])
    }

    /// Sets the interpolation.
    pub fn with_interpolation(mut self, interpolation: Lut1DInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Sets the hue adjustment.
    pub fn with_hue_adjust(mut self, hue_adjust: HueAdjust) -> Self {
        self.hue_adjust = hue_adjust;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Marks the values as half bit patterns.
    pub fn with_raw_halfs(mut self, raw: bool) -> Self {
        self.output_raw_halfs = raw;
        self
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.values.len() / 3
    }

    /// True when the LUT holds no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Checks the length and the raw-half encoding.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        if self.values.len() % 3 != 0 {
            return Err(OpsError::validation(
                tag,
                format!("{} values is not a whole number of RGB samples", self.values.len()),
            ));
        }
        let len = self.len();
        if len < 2 {
            return Err(OpsError::validation(tag, format!("length {len} is below the minimum of 2")));
        }
        if self.input_half_domain && len != HALF_DOMAIN_SIZE {
            return Err(OpsError::validation(
                tag,
                format!("half-domain LUT has {len} entries, expected {HALF_DOMAIN_SIZE}"),
            ));
        }
        if self.output_raw_halfs {
            if let Some(v) = self.values.iter().find(|v| !(v.fract() == 0.0 && (0.0..=65535.0).contains(*v))) {
                return Err(OpsError::validation(tag, format!("raw half value {v} is not a 16-bit pattern")));
            }
        }
        Ok(())
    }

    /// Values as floats, decoding raw halfs.
    pub fn decoded_values(&self) -> Cow<'_, [f32]> {
        if self.output_raw_halfs {
            Cow::Owned(self.values.iter().map(|&v| half_to_f32(v as u16)).collect())
        } else {
            Cow::Borrowed(&self.values)
        }
    }

    /// Input value of sample `i`.
    pub fn domain_value(&self, i: usize) -> f32 {
        if self.input_half_domain {
            half_to_f32(i as u16)
        } else {
            i as f32 / (self.len() - 1).max(1) as f32
        }
    }

    /// True when every sample equals its domain value.
    pub fn is_identity(&self) -> bool {
        if self.hue_adjust != HueAdjust::None || self.len() < 2 {
            return false;
        }
        let values = self.decoded_values();
        values.chunks_exact(3).enumerate().all(|(i, rgb)| {
            let x = self.domain_value(i);
            if !x.is_finite() {
                return true;
            }
            let tol = 1e-5_f32.max(x.abs() * 1e-4);
            rgb.iter().all(|v| (v - x).abs() <= tol)
        })
    }

    /// True when R, G and B columns are identical (single-channel texture).
    pub fn channels_identical(&self) -> bool {
        self.values.chunks_exact(3).all(|rgb| rgb[0] == rgb[1] && rgb[1] == rgb[2])
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    /// Exact inverse evaluator.
    pub fn inverse_evaluator(&self) -> InverseLut1D {
        InverseLut1D::new(self)
    }

    /// Half-domain forward LUT approximating the inverse of `self`.
    pub fn bake_fast_inverse(&self) -> Lut1DData {
        let inv = self.inverse_evaluator();
        Lut1DData::half_domain_from_fn(|y| [inv.eval(0, y), inv.eval(1, y), inv.eval(2, y)])
            .with_interpolation(Lut1DInterpolation::Linear)
            .with_hue_adjust(self.hue_adjust)
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder, inverse_style: LutInverseStyle) -> CacheIdBuilder {
        b = b.int(self.len()).word(self.interpolation.as_str());
        if self.input_half_domain {
            b = b.word("halfDomain");
        }
        if self.output_raw_halfs {
            b = b.word("rawHalfs");
        }
        if self.hue_adjust == HueAdjust::Dw3 {
            b = b.word("dw3");
        }
        if self.direction == Direction::Inverse {
            b = b.word(inverse_style.as_str());
        }
        b.digest(&self.values)
    }
}

// ============================================================================
// Inverse evaluation
// ============================================================================

/// One channel of an inverted LUT: sample inputs and monotone outputs.
#[derive(Debug, Clone)]
struct InverseChannel {
    xs: Vec<f32>,
    /// Outputs times `sign`, flattened to be non-decreasing.
    ys: Vec<f32>,
    sign: f32,
}

impl InverseChannel {
    fn new(mut samples: Vec<(f32, f32)>) -> Self {
        samples.retain(|(_, y)| y.is_finite());
        let increasing = match (samples.first(), samples.last()) {
            (Some(a), Some(b)) => b.1 >= a.1,
            _ => true,
        };
        let sign = if increasing { 1.0 } else { -1.0 };
        let mut running = f32::NEG_INFINITY;
        let (xs, ys) = samples
            .into_iter()
            .map(|(x, y)| {
                running = running.max(y * sign);
                (x, running)
            })
            .unzip();
        Self { xs, ys, sign }
    }

    fn eval(&self, y: f32) -> f32 {
        let n = self.ys.len();
        if n == 0 || y.is_nan() {
            return y;
        }
        let y = y * self.sign;
        if y <= self.ys[0] {
            return self.xs[0];
        }
        if y >= self.ys[n - 1] {
            return self.xs[n - 1];
        }
        let j = self.ys.partition_point(|&v| v <= y);
        let i = j - 1;
        let t = (y - self.ys[i]) / (self.ys[j] - self.ys[i]);
        self.xs[i] + t * (self.xs[j] - self.xs[i])
    }
}

/// Exact inverse of a 1D LUT, per channel.
#[derive(Debug, Clone)]
pub struct InverseLut1D {
    channels: [InverseChannel; 3],
}

impl InverseLut1D {
    fn new(lut: &Lut1DData) -> Self {
        let values = lut.decoded_values();
        let order: Vec<usize> = if lut.input_half_domain {
            // Increasing input value: negative halves from -HALF_MAX up to
            // -0, then +0 up to HALF_MAX. Infinities and NaNs are skipped.
            (0x8000..=0xFBFF).rev().chain(0x0000..=0x7BFF).collect()
        } else {
            (0..lut.len()).collect()
        };
        let channels = std::array::from_fn(|c| {
            InverseChannel::new(order.iter().map(|&i| (lut.domain_value(i), values[i * 3 + c])).collect())
        });
        Self { channels }
    }

    /// Input value that channel `c` maps to `y`.
    pub fn eval(&self, c: usize, y: f32) -> f32 {
        self.channels[c].eval(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_validation() {
        assert!(Lut1DData::new(vec![0.0; 3]).validate("Lut1DOp").is_err());
        assert!(Lut1DData::new(vec![0.0; 7]).validate("Lut1DOp").is_err());
        assert!(Lut1DData::identity(2).validate("Lut1DOp").is_ok());
        let half = Lut1DData { input_half_domain: true, ..Lut1DData::identity(1024) };
        assert!(half.validate("Lut1DOp").is_err());
        let raw = Lut1DData::new(vec![0.5; 6]).with_raw_halfs(true);
        assert!(raw.validate("Lut1DOp").is_err());
    }

    #[test]
    fn test_identity_detection() {
        assert!(Lut1DData::identity(17).is_identity());
        assert!(Lut1DData::half_domain_from_fn(|x| [x, x, x]).is_identity());
        assert!(!Lut1DData::from_fn(17, |x| [x * x, x, x]).is_identity());
        let raw = Lut1DData::new(vec![0.0, 0.0, 0.0, 15360.0, 15360.0, 15360.0]).with_raw_halfs(true);
        assert!(raw.is_identity());
    }

    #[test]
    fn test_exact_inverse_recovers_domain() {
        let lut = Lut1DData::from_fn(33, |x| [x * x, x.sqrt(), 0.5 * x]);
        let inv = lut.inverse_evaluator();
        for i in 0..33 {
            let x = lut.domain_value(i);
            assert_abs_diff_eq!(inv.eval(0, x * x), x, epsilon = 1e-5);
            assert_abs_diff_eq!(inv.eval(2, 0.5 * x), x, epsilon = 1e-5);
        }
        // Out of range values clamp to the domain ends.
        assert_eq!(inv.eval(2, 2.0), 1.0);
        assert_eq!(inv.eval(2, -1.0), 0.0);
    }

    #[test]
    fn test_decreasing_lut_inverse() {
        let lut = Lut1DData::from_fn(11, |x| [1.0 - x, 1.0 - x, 1.0 - x]);
        let inv = lut.inverse_evaluator();
        assert_abs_diff_eq!(inv.eval(0, 0.25), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_half_domain_inverse_covers_negatives() {
        let lut = Lut1DData::half_domain_from_fn(|x| [2.0 * x, 2.0 * x, 2.0 * x]);
        let inv = lut.inverse_evaluator();
        assert_abs_diff_eq!(inv.eval(0, -3.0), -1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(inv.eval(1, 0.5), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_channels_identical() {
        assert!(Lut1DData::identity(4).channels_identical());
        assert!(!Lut1DData::from_fn(4, |x| [x, x * 0.5, x]).channels_identical());
    }
}
