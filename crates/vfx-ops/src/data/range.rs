//! Range: per-channel linear remap with clamping.
//!
//! Each RGBA channel maps `[min_in, max_in]` onto `[min_out, max_out]` and
//! clamps to the output bounds. Any bound may be unset:
//!
//! - both ends set - scale and offset, clamp both sides
//! - min end only - offset `min_out - min_in`, clamp below
//! - max end only - offset `max_out - max_in`, clamp above
//! - nothing set - the channel passes through
//!
//! ```rust
//! use vfx_ops::data::RangeData;
//!
//! let range = RangeData::rgb(0.0, 2.0, 0.25, 1.25);
//! assert_eq!(range.channels[0].scale(), 0.5);
//! assert_eq!(range.channels[0].offset(), 0.25);
//! assert!(range.channels[3].is_empty());
//! ```

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Bounds of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeChannel {
    /// Lower input bound.
    pub min_in: Option<f64>,
    /// Upper input bound.
    pub max_in: Option<f64>,
    /// Lower output bound (clamp floor).
    pub min_out: Option<f64>,
    /// Upper output bound (clamp ceiling).
    pub max_out: Option<f64>,
}

/// `clamp(scale * x + offset, lo, hi)` with infinite bounds when unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeAffine {
    /// Multiplier.
    pub scale: f64,
    /// Offset.
    pub offset: f64,
    /// Lower clamp.
    pub lo: f64,
    /// Upper clamp.
    pub hi: f64,
}

impl RangeChannel {
    /// A pass-through channel.
    pub const EMPTY: Self = Self { min_in: None, max_in: None, min_out: None, max_out: None };

    /// Fully bounded channel.
    pub fn new(min_in: f64, max_in: f64, min_out: f64, max_out: f64) -> Self {
        Self { min_in: Some(min_in), max_in: Some(max_in), min_out: Some(min_out), max_out: Some(max_out) }
    }

    /// Plain clamp; infinite bounds are left unset.
    pub fn clamp(min: f64, max: f64) -> Self {
        let min = min.is_finite().then_some(min);
        let max = max.is_finite().then_some(max);
        Self { min_in: min, max_in: max, min_out: min, max_out: max }
    }

    /// True when no bound is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Multiplier; 1 unless both ends are bounded.
    pub fn scale(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(max_in), Some(min_out), Some(max_out)) => {
                (max_out - min_out) / (max_in - min_in)
            }
            _ => 1.0,
        }
    }

    /// Offset applied after the scale.
    pub fn offset(&self) -> f64 {
        match (self.min_in, self.max_in, self.min_out, self.max_out) {
            (Some(min_in), Some(_), Some(min_out), Some(_)) => min_out - self.scale() * min_in,
            (Some(min_in), _, Some(min_out), _) => min_out - min_in,
            (_, Some(max_in), _, Some(max_out)) => max_out - max_in,
            _ => 0.0,
        }
    }

    /// The channel as an affine map with clamp bounds.
    pub fn affine(&self) -> RangeAffine {
        RangeAffine {
            scale: self.scale(),
            offset: self.offset(),
            lo: self.min_out.unwrap_or(f64::NEG_INFINITY),
            hi: self.max_out.unwrap_or(f64::INFINITY),
        }
    }

    /// Channel with input and output bounds swapped.
    pub fn inverse(&self) -> Self {
        Self { min_in: self.min_out, max_in: self.max_out, min_out: self.min_in, max_out: self.max_in }
    }

    fn validate(&self, tag: &str, ch: usize) -> OpsResult<()> {
        if self.min_in.is_some() != self.min_out.is_some() {
            return Err(OpsError::validation(
                tag,
                format!("channel {ch}: min_in and min_out must be set together"),
            ));
        }
        if self.max_in.is_some() != self.max_out.is_some() {
            return Err(OpsError::validation(
                tag,
                format!("channel {ch}: max_in and max_out must be set together"),
            ));
        }
        let bounds = [self.min_in, self.max_in, self.min_out, self.max_out];
        if let Some(v) = bounds.iter().flatten().find(|v| !v.is_finite()) {
            return Err(OpsError::validation(tag, format!("channel {ch}: bound {v} is not finite")));
        }
        if let (Some(lo), Some(hi)) = (self.min_in, self.max_in) {
            if lo >= hi {
                return Err(OpsError::validation(
                    tag,
                    format!("channel {ch}: min_in {lo} must be below max_in {hi}"),
                ));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_out, self.max_out) {
            if lo >= hi {
                return Err(OpsError::validation(
                    tag,
                    format!("channel {ch}: min_out {lo} must be below max_out {hi}"),
                ));
            }
        }
        Ok(())
    }

    /// Channel equivalent to `self` followed by `next`, if representable.
    fn then(&self, next: &RangeChannel) -> Option<RangeChannel> {
        if self.is_empty() {
            return Some(*next);
        }
        if next.is_empty() {
            return Some(*self);
        }
        let (a, b) = (self.affine(), next.affine());
        RangeChannel::from_affine(RangeAffine {
            scale: b.scale * a.scale,
            offset: b.scale * a.offset + b.offset,
            lo: b.lo.max(b.scale * a.lo + b.offset),
            hi: b.hi.min(b.scale * a.hi + b.offset),
        })
    }

    fn from_affine(a: RangeAffine) -> Option<RangeChannel> {
        match (a.lo.is_finite(), a.hi.is_finite()) {
            (true, true) if a.lo < a.hi => Some(RangeChannel::new(
                (a.lo - a.offset) / a.scale,
                (a.hi - a.offset) / a.scale,
                a.lo,
                a.hi,
            )),
            (true, false) if a.scale == 1.0 => Some(RangeChannel {
                min_in: Some(a.lo - a.offset),
                min_out: Some(a.lo),
                ..RangeChannel::EMPTY
            }),
            (false, true) if a.scale == 1.0 => Some(RangeChannel {
                max_in: Some(a.hi - a.offset),
                max_out: Some(a.hi),
                ..RangeChannel::EMPTY
            }),
            (false, false) if a.scale == 1.0 && a.offset == 0.0 => Some(RangeChannel::EMPTY),
            _ => None,
        }
    }
}

/// Range payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeData {
    /// RGBA channels.
    pub channels: [RangeChannel; 4],
    /// Skip the clamp, keeping only the affine part.
    pub no_clamp: bool,
    /// Inverse swaps input and output bounds.
    pub direction: Direction,
}

impl RangeData {
    /// Same remap on RGB, alpha untouched.
    pub fn rgb(min_in: f64, max_in: f64, min_out: f64, max_out: f64) -> Self {
        let c = RangeChannel::new(min_in, max_in, min_out, max_out);
        Self::from_channels([c, c, c, RangeChannel::EMPTY])
    }

    /// Per-channel clamp; infinite bounds are left unset.
    pub fn clamp(min: [f64; 4], max: [f64; 4]) -> Self {
        Self::from_channels(std::array::from_fn(|i| RangeChannel::clamp(min[i], max[i])))
    }

    /// Forward range from channels.
    pub fn from_channels(channels: [RangeChannel; 4]) -> Self {
        Self { channels, no_clamp: false, direction: Direction::Forward }
    }

    /// Disables clamping.
    pub fn with_no_clamp(mut self, no_clamp: bool) -> Self {
        self.no_clamp = no_clamp;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Channels as evaluated (swapped in the inverse direction).
    pub fn effective_channels(&self) -> [RangeChannel; 4] {
        match self.direction {
            Direction::Forward => self.channels,
            Direction::Inverse => self.channels.map(|c| c.inverse()),
        }
    }

    /// Checks bound pairing and ordering on every channel.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        for (ch, c) in self.channels.iter().enumerate() {
            c.validate(tag, ch)?;
        }
        Ok(())
    }

    /// Bit mask of empty channels, bit `i` for channel `i`.
    pub fn empty_mask(&self) -> u8 {
        self.channels
            .iter()
            .enumerate()
            .fold(0, |m, (i, c)| if c.is_empty() { m | (1 << i) } else { m })
    }

    /// True when every channel passes through unchanged.
    pub fn is_identity(&self) -> bool {
        if self.no_clamp {
            self.channels.iter().all(|c| c.scale() == 1.0 && c.offset() == 0.0)
        } else {
            self.channels.iter().all(RangeChannel::is_empty)
        }
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    /// Range equivalent to `self` followed by `next`, when one exists.
    ///
    /// Empty channels fall through to the other range. Unclamped ranges are
    /// never combined.
    pub fn combine(&self, next: &RangeData) -> Option<RangeData> {
        if self.no_clamp || next.no_clamp {
            return None;
        }
        let (a, b) = (self.effective_channels(), next.effective_channels());
        let mut channels = [RangeChannel::EMPTY; 4];
        for i in 0..4 {
            channels[i] = a[i].then(&b[i])?;
        }
        Some(RangeData::from_channels(channels))
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder) -> CacheIdBuilder {
        for c in &self.channels {
            b = b.opt_double(c.min_in).opt_double(c.max_in).opt_double(c.min_out).opt_double(c.max_out);
        }
        if self.no_clamp {
            b = b.word("noClamp");
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn eval(c: &RangeChannel, x: f64) -> f64 {
        let a = c.affine();
        (a.scale * x + a.offset).clamp(a.lo, a.hi)
    }

    #[test]
    fn test_scale_and_offset() {
        let c = RangeChannel::new(-10.0, 6.0, 0.0, 1.0);
        assert_abs_diff_eq!(c.scale(), 1.0 / 16.0);
        assert_abs_diff_eq!(c.offset(), 10.0 / 16.0);

        let min_only = RangeChannel { min_in: Some(0.5), min_out: Some(0.25), ..RangeChannel::EMPTY };
        assert_eq!(min_only.scale(), 1.0);
        assert_eq!(min_only.offset(), -0.25);
    }

    #[test]
    fn test_validation() {
        let half = RangeChannel { min_in: Some(0.0), ..RangeChannel::EMPTY };
        assert!(RangeData::from_channels([half; 4]).validate("RangeOp").is_err());
        assert!(RangeData::rgb(1.0, 0.0, 0.0, 1.0).validate("RangeOp").is_err());
        assert!(RangeData::rgb(0.0, 1.0, 0.0, 1.0).validate("RangeOp").is_ok());
    }

    #[test]
    fn test_identity() {
        assert!(RangeData::default().is_identity());
        assert!(RangeData::clamp([f64::NEG_INFINITY; 4], [f64::INFINITY; 4]).is_identity());
        assert!(!RangeData::rgb(0.0, 1.0, 0.0, 1.0).is_identity());
        assert!(RangeData::rgb(0.0, 1.0, 0.0, 1.0).with_no_clamp(true).is_identity());
    }

    #[test]
    fn test_combine_matches_sequence() {
        let a = RangeData::rgb(0.0, 1.0, 0.5, 1.5);
        let b = RangeData::rgb(0.2, 1.8, 0.0, 1.0);
        let c = a.combine(&b).unwrap();
        for x in [-0.5, 0.0, 0.1, 0.5, 0.9, 1.2] {
            let seq = eval(&b.channels[0], eval(&a.channels[0], x));
            assert_abs_diff_eq!(eval(&c.channels[0], x), seq, epsilon = 1e-12);
        }
        assert!(c.channels[3].is_empty());
    }

    #[test]
    fn test_combine_falls_through_empty_channels() {
        let a = RangeData::clamp([0.0, f64::NEG_INFINITY, 0.0, 0.0], [1.0, f64::INFINITY, 1.0, 1.0]);
        let b = RangeData::clamp([f64::NEG_INFINITY, 0.1, 0.2, 0.0], [f64::INFINITY, 0.9, 0.8, 1.0]);
        let c = a.combine(&b).unwrap();
        assert_eq!(c.channels[0], a.channels[0]);
        assert_eq!(c.channels[1], b.channels[1]);
        assert_eq!(c.channels[2].min_out, Some(0.2));
        assert_eq!(c.channels[2].max_out, Some(0.8));
    }

    #[test]
    fn test_combine_refuses_collapsed_range() {
        let a = RangeData::clamp([0.0; 4], [0.1; 4]);
        let b = RangeData::clamp([0.5; 4], [1.0; 4]);
        assert!(a.combine(&b).is_none());
    }

    #[test]
    fn test_inverse_swaps_bounds() {
        let r = RangeData::rgb(-10.0, 6.0, 0.0, 1.0).inverse();
        let c = r.effective_channels()[0];
        assert_eq!(c.min_in, Some(0.0));
        assert_eq!(c.max_out, Some(6.0));
        assert_eq!(r.empty_mask(), 0b1000);
    }
}
