//! ASC CDL: slope, offset, power and saturation.
//!
//! The v1.2 styles clamp to `[0, 1]` around the power and after the
//! saturation; the no-clamp styles pass negative values through the power
//! step. The direction is part of the style.

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Rec.709 luma weights used by the saturation step.
pub const CDL_LUMA_WEIGHTS: [f64; 3] = [0.2126, 0.7152, 0.0722];

/// CDL evaluation style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CdlStyle {
    /// ASC v1.2 forward, clamping.
    #[default]
    V12Fwd,
    /// ASC v1.2 reverse, clamping.
    V12Rev,
    /// Forward without clamping.
    NoClampFwd,
    /// Reverse without clamping.
    NoClampRev,
}

impl CdlStyle {
    /// True for the v1.2 styles.
    pub fn is_clamping(&self) -> bool {
        matches!(self, CdlStyle::V12Fwd | CdlStyle::V12Rev)
    }

    /// Direction encoded by the style.
    pub fn direction(&self) -> Direction {
        match self {
            CdlStyle::V12Fwd | CdlStyle::NoClampFwd => Direction::Forward,
            CdlStyle::V12Rev | CdlStyle::NoClampRev => Direction::Inverse,
        }
    }

    /// Same clamping, opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            CdlStyle::V12Fwd => CdlStyle::V12Rev,
            CdlStyle::V12Rev => CdlStyle::V12Fwd,
            CdlStyle::NoClampFwd => CdlStyle::NoClampRev,
            CdlStyle::NoClampRev => CdlStyle::NoClampFwd,
        }
    }

    /// Name used in cache-IDs and shader comments.
    pub fn as_str(&self) -> &'static str {
        match self {
            CdlStyle::V12Fwd => "v1.2_fwd",
            CdlStyle::V12Rev => "v1.2_rev",
            CdlStyle::NoClampFwd => "noclamp_fwd",
            CdlStyle::NoClampRev => "noclamp_rev",
        }
    }
}

/// Direction-resolved CDL parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdlRenderParams {
    /// Slope, reciprocal when reversed.
    pub slope: [f64; 3],
    /// Offset, negated when reversed.
    pub offset: [f64; 3],
    /// Power, reciprocal when reversed.
    pub power: [f64; 3],
    /// Saturation, reciprocal when reversed.
    pub saturation: f64,
    /// Apply saturation, power, offset, then slope.
    pub reverse: bool,
    /// v1.2 clamping.
    pub clamp: bool,
}

/// CDL payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CdlData {
    /// Per-channel slope.
    pub slope: [f64; 3],
    /// Per-channel offset.
    pub offset: [f64; 3],
    /// Per-channel power.
    pub power: [f64; 3],
    /// Saturation.
    pub saturation: f64,
    /// Style and direction.
    pub style: CdlStyle,
}

impl Default for CdlData {
    fn default() -> Self {
        Self {
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
            style: CdlStyle::V12Fwd,
        }
    }
}

impl CdlData {
    /// CDL with the given parameters.
    pub fn new(slope: [f64; 3], offset: [f64; 3], power: [f64; 3], saturation: f64, style: CdlStyle) -> Self {
        Self { slope, offset, power, saturation, style }
    }

    /// Sets the style.
    pub fn with_style(mut self, style: CdlStyle) -> Self {
        self.style = style;
        self
    }

    /// Direction encoded by the style.
    pub fn direction(&self) -> Direction {
        self.style.direction()
    }

    /// Checks parameter signs; the reverse styles divide by slope and
    /// saturation.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        for c in 0..3 {
            let (s, o, p) = (self.slope[c], self.offset[c], self.power[c]);
            if !(s.is_finite() && o.is_finite() && p.is_finite()) {
                return Err(OpsError::validation(tag, format!("channel {c}: parameters must be finite")));
            }
            if s < 0.0 {
                return Err(OpsError::validation(tag, format!("slope {s} must be >= 0")));
            }
            if p <= 0.0 {
                return Err(OpsError::validation(tag, format!("power {p} must be > 0")));
            }
            if self.direction() == Direction::Inverse && s == 0.0 {
                return Err(OpsError::validation(tag, "slope 0.0 cannot be reversed"));
            }
        }
        let sat = self.saturation;
        if !sat.is_finite() || sat < 0.0 {
            return Err(OpsError::validation(tag, format!("saturation {sat} must be >= 0")));
        }
        if self.direction() == Direction::Inverse && sat == 0.0 {
            return Err(OpsError::validation(tag, "saturation 0.0 cannot be reversed"));
        }
        Ok(())
    }

    fn has_identity_slope_offset(&self) -> bool {
        self.slope == [1.0; 3] && self.offset == [0.0; 3]
    }

    fn has_identity_power(&self) -> bool {
        self.power == [1.0; 3]
    }

    /// Identity parameters in a no-clamp style. The v1.2 styles clamp and
    /// are never identities.
    pub fn is_identity(&self) -> bool {
        !self.style.is_clamping()
            && self.has_identity_slope_offset()
            && self.has_identity_power()
            && self.saturation == 1.0
    }

    /// Same parameters, reversed style.
    pub fn inverse(&self) -> Self {
        Self { style: self.style.inverse(), ..self.clone() }
    }

    /// Single CDL equivalent to `self` then `next`, when one exists.
    ///
    /// Both must share the style. Power-only pairs multiply the powers;
    /// without clamping, slope/offset-only pairs compose affinely and
    /// saturation-only pairs multiply the saturations.
    pub fn combine(&self, next: &CdlData) -> Option<CdlData> {
        if self.style != next.style {
            return None;
        }
        let power_only = |d: &CdlData| d.has_identity_slope_offset() && d.saturation == 1.0;
        if power_only(self) && power_only(next) {
            let p = std::array::from_fn(|c| self.power[c] * next.power[c]);
            return Some(CdlData { power: p, ..self.clone() });
        }
        if self.style.is_clamping() {
            return None;
        }
        let affine_only = |d: &CdlData| d.has_identity_power() && d.saturation == 1.0;
        if affine_only(self) && affine_only(next) {
            let (s1, o1, s2, o2) = (self.slope, self.offset, next.slope, next.offset);
            let slope = std::array::from_fn(|c| s1[c] * s2[c]);
            let offset = match self.direction() {
                Direction::Forward => std::array::from_fn(|c| s2[c] * o1[c] + o2[c]),
                Direction::Inverse => std::array::from_fn(|c| o1[c] + s1[c] * o2[c]),
            };
            return Some(CdlData { slope, offset, ..self.clone() });
        }
        let sat_only = |d: &CdlData| d.has_identity_slope_offset() && d.has_identity_power();
        if sat_only(self) && sat_only(next) {
            return Some(CdlData { saturation: self.saturation * next.saturation, ..self.clone() });
        }
        None
    }

    /// Parameters as applied by the evaluators; the reverse styles get the
    /// reciprocal slope, power and saturation and the negated offset.
    pub fn render_params(&self) -> CdlRenderParams {
        let reverse = self.direction() == Direction::Inverse;
        let recip = |v: f64| if reverse { 1.0 / v } else { v };
        CdlRenderParams {
            slope: self.slope.map(recip),
            offset: if reverse { self.offset.map(|o| -o) } else { self.offset },
            power: self.power.map(recip),
            saturation: recip(self.saturation),
            reverse,
            clamp: self.style.is_clamping(),
        }
    }

    pub(crate) fn write_cache_id(&self, b: CacheIdBuilder) -> CacheIdBuilder {
        b.word(self.style.as_str())
            .doubles(&self.slope)
            .doubles(&self.offset)
            .doubles(&self.power)
            .double(self.saturation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let cdl = CdlData::new([1.0, 0.0, 1.0], [0.0; 3], [1.0; 3], 1.0, CdlStyle::NoClampFwd);
        assert!(cdl.validate("CDLOp").is_ok());
        assert!(cdl.inverse().validate("CDLOp").is_err());

        let bad_power = CdlData { power: [1.0, 0.0, 1.0], ..CdlData::default() };
        assert!(bad_power.validate("CDLOp").is_err());
        let bad_sat = CdlData { saturation: -0.5, ..CdlData::default() };
        assert!(bad_sat.validate("CDLOp").is_err());
    }

    #[test]
    fn test_identity_only_without_clamp() {
        assert!(!CdlData::default().is_identity());
        assert!(CdlData::default().with_style(CdlStyle::NoClampRev).is_identity());
    }

    #[test]
    fn test_combine_requires_same_style() {
        let a = CdlData { power: [2.0; 3], ..CdlData::default() };
        let b = CdlData { power: [0.5, 2.0, 1.0], ..CdlData::default() };
        assert_eq!(a.combine(&b).unwrap().power, [1.0, 4.0, 2.0]);
        assert!(a.combine(&b.clone().with_style(CdlStyle::NoClampFwd)).is_none());
    }

    #[test]
    fn test_combine_slope_offset() {
        let a = CdlData::new([2.0; 3], [0.1; 3], [1.0; 3], 1.0, CdlStyle::NoClampFwd);
        let b = CdlData::new([3.0; 3], [0.2; 3], [1.0; 3], 1.0, CdlStyle::NoClampFwd);
        let c = a.combine(&b).unwrap();
        assert_eq!(c.slope, [6.0; 3]);
        assert!((c.offset[0] - 0.5).abs() < 1e-12);

        // Clamping styles keep slope/offset pairs separate.
        assert!(a.with_style(CdlStyle::V12Fwd).combine(&b.with_style(CdlStyle::V12Fwd)).is_none());
    }

    #[test]
    fn test_combine_saturation() {
        let a = CdlData { saturation: 0.5, style: CdlStyle::NoClampFwd, ..CdlData::default() };
        let b = CdlData { saturation: 3.0, style: CdlStyle::NoClampFwd, ..CdlData::default() };
        assert_eq!(a.combine(&b).unwrap().saturation, 1.5);
    }
}
