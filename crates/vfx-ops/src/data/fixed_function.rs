//! Fixed-function ops: closed-form transforms selected by style.
//!
//! Only the REC.2100 surround styles take a parameter (the surround gamma);
//! the others take none. The direction is part of the style.

use crate::cache_id::CacheIdBuilder;
use crate::hsy::HsyVariant;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Accepted range of the REC.2100 surround gamma.
pub const REC2100_GAMMA_RANGE: (f64, f64) = (0.01, 100.0);

// ============================================================================
// Constants shared by the CPU and GPU evaluators
// ============================================================================

/// ACES red modifier constants.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RedMod {
    pub one_minus_scale: f32,
    pub pivot: f32,
    /// `4 / width`, width in radians.
    pub inv_width: f32,
    pub noise_limit: f32,
}

pub(crate) const RED_MOD_03: RedMod =
    RedMod { one_minus_scale: 1.0 - 0.85, pivot: 0.03, inv_width: 1.909_859_3, noise_limit: 1e-2 };
pub(crate) const RED_MOD_10: RedMod =
    RedMod { one_minus_scale: 1.0 - 0.82, pivot: 0.03, inv_width: 1.697_652_7, noise_limit: 1e-2 };

/// Quadratic B-spline basis of the red modifier hue weight, one row per
/// knot interval, highest power first.
pub(crate) const HUE_BSPLINE_M: [[f32; 4]; 4] = [
    [0.25, 0.00, 0.00, 0.00],
    [-0.75, 0.75, 0.75, 0.25],
    [0.75, -1.50, 0.00, 1.00],
    [-0.25, 0.75, -0.75, 0.25],
];

/// ACES glow constants.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Glow {
    pub gain: f32,
    pub mid: f32,
}

pub(crate) const GLOW_03: Glow = Glow { gain: 0.075, mid: 0.1 };
pub(crate) const GLOW_10: Glow = Glow { gain: 0.05, mid: 0.08 };

/// AP1 luminance weights.
pub(crate) const AP1_LUMA: [f32; 3] = [0.272_228_72, 0.674_081_74, 0.053_689_52];
pub(crate) const DARK_TO_DIM_GAMMA: f32 = 0.9811;
pub(crate) const DIM_TO_DARK_GAMMA: f32 = 1.019_264_1;

/// Rec.2100 luminance weights.
pub(crate) const REC2100_LUMA: [f32; 3] = [0.2627, 0.6780, 0.0593];
pub(crate) const REC2100_MIN_LUM: f32 = 1e-4;

/// Fixed-function style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedFunctionStyle {
    /// ACES red modifier 0.3/0.7, forward.
    AcesRedMod03Fwd,
    /// ACES red modifier 0.3/0.7, inverse.
    AcesRedMod03Inv,
    /// ACES red modifier 1.0, forward.
    AcesRedMod10Fwd,
    /// ACES red modifier 1.0, inverse.
    AcesRedMod10Inv,
    /// ACES glow 0.3/0.7, forward.
    AcesGlow03Fwd,
    /// ACES glow 0.3/0.7, inverse.
    AcesGlow03Inv,
    /// ACES glow 1.0, forward.
    AcesGlow10Fwd,
    /// ACES glow 1.0, inverse.
    AcesGlow10Inv,
    /// ACES dark-to-dim surround 1.0, forward.
    AcesDarkToDim10Fwd,
    /// ACES dark-to-dim surround 1.0, inverse.
    AcesDarkToDim10Inv,
    /// REC.2100 surround, forward.
    Rec2100SurroundFwd,
    /// REC.2100 surround, inverse.
    Rec2100SurroundInv,
    /// RGB to HSV.
    RgbToHsv,
    /// HSV to RGB.
    HsvToRgb,
    /// RGB to HSY, linear variant.
    RgbToHsyLin,
    /// HSY to RGB, linear variant.
    HsyLinToRgb,
    /// RGB to HSY, log variant.
    RgbToHsyLog,
    /// HSY to RGB, log variant.
    HsyLogToRgb,
    /// RGB to HSY, video variant.
    RgbToHsyVid,
    /// HSY to RGB, video variant.
    HsyVidToRgb,
}

impl FixedFunctionStyle {
    /// Style applying the mathematical inverse.
    pub fn inverse(self) -> Self {
        use FixedFunctionStyle::*;
        match self {
            AcesRedMod03Fwd => AcesRedMod03Inv,
            AcesRedMod03Inv => AcesRedMod03Fwd,
            AcesRedMod10Fwd => AcesRedMod10Inv,
            AcesRedMod10Inv => AcesRedMod10Fwd,
            AcesGlow03Fwd => AcesGlow03Inv,
            AcesGlow03Inv => AcesGlow03Fwd,
            AcesGlow10Fwd => AcesGlow10Inv,
            AcesGlow10Inv => AcesGlow10Fwd,
            AcesDarkToDim10Fwd => AcesDarkToDim10Inv,
            AcesDarkToDim10Inv => AcesDarkToDim10Fwd,
            Rec2100SurroundFwd => Rec2100SurroundInv,
            Rec2100SurroundInv => Rec2100SurroundFwd,
            RgbToHsv => HsvToRgb,
            HsvToRgb => RgbToHsv,
            RgbToHsyLin => HsyLinToRgb,
            HsyLinToRgb => RgbToHsyLin,
            RgbToHsyLog => HsyLogToRgb,
            HsyLogToRgb => RgbToHsyLog,
            RgbToHsyVid => HsyVidToRgb,
            HsyVidToRgb => RgbToHsyVid,
        }
    }

    /// Direction encoded by the style.
    pub fn direction(&self) -> Direction {
        use FixedFunctionStyle::*;
        match self {
            AcesRedMod03Inv | AcesRedMod10Inv | AcesGlow03Inv | AcesGlow10Inv | AcesDarkToDim10Inv
            | Rec2100SurroundInv | HsvToRgb | HsyLinToRgb | HsyLogToRgb | HsyVidToRgb => Direction::Inverse,
            _ => Direction::Forward,
        }
    }

    /// HSY variant of the HSY styles.
    pub fn hsy_variant(&self) -> Option<HsyVariant> {
        use FixedFunctionStyle::*;
        match self {
            RgbToHsyLin | HsyLinToRgb => Some(HsyVariant::Lin),
            RgbToHsyLog | HsyLogToRgb => Some(HsyVariant::Log),
            RgbToHsyVid | HsyVidToRgb => Some(HsyVariant::Vid),
            _ => None,
        }
    }

    /// Number of parameters the style takes.
    pub fn param_count(&self) -> usize {
        match self {
            FixedFunctionStyle::Rec2100SurroundFwd | FixedFunctionStyle::Rec2100SurroundInv => 1,
            _ => 0,
        }
    }

    /// Name used in cache-IDs and shader comments.
    pub fn as_str(&self) -> &'static str {
        use FixedFunctionStyle::*;
        match self {
            AcesRedMod03Fwd => "ACES_RedMod03_Fwd",
            AcesRedMod03Inv => "ACES_RedMod03_Inv",
            AcesRedMod10Fwd => "ACES_RedMod10_Fwd",
            AcesRedMod10Inv => "ACES_RedMod10_Inv",
            AcesGlow03Fwd => "ACES_Glow03_Fwd",
            AcesGlow03Inv => "ACES_Glow03_Inv",
            AcesGlow10Fwd => "ACES_Glow10_Fwd",
            AcesGlow10Inv => "ACES_Glow10_Inv",
            AcesDarkToDim10Fwd => "ACES_DarkToDim10_Fwd",
            AcesDarkToDim10Inv => "ACES_DarkToDim10_Inv",
            Rec2100SurroundFwd => "REC2100_Surround_Fwd",
            Rec2100SurroundInv => "REC2100_Surround_Inv",
            RgbToHsv => "RGB_TO_HSV",
            HsvToRgb => "HSV_TO_RGB",
            RgbToHsyLin => "RGB_TO_HSY_LIN",
            HsyLinToRgb => "HSY_LIN_TO_RGB",
            RgbToHsyLog => "RGB_TO_HSY_LOG",
            HsyLogToRgb => "HSY_LOG_TO_RGB",
            RgbToHsyVid => "RGB_TO_HSY_VID",
            HsyVidToRgb => "HSY_VID_TO_RGB",
        }
    }
}

/// Fixed-function payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedFunctionData {
    /// Style and direction.
    pub style: FixedFunctionStyle,
    /// Style parameters.
    pub params: Vec<f64>,
}

impl FixedFunctionData {
    /// Fixed function without parameters.
    pub fn new(style: FixedFunctionStyle) -> Self {
        Self { style, params: Vec::new() }
    }

    /// Fixed function with parameters.
    pub fn with_params(style: FixedFunctionStyle, params: Vec<f64>) -> Self {
        Self { style, params }
    }

    /// REC.2100 surround with gamma `gamma`.
    pub fn rec2100_surround(gamma: f64) -> Self {
        Self::with_params(FixedFunctionStyle::Rec2100SurroundFwd, vec![gamma])
    }

    /// Direction encoded by the style.
    pub fn direction(&self) -> Direction {
        self.style.direction()
    }

    /// Checks the parameter count and range.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        let expected = self.style.param_count();
        if self.params.len() != expected {
            return Err(OpsError::validation(
                tag,
                format!(
                    "style {} takes {expected} parameter(s), got {}",
                    self.style.as_str(),
                    self.params.len()
                ),
            ));
        }
        if expected == 1 {
            let (lo, hi) = REC2100_GAMMA_RANGE;
            let g = self.params[0];
            if !(lo..=hi).contains(&g) {
                return Err(OpsError::validation(
                    tag,
                    format!("surround gamma {g} is outside [{lo}, {hi}]"),
                ));
            }
        }
        Ok(())
    }

    /// Never an identity.
    pub fn is_identity(&self) -> bool {
        false
    }

    /// Same parameters, inverse style.
    pub fn inverse(&self) -> Self {
        Self { style: self.style.inverse(), params: self.params.clone() }
    }

    /// True when `other` undoes `self`.
    pub fn is_inverse_of(&self, other: &FixedFunctionData) -> bool {
        self.style.inverse() == other.style && self.params == other.params
    }

    pub(crate) fn write_cache_id(&self, b: CacheIdBuilder) -> CacheIdBuilder {
        b.word(self.style.as_str()).doubles(&self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_validation() {
        assert!(FixedFunctionData::rec2100_surround(0.78).validate("FixedFunctionOp").is_ok());
        assert!(FixedFunctionData::rec2100_surround(0.0).validate("FixedFunctionOp").is_err());
        let extra = FixedFunctionData::with_params(FixedFunctionStyle::AcesGlow10Fwd, vec![1.0]);
        assert!(extra.validate("FixedFunctionOp").is_err());
        let missing = FixedFunctionData::new(FixedFunctionStyle::Rec2100SurroundInv);
        assert!(missing.validate("FixedFunctionOp").is_err());
    }

    #[test]
    fn test_inverse_pairs() {
        let ff = FixedFunctionData::new(FixedFunctionStyle::RgbToHsyLog);
        let inv = ff.inverse();
        assert_eq!(inv.style, FixedFunctionStyle::HsyLogToRgb);
        assert_eq!(inv.direction(), Direction::Inverse);
        assert!(ff.is_inverse_of(&inv));
        assert_eq!(inv.style.hsy_variant(), Some(HsyVariant::Log));
    }
}
