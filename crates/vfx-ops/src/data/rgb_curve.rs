//! Grading RGB curves: one B-spline per channel plus a master curve.
//!
//! Linear-style curves are edited in the grading log space, so their
//! evaluation is wrapped in lin-to-log / log-to-lin unless the wrap is
//! bypassed.

use vfx_shader::DynamicPropertyType;

use crate::cache_id::CacheIdBuilder;
use crate::curve::{BSplineCurve, BSplineType, KnotsCoefs, RGB_MAX_COEFS, RGB_MAX_KNOTS};
use crate::dynamic::{CurveSet, DynamicCurve};
use crate::meta::Direction;
use crate::OpsResult;

const TAG: &str = "GradingRGBCurveOp";

/// Working space of a grading op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradingStyle {
    /// Log-encoded.
    #[default]
    Log,
    /// Scene-linear.
    Lin,
    /// Video (display-referred).
    Video,
}

impl GradingStyle {
    /// Name used in cache-IDs and shader comments.
    pub fn as_str(&self) -> &'static str {
        match self {
            GradingStyle::Log => "log",
            GradingStyle::Lin => "linear",
            GradingStyle::Video => "video",
        }
    }
}

/// Red, green, blue and master curves.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbCurves {
    /// Red channel.
    pub red: BSplineCurve,
    /// Green channel.
    pub green: BSplineCurve,
    /// Blue channel.
    pub blue: BSplineCurve,
    /// Applied to every channel.
    pub master: BSplineCurve,
}

impl RgbCurves {
    /// Identity curves spanning the usual range of `style`.
    pub fn default_for(style: GradingStyle) -> Self {
        let curve = match style {
            GradingStyle::Lin => BSplineCurve::from_points(&[(-7.0, -7.0), (0.0, 0.0), (7.0, 7.0)]),
            GradingStyle::Log | GradingStyle::Video => {
                BSplineCurve::from_points(&[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)])
            }
        };
        Self { red: curve.clone(), green: curve.clone(), blue: curve.clone(), master: curve }
    }

    /// Curves in packing order: red, green, blue, master.
    pub fn curves(&self) -> [&BSplineCurve; 4] {
        [&self.red, &self.green, &self.blue, &self.master]
    }

    /// True when every curve is the identity.
    pub fn is_identity(&self) -> bool {
        self.curves().iter().all(|c| c.is_identity(BSplineType::BSpline))
    }

    fn write_cache_id(&self, mut b: CacheIdBuilder) -> CacheIdBuilder {
        for c in self.curves() {
            for p in &c.control_points {
                b = b.floats(&[p.x, p.y]);
            }
            b = b.word("slopes").floats(&c.slopes);
        }
        b
    }
}

impl CurveSet for RgbCurves {
    const PROPERTY: DynamicPropertyType = DynamicPropertyType::GradingRgbCurve;

    fn pack(&self) -> OpsResult<KnotsCoefs> {
        self.pack_tagged(TAG)
    }
}

impl RgbCurves {
    /// Validates and packs the curves, naming op `tag` in errors.
    fn pack_tagged(&self, tag: &str) -> OpsResult<KnotsCoefs> {
        let curves = self.curves();
        for c in curves {
            c.validate(tag, BSplineType::BSpline)?;
        }
        let list: Vec<_> = curves.iter().map(|c| (*c, BSplineType::BSpline)).collect();
        KnotsCoefs::build(tag, &list, RGB_MAX_KNOTS, RGB_MAX_COEFS)
    }
}

/// Shared slot of dynamic RGB curves.
pub type DynamicRgbCurve = DynamicCurve<RgbCurves>;

/// Grading RGB curve payload.
#[derive(Debug, Clone)]
pub struct RgbCurveData {
    /// Working space.
    pub style: GradingStyle,
    /// Curves; for a dynamic op, the initial value of the slot.
    pub curves: RgbCurves,
    /// Direction.
    pub direction: Direction,
    /// Skips the lin-to-log wrap of the linear style.
    pub bypass_lin_to_log: bool,
    /// Curves may change after the processor is built.
    pub dynamic: bool,
    /// Bound slot of a dynamic op.
    pub slot: Option<DynamicRgbCurve>,
}

impl PartialEq for RgbCurveData {
    fn eq(&self, other: &Self) -> bool {
        self.style == other.style
            && self.curves == other.curves
            && self.direction == other.direction
            && self.bypass_lin_to_log == other.bypass_lin_to_log
            && self.dynamic == other.dynamic
    }
}

impl RgbCurveData {
    /// Static forward curves.
    pub fn new(style: GradingStyle, curves: RgbCurves) -> Self {
        Self {
            style,
            curves,
            direction: Direction::Forward,
            bypass_lin_to_log: false,
            dynamic: false,
            slot: None,
        }
    }

    /// Identity curves of `style`.
    pub fn identity(style: GradingStyle) -> Self {
        Self::new(style, RgbCurves::default_for(style))
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Marks the curves dynamic.
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Sets the lin-to-log bypass.
    pub fn with_bypass_lin_to_log(mut self, bypass: bool) -> Self {
        self.bypass_lin_to_log = bypass;
        self
    }

    /// True when evaluation is wrapped in lin-to-log / log-to-lin.
    pub fn uses_lin_log(&self) -> bool {
        self.style == GradingStyle::Lin && !self.bypass_lin_to_log
    }

    /// Validates and packs the curves.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        self.curves.pack_tagged(tag).map(|_| ())
    }

    /// Current curves: the slot's when bound.
    pub fn current_curves(&self) -> RgbCurves {
        match &self.slot {
            Some(slot) => slot.curves(),
            None => self.curves.clone(),
        }
    }

    /// Identity curves on a static op. Dynamic ops never are.
    pub fn is_identity(&self) -> bool {
        !self.dynamic && self.curves.is_identity()
    }

    /// Same curves applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder) -> CacheIdBuilder {
        b = b.word(self.style.as_str());
        if self.bypass_lin_to_log {
            b = b.word("bypassLinToLog");
        }
        if self.dynamic {
            return b.word("dynamic");
        }
        self.curves.write_cache_id(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpsError;

    #[test]
    fn test_defaults_are_identity() {
        for style in [GradingStyle::Log, GradingStyle::Lin, GradingStyle::Video] {
            let data = RgbCurveData::identity(style);
            assert!(data.is_identity());
            assert!(data.curves.pack().unwrap().is_identity());
        }
        assert!(!RgbCurveData::identity(GradingStyle::Log).with_dynamic(true).is_identity());
    }

    #[test]
    fn test_lin_log_wrap() {
        assert!(RgbCurveData::identity(GradingStyle::Lin).uses_lin_log());
        assert!(!RgbCurveData::identity(GradingStyle::Lin).with_bypass_lin_to_log(true).uses_lin_log());
        assert!(!RgbCurveData::identity(GradingStyle::Video).uses_lin_log());
    }

    #[test]
    fn test_validation_rejects_decreasing_x() {
        let mut data = RgbCurveData::identity(GradingStyle::Log);
        data.curves.green = BSplineCurve::from_points(&[(0.0, 0.0), (0.8, 0.5), (0.6, 1.0)]);
        let err = data.validate("grade_curves").unwrap_err();
        assert!(matches!(err, OpsError::Validation { ref op, .. } if op == "grade_curves"), "{err}");
    }

    #[test]
    fn test_packing_order() {
        let mut curves = RgbCurves::default_for(GradingStyle::Log);
        curves.blue = BSplineCurve::from_points(&[(0.0, 0.1), (1.0, 0.9)]);
        let kc = curves.pack().unwrap();
        assert!(kc.is_curve_identity(0));
        assert!(!kc.is_curve_identity(2));
        assert!(kc.is_curve_identity(3));
    }
}
