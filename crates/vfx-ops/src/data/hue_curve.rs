//! Grading hue curves: eight curves evaluated in HSY space.
//!
//! | index | curve   | kind        | maps            |
//! |-------|---------|-------------|-----------------|
//! | 0     | hue-hue | HueHue      | hue to hue      |
//! | 1     | hue-sat | Periodic1   | hue to sat gain |
//! | 2     | hue-lum | Periodic1   | hue to lum gain |
//! | 3     | lum-sat | Horizontal1 | lum to sat gain |
//! | 4     | sat-sat | Diagonal    | sat to sat      |
//! | 5     | lum-lum | Diagonal    | lum to lum      |
//! | 6     | sat-lum | Horizontal1 | sat to lum gain |
//! | 7     | hue-fx  | Periodic0   | hue to hue shift|

use vfx_shader::DynamicPropertyType;

use super::rgb_curve::GradingStyle;
use crate::cache_id::CacheIdBuilder;
use crate::curve::{BSplineCurve, BSplineType, HUE_MAX_COEFS, HUE_MAX_KNOTS, KnotsCoefs};
use crate::dynamic::{CurveSet, DynamicCurve};
use crate::hsy::HsyVariant;
use crate::meta::Direction;
use crate::OpsResult;

const TAG: &str = "GradingHueCurveOp";

/// Curve kinds in packing order.
pub const HUE_CURVE_KINDS: [BSplineType; 8] = [
    BSplineType::HueHue,
    BSplineType::Periodic1,
    BSplineType::Periodic1,
    BSplineType::Horizontal1,
    BSplineType::Diagonal,
    BSplineType::Diagonal,
    BSplineType::Horizontal1,
    BSplineType::Periodic0,
];

/// Index of each curve in the packed data.
pub mod curve_index {
    /// Hue to hue.
    pub const HUE_HUE: usize = 0;
    /// Hue to saturation gain.
    pub const HUE_SAT: usize = 1;
    /// Hue to luma gain.
    pub const HUE_LUM: usize = 2;
    /// Luma to saturation gain.
    pub const LUM_SAT: usize = 3;
    /// Saturation to saturation.
    pub const SAT_SAT: usize = 4;
    /// Luma to luma.
    pub const LUM_LUM: usize = 5;
    /// Saturation to luma gain.
    pub const SAT_LUM: usize = 6;
    /// Hue to hue shift.
    pub const HUE_FX: usize = 7;
}

/// The eight hue curves.
#[derive(Debug, Clone, PartialEq)]
pub struct HueCurves {
    /// Hue to hue.
    pub hue_hue: BSplineCurve,
    /// Hue to saturation gain.
    pub hue_sat: BSplineCurve,
    /// Hue to luma gain.
    pub hue_lum: BSplineCurve,
    /// Luma to saturation gain.
    pub lum_sat: BSplineCurve,
    /// Saturation to saturation.
    pub sat_sat: BSplineCurve,
    /// Luma to luma.
    pub lum_lum: BSplineCurve,
    /// Saturation to luma gain.
    pub sat_lum: BSplineCurve,
    /// Hue to hue shift.
    pub hue_fx: BSplineCurve,
}

fn hue_axis(y: impl Fn(f32) -> f32) -> BSplineCurve {
    let points: Vec<(f32, f32)> = (0..6).map(|k| k as f32 / 6.0).map(|x| (x, y(x))).collect();
    BSplineCurve::from_points(&points)
}

impl HueCurves {
    /// Identity curves spanning the usual range of `style`.
    pub fn default_for(style: GradingStyle) -> Self {
        let unit_flat = BSplineCurve::from_points(&[(0.0, 1.0), (0.5, 1.0), (1.0, 1.0)]);
        let unit_diag = BSplineCurve::from_points(&[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)]);
        let (lum_flat, lum_diag) = match style {
            GradingStyle::Lin => (
                BSplineCurve::from_points(&[(-7.0, 1.0), (0.0, 1.0), (7.0, 1.0)]),
                BSplineCurve::from_points(&[(-7.0, -7.0), (0.0, 0.0), (7.0, 7.0)]),
            ),
            GradingStyle::Log | GradingStyle::Video => (unit_flat.clone(), unit_diag.clone()),
        };
        Self {
            hue_hue: hue_axis(|x| x),
            hue_sat: hue_axis(|_| 1.0),
            hue_lum: hue_axis(|_| 1.0),
            lum_sat: lum_flat,
            sat_sat: unit_diag,
            lum_lum: lum_diag,
            sat_lum: unit_flat,
            hue_fx: hue_axis(|_| 0.0),
        }
    }

    /// Curves in packing order.
    pub fn curves(&self) -> [&BSplineCurve; 8] {
        [
            &self.hue_hue,
            &self.hue_sat,
            &self.hue_lum,
            &self.lum_sat,
            &self.sat_sat,
            &self.lum_lum,
            &self.sat_lum,
            &self.hue_fx,
        ]
    }

    /// True when every curve is the identity of its kind.
    pub fn is_identity(&self) -> bool {
        self.curves().iter().zip(HUE_CURVE_KINDS).all(|(c, kind)| c.is_identity(kind))
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

impl CurveSet for HueCurves {
    const PROPERTY: DynamicPropertyType = DynamicPropertyType::GradingHueCurve;

    fn pack(&self) -> OpsResult<KnotsCoefs> {
        self.pack_tagged(TAG)
    }
}

impl HueCurves {
    fn pack_tagged(&self, tag: &str) -> OpsResult<KnotsCoefs> {
        let curves = self.curves();
        for (c, kind) in curves.iter().zip(HUE_CURVE_KINDS) {
            c.validate(tag, kind)?;
        }
        let list: Vec<_> = curves.iter().copied().zip(HUE_CURVE_KINDS).collect();
        KnotsCoefs::build(tag, &list, HUE_MAX_KNOTS, HUE_MAX_COEFS)
    }
}

/// Shared slot of dynamic hue curves.
pub type DynamicHueCurve = DynamicCurve<HueCurves>;

/// Grading hue curve payload.
#[derive(Debug, Clone)]
pub struct HueCurveData {
    /// Working space; selects the HSY variant.
    pub style: GradingStyle,
    /// Curves; for a dynamic op, the initial value of the slot.
    pub curves: HueCurves,
    /// Direction.
    pub direction: Direction,
    /// Input and output are already HSY.
    pub bypass_rgb_to_hsy: bool,
    /// Evaluates only the hue-sat curve on each channel, for curve editors.
    pub draw_curve_only: bool,
    /// Curves may change after the processor is built.
    pub dynamic: bool,
    /// Bound slot of a dynamic op.
    pub slot: Option<DynamicHueCurve>,
}

impl PartialEq for HueCurveData {
    fn eq(&self, other: &Self) -> bool {
        self.style == other.style
            && self.curves == other.curves
            && self.direction == other.direction
            && self.bypass_rgb_to_hsy == other.bypass_rgb_to_hsy
            && self.draw_curve_only == other.draw_curve_only
            && self.dynamic == other.dynamic
    }
}

impl HueCurveData {
    /// Static forward curves.
    pub fn new(style: GradingStyle, curves: HueCurves) -> Self {
        Self {
            style,
            curves,
            direction: Direction::Forward,
            bypass_rgb_to_hsy: false,
            draw_curve_only: false,
            dynamic: false,
            slot: None,
        }
    }

    /// Identity curves of `style`.
    pub fn identity(style: GradingStyle) -> Self {
        Self::new(style, HueCurves::default_for(style))
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

    /// Sets the RGB/HSY bypass.
    pub fn with_bypass_rgb_to_hsy(mut self, bypass: bool) -> Self {
        self.bypass_rgb_to_hsy = bypass;
        self
    }

    /// Sets the draw-curve-only mode.
    pub fn with_draw_curve_only(mut self, draw: bool) -> Self {
        self.draw_curve_only = draw;
        self
    }

    /// HSY variant of the working space.
    pub fn hsy_variant(&self) -> HsyVariant {
        match self.style {
            GradingStyle::Lin => HsyVariant::Lin,
            GradingStyle::Log => HsyVariant::Log,
            GradingStyle::Video => HsyVariant::Vid,
        }
    }

    /// Validates and packs the curves.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        self.curves.pack_tagged(tag).map(|_| ())
    }

    /// Current curves: the slot's when bound.
    pub fn current_curves(&self) -> HueCurves {
        match &self.slot {
            Some(slot) => slot.curves(),
            None => self.curves.clone(),
        }
    }

    /// Identity curves on a static op. Dynamic ops and the draw mode never
    /// are.
    pub fn is_identity(&self) -> bool {
        !self.dynamic && !self.draw_curve_only && self.curves.is_identity()
    }

    /// Same curves applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder) -> CacheIdBuilder {
        b = b.word(self.style.as_str());
        if self.bypass_rgb_to_hsy {
            b = b.word("bypassRGBToHSY");
        }
        if self.draw_curve_only {
            b = b.word("drawCurveOnly");
        }
        if self.dynamic {
            return b.word("dynamic");
        }
        self.curves.write_cache_id(b)
    }
}
