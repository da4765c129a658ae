//! Control points and curve kinds.

use crate::{OpsError, OpsResult};

/// A single control point on a curve.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControlPoint {
    /// X coordinate (input value).
    pub x: f32,
    /// Y coordinate (output value).
    pub y: f32,
}

impl ControlPoint {
    /// Create a new control point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Shape family of a curve; decides its identity, end slopes and domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BSplineType {
    /// Monotonic tone curve (RGB curves).
    BSpline,
    /// Monotonic curve whose identity is the diagonal (sat-sat, lum-lum).
    Diagonal,
    /// Gain curve with identity 1 and flat extrapolation (lum-sat, sat-lum).
    Horizontal1,
    /// Periodic gain curve over hue with identity 1 (hue-sat, hue-lum).
    Periodic1,
    /// Periodic offset curve over hue with identity 0 (hue-fx).
    Periodic0,
    /// Periodic diagonal curve (hue-hue).
    HueHue,
}

impl BSplineType {
    /// True for the curves defined over the hue circle.
    pub fn is_periodic(&self) -> bool {
        matches!(self, BSplineType::Periodic1 | BSplineType::Periodic0 | BSplineType::HueHue)
    }

    /// Output of the identity curve at `x`.
    pub fn identity_y(&self, x: f32) -> f32 {
        match self {
            BSplineType::BSpline | BSplineType::Diagonal | BSplineType::HueHue => x,
            BSplineType::Horizontal1 | BSplineType::Periodic1 => 1.0,
            BSplineType::Periodic0 => 0.0,
        }
    }

    /// Short name used in cache-IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BSplineType::BSpline => "bspline",
            BSplineType::Diagonal => "diagonal",
            BSplineType::Horizontal1 => "horizontal1",
            BSplineType::Periodic1 => "periodic1",
            BSplineType::Periodic0 => "periodic0",
            BSplineType::HueHue => "huehue",
        }
    }
}

/// A B-spline curve: control points plus optional user slopes.
///
/// An all-zero (or empty) slope list means slopes are estimated from the
/// points.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    /// Control points, x non-decreasing.
    pub control_points: Vec<ControlPoint>,
    /// Slopes at each control point, or empty.
    pub slopes: Vec<f32>,
}

impl BSplineCurve {
    /// Curve through `points` with estimated slopes.
    pub fn new(control_points: Vec<ControlPoint>) -> Self {
        Self { control_points, slopes: Vec::new() }
    }

    /// Curve through `(x, y)` pairs.
    pub fn from_points(points: &[(f32, f32)]) -> Self {
        Self::new(points.iter().map(|&(x, y)| ControlPoint::new(x, y)).collect())
    }

    /// Sets explicit slopes.
    pub fn with_slopes(mut self, slopes: Vec<f32>) -> Self {
        self.slopes = slopes;
        self
    }

    /// The y = x curve.
    pub fn identity() -> Self {
        Self::from_points(&[(0.0, 0.0), (1.0, 1.0)])
    }

    /// True if every slope is zero (estimated).
    pub fn slopes_are_default(&self) -> bool {
        self.slopes.iter().all(|&s| s == 0.0)
    }

    /// True if the curve equals the identity of `kind`.
    pub fn is_identity(&self, kind: BSplineType) -> bool {
        self.slopes_are_default()
            && self.control_points.iter().all(|p| p.y == kind.identity_y(p.x))
    }

    /// Checks the point count, slope count and x ordering.
    pub fn validate(&self, op: &str, kind: BSplineType) -> OpsResult<()> {
        let n = self.control_points.len();
        if n < 2 {
            return Err(OpsError::validation(
                op,
                format!("a curve needs at least 2 control points, got {n}"),
            ));
        }
        if !self.slopes.is_empty() && self.slopes.len() != n {
            return Err(OpsError::validation(
                op,
                format!("{} slopes given for {n} control points", self.slopes.len()),
            ));
        }
        let mut last_x = f32::NEG_INFINITY;
        for (i, p) in self.control_points.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                return Err(OpsError::validation(op, format!("control point {i} is not finite")));
            }
            if p.x < last_x {
                return Err(OpsError::validation(
                    op,
                    format!("control point {i} has x {} below the previous x {last_x}", p.x),
                ));
            }
            last_x = p.x;
        }
        if kind.is_periodic() {
            let first = self.control_points[0].x;
            if first < 0.0 || last_x > 1.0 || last_x - first >= 1.0 {
                return Err(OpsError::validation(
                    op,
                    format!("hue curve x must span less than one turn of [0, 1], got [{first}, {last_x}]"),
                ));
            }
        }
        Ok(())
    }
}

impl Default for BSplineCurve {
    fn default() -> Self {
        Self::identity()
    }
}
