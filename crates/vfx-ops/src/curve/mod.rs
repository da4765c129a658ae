//! B-spline curve engine shared by the RGB-curve and hue-curve ops.
//!
//! - [`types`] - control points, curve kinds, validation
//! - [`fit`] - quadratic spline fitting with slope estimation
//! - [`knots_coefs`] - packed knots/coefficients, forward and inverse evaluation
//! - [`linlog`] - the lin-to-log wrapper of the linear grading style

pub mod fit;
pub mod knots_coefs;
pub mod linlog;
pub mod types;

pub use fit::{FittedCurve, fit_curve};
pub use knots_coefs::KnotsCoefs;
pub use types::{BSplineCurve, BSplineType, ControlPoint};

/// Knot capacity of the four RGB curves.
pub const RGB_MAX_KNOTS: usize = 120;
/// Coefficient capacity of the four RGB curves.
pub const RGB_MAX_COEFS: usize = 360;
/// Knot capacity of the eight hue curves.
pub const HUE_MAX_KNOTS: usize = 240;
/// Coefficient capacity of the eight hue curves.
pub const HUE_MAX_COEFS: usize = 720;
