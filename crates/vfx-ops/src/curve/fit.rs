//! Quadratic B-spline fitting.
//!
//! Each span between control points becomes one or two quadratic segments
//! `y = A*t^2 + B*t + C` with `t = x - knot`. Slopes at the control points
//! are either supplied or estimated from weighted secants; monotonic curves
//! get a second pass that rescales slopes which would produce a negative
//! slope at a split knot.
//!
//! Periodic (hue) curves are fitted over the points extended by one wrapped
//! point on each side, with the end slopes copied from their counterparts so
//! the curve joins itself smoothly at the wrap.

use super::types::{BSplineCurve, BSplineType, ControlPoint};

/// Smallest end slope of a monotonic curve.
const MIN_END_SLOPE: f32 = 0.01;

/// Knots and per-segment coefficients of a fitted curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FittedCurve {
    /// Segment boundaries; one more than the number of segments.
    pub knots: Vec<f32>,
    /// Quadratic coefficients.
    pub coefs_a: Vec<f32>,
    /// Linear coefficients.
    pub coefs_b: Vec<f32>,
    /// Constant coefficients.
    pub coefs_c: Vec<f32>,
}

impl FittedCurve {
    /// Number of quadratic segments.
    pub fn num_segments(&self) -> usize {
        self.coefs_a.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EndSlopes {
    Monotonic,
    Flat,
    Periodic,
}

/// Fits `curve` as a curve of type `kind`.
pub fn fit_curve(curve: &BSplineCurve, kind: BSplineType) -> FittedCurve {
    let user_slopes = !curve.slopes_are_default() && curve.slopes.len() == curve.control_points.len();

    let (points, ends) = if kind.is_periodic() {
        (extend_periodic(&curve.control_points, kind), EndSlopes::Periodic)
    } else if kind == BSplineType::Horizontal1 {
        (curve.control_points.clone(), EndSlopes::Flat)
    } else {
        (curve.control_points.clone(), EndSlopes::Monotonic)
    };

    let mut slopes = if user_slopes {
        if kind.is_periodic() {
            let n = curve.slopes.len();
            let mut s = Vec::with_capacity(n + 2);
            s.push(curve.slopes[n - 1]);
            s.extend_from_slice(&curve.slopes);
            s.push(curve.slopes[0]);
            s
        } else {
            curve.slopes.clone()
        }
    } else {
        estimate_slopes(&points, ends)
    };

    let fitted = fit_spline(&points, &slopes);
    if ends != EndSlopes::Monotonic {
        return fitted;
    }
    if adjust_slopes(&points, &mut slopes, &fitted.knots) {
        fit_spline(&points, &slopes)
    } else {
        fitted
    }
}

fn extend_periodic(points: &[ControlPoint], kind: BSplineType) -> Vec<ControlPoint> {
    let n = points.len();
    let y_shift = if kind == BSplineType::HueHue { 1.0 } else { 0.0 };
    let first = points[0];
    let last = points[n - 1];
    let mut ext = Vec::with_capacity(n + 2);
    ext.push(ControlPoint::new(last.x - 1.0, last.y - y_shift));
    ext.extend_from_slice(points);
    ext.push(ControlPoint::new(first.x + 1.0, first.y + y_shift));
    ext
}

/// Weighted-secant slope estimate at each control point.
fn estimate_slopes(points: &[ControlPoint], ends: EndSlopes) -> Vec<f32> {
    let n = points.len();
    let mut secant_slope = Vec::with_capacity(n - 1);
    let mut secant_len = Vec::with_capacity(n - 1);
    for w in points.windows(2) {
        let del_x = w[1].x - w[0].x;
        let del_y = w[1].y - w[0].y;
        secant_slope.push(del_y / del_x);
        secant_len.push((del_x * del_x + del_y * del_y).sqrt());
    }

    if n == 2 {
        return match ends {
            EndSlopes::Flat => vec![0.0, 0.0],
            _ => vec![secant_slope[0], secant_slope[0]],
        };
    }

    // Runs of equal secants act as one long secant.
    let mut i = 0;
    loop {
        let mut j = i;
        let mut dl = secant_len[i];
        while j < n - 2 && (secant_slope[j + 1] - secant_slope[j]).abs() < 1e-6 {
            dl += secant_len[j + 1];
            j += 1;
        }
        for len in &mut secant_len[i..=j] {
            *len = dl;
        }
        if j >= n - 3 {
            break;
        }
        i = j + 1;
    }

    let mut slopes = vec![0.0; n];
    for k in 1..n - 1 {
        slopes[k] = (secant_len[k] * secant_slope[k] + secant_len[k - 1] * secant_slope[k - 1])
            / (secant_len[k] + secant_len[k - 1]);
    }

    match ends {
        EndSlopes::Monotonic => {
            slopes[n - 1] =
                MIN_END_SLOPE.max(0.5 * (3.0 * secant_slope[n - 2] - slopes[n - 2]));
            slopes[0] = MIN_END_SLOPE.max(0.5 * (3.0 * secant_slope[0] - slopes[1]));
        }
        EndSlopes::Flat => {
            slopes[0] = 0.0;
            slopes[n - 1] = 0.0;
        }
        EndSlopes::Periodic => {
            slopes[0] = slopes[n - 2];
            slopes[n - 1] = slopes[1];
        }
    }
    slopes
}

fn fit_spline(points: &[ControlPoint], slopes: &[f32]) -> FittedCurve {
    let n = points.len();
    let mut f = FittedCurve {
        knots: Vec::with_capacity(2 * n),
        coefs_a: Vec::with_capacity(2 * n),
        coefs_b: Vec::with_capacity(2 * n),
        coefs_c: Vec::with_capacity(2 * n),
    };

    f.knots.push(points[0].x);
    for i in 0..n - 1 {
        let (xi, xi_pl1) = (points[i].x, points[i + 1].x);
        let (yi, yi_pl1) = (points[i].y, points[i + 1].y);
        let del_x = xi_pl1 - xi;
        let secant = (yi_pl1 - yi) / del_x;

        if ((slopes[i] + slopes[i + 1]) - 2.0 * secant).abs() < 1e-6 {
            f.coefs_c.push(yi);
            f.coefs_b.push(slopes[i]);
            f.coefs_a.push(0.5 * (slopes[i + 1] - slopes[i]) / del_x);
        } else {
            let aa = slopes[i] - secant;
            let bb = slopes[i + 1] - secant;
            let ksi = if aa * bb >= 0.0 {
                (xi + xi_pl1) * 0.5
            } else if aa.abs() > bb.abs() {
                xi_pl1 + aa * del_x / (slopes[i + 1] - slopes[i])
            } else {
                xi + bb * del_x / (slopes[i + 1] - slopes[i])
            };
            let s_bar = (2.0 * secant - slopes[i + 1])
                + (slopes[i + 1] - slopes[i]) * (ksi - xi) / del_x;
            let eta = (s_bar - slopes[i]) / (ksi - xi);

            f.coefs_c.push(yi);
            f.coefs_b.push(slopes[i]);
            f.coefs_a.push(0.5 * eta);

            let t = ksi - xi;
            f.coefs_c.push(yi + slopes[i] * t + 0.5 * eta * t * t);
            f.coefs_b.push(s_bar);
            f.coefs_a.push(0.5 * (slopes[i + 1] - s_bar) / (xi_pl1 - ksi));
            f.knots.push(ksi);
        }
        f.knots.push(xi_pl1);
    }
    f
}

/// Rescales slope pairs whose split knot would get a negative slope.
fn adjust_slopes(points: &[ControlPoint], slopes: &mut [f32], knots: &[f32]) -> bool {
    let mut adjusted = false;
    let mut i = 0;
    for &ksi in knots {
        if i + 1 >= points.len() {
            break;
        }
        if points[i].x == ksi {
            continue;
        }
        let (xi, xi_pl1) = (points[i].x, points[i + 1].x);
        let (yi, yi_pl1) = (points[i].y, points[i + 1].y);
        let s_bar = (2.0 * (yi_pl1 - yi) - (ksi - xi) * slopes[i] - (xi_pl1 - ksi) * slopes[i + 1])
            / (xi_pl1 - xi);
        if s_bar < 0.0 {
            adjusted = true;
            let secant = (yi_pl1 - yi) / (xi_pl1 - xi);
            let blend_slope =
                ((ksi - xi) * slopes[i] + (xi_pl1 - ksi) * slopes[i + 1]) / (xi_pl1 - xi);
            let aim_slope = (0.01 * 0.5 * (slopes[i] + slopes[i + 1])).min(secant);
            let adjust = (2.0 * secant - aim_slope) / blend_slope;
            slopes[i] *= adjust;
            slopes[i + 1] *= adjust;
        }
        i += 1;
    }
    adjusted
}
