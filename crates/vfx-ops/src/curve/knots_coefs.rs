//! Packed knots and coefficients of a set of curves.
//!
//! All curves of one op share two flat arrays so the same data can be
//! uploaded as shader uniforms. Per curve, `knots_offsets[2c]` /
//! `knots_offsets[2c + 1]` give the start and count in `knots`, and
//! `coefs_offsets` the same for `coefs`, which stores all A, then all B,
//! then all C coefficients of the curve. An identity curve has offset -1
//! and count 0 and evaluates to its identity value.

use super::fit::fit_curve;
use super::types::{BSplineCurve, BSplineType};
use crate::{OpsError, OpsResult};

/// Newton steps used to invert the hue-fx curve.
pub const HUE_FX_NEWTON_STEPS: usize = 10;
/// Half width of the finite difference used by the hue-fx inversion.
pub const HUE_FX_DERIV_DELTA: f32 = 1e-3;

/// Packed curve data.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotsCoefs {
    /// Start/count pairs into `knots`, two per curve.
    pub knots_offsets: Vec<i32>,
    /// Start/count pairs into `coefs`, two per curve.
    pub coefs_offsets: Vec<i32>,
    /// Knots of every curve.
    pub knots: Vec<f32>,
    /// Coefficients of every curve.
    pub coefs: Vec<f32>,
    max_knots: usize,
    max_coefs: usize,
}

impl KnotsCoefs {
    /// Empty packing for `num_curves` identity curves.
    pub fn new(num_curves: usize, max_knots: usize, max_coefs: usize) -> Self {
        let mut offsets = Vec::with_capacity(num_curves * 2);
        for _ in 0..num_curves {
            offsets.extend_from_slice(&[-1, 0]);
        }
        Self {
            knots_offsets: offsets.clone(),
            coefs_offsets: offsets,
            knots: Vec::new(),
            coefs: Vec::new(),
            max_knots,
            max_coefs,
        }
    }

    /// Packs curves in order; identity curves take no space.
    pub fn build(
        op: &str,
        curves: &[(&BSplineCurve, BSplineType)],
        max_knots: usize,
        max_coefs: usize,
    ) -> OpsResult<Self> {
        let mut kc = Self::new(curves.len(), max_knots, max_coefs);
        for (idx, (curve, kind)) in curves.iter().enumerate() {
            kc.set_curve(op, idx, curve, *kind)?;
        }
        Ok(kc)
    }

    fn set_curve(
        &mut self,
        op: &str,
        idx: usize,
        curve: &BSplineCurve,
        kind: BSplineType,
    ) -> OpsResult<()> {
        if curve.control_points.len() < 2 || curve.is_identity(kind) {
            return Ok(());
        }
        let fitted = fit_curve(curve, kind);
        let new_knots = fitted.knots.len();
        let new_coefs = fitted.num_segments() * 3;
        if self.knots.len() + new_knots > self.max_knots
            || self.coefs.len() + new_coefs > self.max_coefs
        {
            return Err(OpsError::validation(
                op,
                format!(
                    "maximum number of control points reached ({} knots / {} coefficients)",
                    self.max_knots, self.max_coefs
                ),
            ));
        }

        self.knots_offsets[idx * 2] = self.knots.len() as i32;
        self.knots_offsets[idx * 2 + 1] = new_knots as i32;
        self.coefs_offsets[idx * 2] = self.coefs.len() as i32;
        self.coefs_offsets[idx * 2 + 1] = new_coefs as i32;

        self.knots.extend_from_slice(&fitted.knots);
        self.coefs.extend_from_slice(&fitted.coefs_a);
        self.coefs.extend_from_slice(&fitted.coefs_b);
        self.coefs.extend_from_slice(&fitted.coefs_c);
        Ok(())
    }

    /// Number of curves.
    pub fn num_curves(&self) -> usize {
        self.knots_offsets.len() / 2
    }

    /// Maximum knot count of this packing.
    pub fn max_knots(&self) -> usize {
        self.max_knots
    }

    /// Maximum coefficient count of this packing.
    pub fn max_coefs(&self) -> usize {
        self.max_coefs
    }

    /// True when every curve is the identity.
    pub fn is_identity(&self) -> bool {
        self.coefs.is_empty()
    }

    /// True when curve `c` is the identity.
    pub fn is_curve_identity(&self, c: usize) -> bool {
        self.coefs_offsets[2 * c + 1] / 3 == 0
    }

    /// Knots padded with zeros to the maximum count (uniform upload size).
    pub fn padded_knots(&self) -> Vec<f32> {
        let mut v = self.knots.clone();
        v.resize(self.max_knots, 0.0);
        v
    }

    /// Coefficients padded with zeros to the maximum count.
    pub fn padded_coefs(&self) -> Vec<f32> {
        let mut v = self.coefs.clone();
        v.resize(self.max_coefs, 0.0);
        v
    }

    fn curve_range(&self, c: usize) -> (usize, usize, usize, usize) {
        let sets = (self.coefs_offsets[2 * c + 1] / 3) as usize;
        let coefs_offs = self.coefs_offsets[2 * c].max(0) as usize;
        let knots_offs = self.knots_offsets[2 * c].max(0) as usize;
        let knots_cnt = self.knots_offsets[2 * c + 1] as usize;
        (sets, coefs_offs, knots_offs, knots_cnt)
    }

    /// Evaluates curve `c`; an identity curve returns `x`.
    pub fn eval(&self, c: usize, x: f32) -> f32 {
        self.eval_or(c, x, x)
    }

    /// Evaluates curve `c`; an identity curve returns `identity_x`.
    pub fn eval_or(&self, c: usize, x: f32, identity_x: f32) -> f32 {
        let (sets, co, ko, kcnt) = self.curve_range(c);
        if sets == 0 {
            return identity_x;
        }
        let coefs = &self.coefs;
        let knots = &self.knots;
        let kn_start = knots[ko];
        let kn_end = knots[ko + kcnt - 1];

        if x <= kn_start {
            let b = coefs[co + sets];
            let c0 = coefs[co + sets * 2];
            return (x - kn_start) * b + c0;
        }
        if x >= kn_end {
            let (a, b, c0) = (coefs[co + sets - 1], coefs[co + sets * 2 - 1], coefs[co + sets * 3 - 1]);
            let t = kn_end - knots[ko + kcnt - 2];
            let slope = 2.0 * a * t + b;
            let offs = (a * t + b) * t + c0;
            return (x - kn_end) * slope + offs;
        }

        let mut i = 0;
        while i < kcnt - 2 {
            if x < knots[ko + i + 1] {
                break;
            }
            i += 1;
        }
        let (a, b, c0) = (coefs[co + i], coefs[co + sets + i], coefs[co + sets * 2 + i]);
        let t = x - knots[ko + i];
        (a * t + b) * t + c0
    }

    /// Inverse of a monotonic curve `c`; an identity curve returns `y`.
    pub fn eval_rev(&self, c: usize, y: f32) -> f32 {
        let (sets, co, ko, kcnt) = self.curve_range(c);
        if sets == 0 {
            return y;
        }
        let coefs = &self.coefs;
        let knots = &self.knots;
        let kn_start = knots[ko];
        let kn_end = knots[ko + kcnt - 1];
        let kn_start_y = coefs[co + sets * 2];
        let (a_end, b_end, c_end) =
            (coefs[co + sets - 1], coefs[co + sets * 2 - 1], coefs[co + sets * 3 - 1]);
        let t_end = kn_end - knots[ko + kcnt - 2];
        let kn_end_y = (a_end * t_end + b_end) * t_end + c_end;

        if y <= kn_start_y {
            let b = coefs[co + sets];
            return (y - kn_start_y) / b + kn_start;
        }
        if y >= kn_end_y {
            let slope = 2.0 * a_end * t_end + b_end;
            return (y - kn_end_y) / slope + kn_end;
        }

        let mut i = 0;
        while i < kcnt - 2 {
            if y < coefs[co + sets * 2 + i + 1] {
                break;
            }
            i += 1;
        }
        let (a, b, c0) = (coefs[co + i], coefs[co + sets + i], coefs[co + sets * 2 + i]);
        let c0 = c0 - y;
        let discrim = (b * b - 4.0 * a * c0).sqrt();
        knots[ko + i] + (-2.0 * c0) / (discrim + b)
    }

    /// Inverse of the periodic diagonal (hue-hue) curve `c`.
    ///
    /// The curve maps one turn onto one turn, so the whole turns of `y`
    /// carry over unchanged.
    pub fn eval_rev_hue(&self, c: usize, y: f32) -> f32 {
        if self.is_curve_identity(c) {
            return y;
        }
        let turns = y.floor();
        self.eval_rev(c, y - turns) + turns
    }

    /// Inverse of `h -> h + fx(h)` for the hue-fx curve `c`.
    ///
    /// Solved with a fixed number of Newton steps on a finite-difference
    /// slope so the CPU and shader paths agree.
    pub fn eval_rev_hue_fx(&self, c: usize, y: f32) -> f32 {
        if self.is_curve_identity(c) {
            return y;
        }
        let mut h = y;
        for _ in 0..HUE_FX_NEWTON_STEPS {
            let hw = h - h.floor();
            let f = h + self.eval_or(c, hw, 0.0) - y;
            let d = 1.0
                + (self.eval_or(c, hw + HUE_FX_DERIV_DELTA, 0.0)
                    - self.eval_or(c, hw - HUE_FX_DERIV_DELTA, 0.0))
                    / (2.0 * HUE_FX_DERIV_DELTA);
            h -= f / d.max(0.01);
        }
        h
    }
}
