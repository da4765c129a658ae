//! 3D LUT over the unit cube, blue varying fastest.
//!
//! Sample `(r, g, b)` of an `N`-grid lives at `((r * N + g) * N + b) * 3`.
//! Inputs are clamped to `[0, 1]` and scaled by `N - 1`.
//!
//! The inverse has no closed form. It is evaluated per pixel by Newton
//! iteration on the forward map, or through a baked grid of those solutions.

use std::borrow::Cow;

use glam::{Mat3, Vec3};

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::optimizer::LutInverseStyle;
use crate::{OpsError, OpsResult};

/// Grid size of a baked inverse.
pub const INVERSE_GRID_SIZE: usize = 48;
/// Grid size of a baked inverse when the fast inverse style is requested.
pub const FAST_INVERSE_GRID_SIZE: usize = 17;

const NEWTON_STEPS: usize = 20;
const NEWTON_TOLERANCE: f32 = 1e-7;
const JACOBIAN_DELTA: f32 = 1e-4;

/// Interpolation inside a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lut3DInterpolation {
    /// Eight-tap trilinear.
    Trilinear,
    /// Four-tap tetrahedral.
    Tetrahedral,
    /// Best available (tetrahedral).
    Best,
    /// Default (trilinear).
    #[default]
    Default,
}

impl Lut3DInterpolation {
    /// Resolves `Best` and `Default`.
    pub fn resolved(self) -> Self {
        match self {
            Lut3DInterpolation::Tetrahedral | Lut3DInterpolation::Best => Lut3DInterpolation::Tetrahedral,
            _ => Lut3DInterpolation::Trilinear,
        }
    }

    /// Name used in cache-IDs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lut3DInterpolation::Trilinear => "trilinear",
            Lut3DInterpolation::Tetrahedral => "tetrahedral",
            Lut3DInterpolation::Best => "best",
            Lut3DInterpolation::Default => "default",
        }
    }
}

/// 3D LUT payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3DData {
    /// Samples per axis.
    pub grid_size: usize,
    /// `grid_size^3` RGB samples, blue fastest.
    pub values: Vec<f32>,
    /// Interpolation.
    pub interpolation: Lut3DInterpolation,
    /// Direction.
    pub direction: Direction,
}

impl Lut3DData {
    /// Forward LUT from samples.
    pub fn new(grid_size: usize, values: Vec<f32>) -> Self {
        Self {
            grid_size,
            values,
            interpolation: Lut3DInterpolation::Default,
            direction: Direction::Forward,
        }
    }

    /// LUT sampling `f` at every grid vertex.
    pub fn from_fn(grid_size: usize, f: impl Fn([f32; 3]) -> [f32; 3]) -> Self {
        let denom = grid_size.saturating_sub(1).max(1) as f32;
        let mut values = Vec::with_capacity(grid_size.pow(3) * 3);
        for r in 0..grid_size {
            for g in 0..grid_size {
                for b in 0..grid_size {
                    values.extend(f([r as f32 / denom, g as f32 / denom, b as f32 / denom]));
                }
            }
        }
        Self::new(grid_size, values)
    }

    /// Identity LUT.
    pub fn identity(grid_size: usize) -> Self {
        Self::from_fn(grid_size, |rgb| rgb)
    }

    /// Sets the interpolation.
    pub fn with_interpolation(mut self, interpolation: Lut3DInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Checks the grid size against the sample count.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        let n = self.grid_size;
        if n < 2 {
            return Err(OpsError::validation(tag, format!("grid size {n} is below the minimum of 2")));
        }
        let expected = n * n * n * 3;
        if self.values.len() != expected {
            return Err(OpsError::validation(
                tag,
                format!("{} values for grid size {n}, expected {expected}", self.values.len()),
            ));
        }
        Ok(())
    }

    /// Offset of vertex `(r, g, b)` in `values`.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        ((r * self.grid_size + g) * self.grid_size + b) * 3
    }

    #[inline]
    fn vertex(&self, r: usize, g: usize, b: usize) -> Vec3 {
        let i = self.index(r, g, b);
        Vec3::new(self.values[i], self.values[i + 1], self.values[i + 2])
    }

    /// True when every vertex equals its coordinates.
    pub fn is_identity(&self) -> bool {
        if self.validate("Lut3DOp").is_err() {
            return false;
        }
        let denom = (self.grid_size - 1) as f32;
        (0..self.grid_size).all(|r| {
            (0..self.grid_size).all(|g| {
                (0..self.grid_size).all(|b| {
                    let v = self.vertex(r, g, b);
                    let expect = Vec3::new(r as f32, g as f32, b as f32) / denom;
                    (v - expect).abs().max_element() <= 1e-5
                })
            })
        })
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    /// Forward evaluation with the resolved interpolation.
    pub fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        match self.interpolation.resolved() {
            Lut3DInterpolation::Tetrahedral => self.eval_tetrahedral(rgb),
            _ => self.eval_trilinear(rgb),
        }
    }

    /// Grid cell and fractional position of `rgb`.
    #[inline]
    fn locate(&self, rgb: [f32; 3]) -> ([usize; 3], Vec3) {
        let max_idx = (self.grid_size - 1) as f32;
        let mut base = [0usize; 3];
        let mut frac = Vec3::ZERO;
        for c in 0..3 {
            // NaN clamps to 0
            let coord = if rgb[c] > 0.0 { rgb[c].min(1.0) * max_idx } else { 0.0 };
            let cell = coord.floor().min(max_idx - 1.0);
            base[c] = cell as usize;
            frac[c] = coord - cell;
        }
        (base, frac)
    }

    /// Trilinear interpolation.
    pub fn eval_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let ([r, g, b], f) = self.locate(rgb);
        let lerp = |a: Vec3, b: Vec3, t: f32| a * (1.0 - t) + b * t;
        let c00 = lerp(self.vertex(r, g, b), self.vertex(r, g, b + 1), f.z);
        let c01 = lerp(self.vertex(r, g + 1, b), self.vertex(r, g + 1, b + 1), f.z);
        let c10 = lerp(self.vertex(r + 1, g, b), self.vertex(r + 1, g, b + 1), f.z);
        let c11 = lerp(self.vertex(r + 1, g + 1, b), self.vertex(r + 1, g + 1, b + 1), f.z);
        let c0 = lerp(c00, c01, f.y);
        let c1 = lerp(c10, c11, f.y);
        lerp(c0, c1, f.x).to_array()
    }

    /// Tetrahedral interpolation: one of six tetrahedra by the ordering of
    /// the fractional coordinates.
    pub fn eval_tetrahedral(&self, rgb: [f32; 3]) -> [f32; 3] {
        let ([r, g, b], f) = self.locate(rgb);
        let (fr, fg, fb) = (f.x, f.y, f.z);
        let v000 = self.vertex(r, g, b);
        let v111 = self.vertex(r + 1, g + 1, b + 1);
        let out = if fr > fg {
            if fg > fb {
                v000 * (1.0 - fr)
                    + self.vertex(r + 1, g, b) * (fr - fg)
                    + self.vertex(r + 1, g + 1, b) * (fg - fb)
                    + v111 * fb
            } else if fr > fb {
                v000 * (1.0 - fr)
                    + self.vertex(r + 1, g, b) * (fr - fb)
                    + self.vertex(r + 1, g, b + 1) * (fb - fg)
                    + v111 * fg
            } else {
                v000 * (1.0 - fb)
                    + self.vertex(r, g, b + 1) * (fb - fr)
                    + self.vertex(r + 1, g, b + 1) * (fr - fg)
                    + v111 * fg
            }
        } else if fb > fg {
            v000 * (1.0 - fb)
                + self.vertex(r, g, b + 1) * (fb - fg)
                + self.vertex(r, g + 1, b + 1) * (fg - fr)
                + v111 * fr
        } else if fb > fr {
            v000 * (1.0 - fg)
                + self.vertex(r, g + 1, b) * (fg - fb)
                + self.vertex(r, g + 1, b + 1) * (fb - fr)
                + v111 * fr
        } else {
            v000 * (1.0 - fg)
                + self.vertex(r, g + 1, b) * (fg - fr)
                + self.vertex(r + 1, g + 1, b) * (fr - fb)
                + v111 * fb
        };
        out.to_array()
    }

    /// Input in the unit cube that the forward LUT maps closest to `target`.
    pub fn invert_pixel(&self, target: [f32; 3]) -> [f32; 3] {
        let target = Vec3::from_array(target);
        if !target.is_finite() {
            return target.to_array();
        }
        let eval = |x: Vec3| Vec3::from_array(self.eval(x.to_array()));
        let mut x = target.clamp(Vec3::ZERO, Vec3::ONE);
        for _ in 0..NEWTON_STEPS {
            let fx = eval(x) - target;
            if fx.abs().max_element() < NEWTON_TOLERANCE {
                break;
            }
            let mut cols = [Vec3::ZERO; 3];
            for (c, col) in cols.iter_mut().enumerate() {
                let mut h = Vec3::ZERO;
                h[c] = if x[c] + JACOBIAN_DELTA <= 1.0 { JACOBIAN_DELTA } else { -JACOBIAN_DELTA };
                *col = (eval(x + h) - eval(x)) / h[c];
            }
            let jacobian = Mat3::from_cols(cols[0], cols[1], cols[2]);
            if jacobian.determinant().abs() < 1e-12 {
                break;
            }
            x = (x - jacobian.inverse() * fx).clamp(Vec3::ZERO, Vec3::ONE);
        }
        x.to_array()
    }

    /// Forward LUT of `grid_size` approximating the inverse of `self`.
    pub fn bake_inverse(&self, grid_size: usize) -> Lut3DData {
        Lut3DData::from_fn(grid_size, |rgb| self.invert_pixel(rgb))
            .with_interpolation(self.interpolation)
    }

    /// Forward LUT evaluating this payload: `self` when forward, otherwise
    /// a baked inverse sized by `style`.
    pub fn resolved_forward(&self, style: LutInverseStyle) -> Cow<'_, Lut3DData> {
        match (self.direction, style) {
            (Direction::Forward, _) => Cow::Borrowed(self),
            (Direction::Inverse, LutInverseStyle::Exact) => Cow::Owned(self.bake_inverse(INVERSE_GRID_SIZE)),
            (Direction::Inverse, LutInverseStyle::Fast) => Cow::Owned(self.bake_inverse(FAST_INVERSE_GRID_SIZE)),
        }
    }

    pub(crate) fn write_cache_id(&self, mut b: CacheIdBuilder, inverse_style: LutInverseStyle) -> CacheIdBuilder {
        b = b.int(self.grid_size).word(self.interpolation.as_str());
        if self.direction == Direction::Inverse {
            b = b.word(inverse_style.as_str());
        }
        b.digest(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn warm(rgb: [f32; 3]) -> [f32; 3] {
        [rgb[0].powf(0.8), rgb[1], rgb[2] * 0.9 + 0.05 * rgb[0]]
    }

    #[test]
    fn test_validation() {
        assert!(Lut3DData::new(1, vec![0.0; 3]).validate("Lut3DOp").is_err());
        assert!(Lut3DData::new(2, vec![0.0; 23]).validate("Lut3DOp").is_err());
        assert!(Lut3DData::identity(2).validate("Lut3DOp").is_ok());
    }

    #[test]
    fn test_blue_fastest_layout() {
        let lut = Lut3DData::identity(3);
        assert_eq!(&lut.values[3..6], &[0.0, 0.0, 0.5]);
        assert_eq!(lut.index(1, 0, 0), 27);
    }

    #[test]
    fn test_interpolators_agree_on_vertices() {
        let lut = Lut3DData::from_fn(5, warm);
        for r in 0..5 {
            for g in 0..5 {
                for b in 0..5 {
                    let rgb = [r as f32 / 4.0, g as f32 / 4.0, b as f32 / 4.0];
                    let i = lut.index(r, g, b);
                    let vertex = [lut.values[i], lut.values[i + 1], lut.values[i + 2]];
                    assert_eq!(lut.eval_tetrahedral(rgb), vertex);
                    assert_eq!(lut.eval_trilinear(rgb), vertex);
                }
            }
        }
    }

    #[test]
    fn test_identity_lut_interpolates_exactly() {
        let lut = Lut3DData::identity(17).with_interpolation(Lut3DInterpolation::Tetrahedral);
        assert!(lut.is_identity());
        let out = lut.eval([0.123, 0.456, 0.789]);
        assert_abs_diff_eq!(out[0], 0.123, epsilon = EPSILON);
        assert_abs_diff_eq!(out[1], 0.456, epsilon = EPSILON);
        assert_abs_diff_eq!(out[2], 0.789, epsilon = EPSILON);
        // Inputs outside the cube clamp.
        assert_eq!(lut.eval([-1.0, 2.0, 0.0]), [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_newton_inverse() {
        let lut = Lut3DData::from_fn(17, warm).with_interpolation(Lut3DInterpolation::Tetrahedral);
        let x = [0.3, 0.6, 0.4];
        let y = lut.eval(x);
        let back = lut.invert_pixel(y);
        for c in 0..3 {
            assert_abs_diff_eq!(back[c], x[c], epsilon = 1e-4);
        }
    }
}
