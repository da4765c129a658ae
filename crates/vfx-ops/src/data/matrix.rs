//! Matrix with offset: `out = M * in + offset` over RGBA.

use vfx_math::Mat4d;

use crate::cache_id::CacheIdBuilder;
use crate::meta::Direction;
use crate::{OpsError, OpsResult};

/// Tolerance used to recognise identities after composition.
const IDENTITY_TOLERANCE: f64 = 1e-9;

/// 4x4 matrix plus offset.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixData {
    /// Row-major RGBA matrix.
    pub matrix: Mat4d,
    /// Offset added after the product.
    pub offset: [f64; 4],
    /// Direction; the inverse is computed at evaluation.
    pub direction: Direction,
}

impl Default for MatrixData {
    fn default() -> Self {
        Self { matrix: Mat4d::IDENTITY, offset: [0.0; 4], direction: Direction::Forward }
    }
}

impl MatrixData {
    /// Forward matrix with offset.
    pub fn new(matrix: Mat4d, offset: [f64; 4]) -> Self {
        Self { matrix, offset, direction: Direction::Forward }
    }

    /// Per-channel scale.
    pub fn scale(s: [f64; 4]) -> Self {
        Self::new(Mat4d::from_diagonal(s), [0.0; 4])
    }

    /// Pure offset.
    pub fn offset(offset: [f64; 4]) -> Self {
        Self::new(Mat4d::IDENTITY, offset)
    }

    /// RGB 3x3 matrix (row-major), alpha untouched.
    pub fn from_rgb(m: [f64; 9]) -> Self {
        Self::new(
            Mat4d::from_row_major([
                m[0], m[1], m[2], 0.0, //
                m[3], m[4], m[5], 0.0, //
                m[6], m[7], m[8], 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]),
            [0.0; 4],
        )
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Requires an invertible matrix in the inverse direction.
    pub fn validate(&self, tag: &str) -> OpsResult<()> {
        if self.has_non_finite() {
            return Err(OpsError::validation(tag, "matrix or offset is not finite"));
        }
        if self.direction == Direction::Inverse && self.matrix.inverse().is_none() {
            return Err(OpsError::validation(
                tag,
                format!("singular matrix (determinant {}) cannot be inverted", self.matrix.determinant()),
            ));
        }
        Ok(())
    }

    fn has_non_finite(&self) -> bool {
        self.matrix.m.iter().chain(self.offset.iter()).any(|v| !v.is_finite())
    }

    /// Equivalent forward matrix and offset.
    pub fn forward(&self) -> OpsResult<(Mat4d, [f64; 4])> {
        match self.direction {
            Direction::Forward => Ok((self.matrix, self.offset)),
            Direction::Inverse => {
                let inv = self.matrix.inverse().ok_or_else(|| {
                    OpsError::validation("MatrixOffsetOp", "singular matrix cannot be inverted")
                })?;
                let o = inv.mul_vec(self.offset);
                Ok((inv, [-o[0], -o[1], -o[2], -o[3]]))
            }
        }
    }

    /// True for the identity matrix with zero offset.
    pub fn is_identity(&self) -> bool {
        self.matrix.is_identity() && self.offset.iter().all(|&o| o == 0.0)
    }

    /// True when only the offset is set.
    pub fn is_offset_only(&self) -> bool {
        self.matrix.is_identity()
    }

    /// Same payload applied in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self { direction: self.direction.inverse(), ..self.clone() }
    }

    /// Matrix equivalent to applying `self`, then `next`.
    pub fn compose(&self, next: &MatrixData) -> OpsResult<MatrixData> {
        let (m1, o1) = self.forward()?;
        let (m2, o2) = next.forward()?;
        let m = m2.mul_mat(&m1);
        let t = m2.mul_vec(o1);
        let offset = [t[0] + o2[0], t[1] + o2[1], t[2] + o2[2], t[3] + o2[3]];
        Ok(MatrixData::new(m, offset))
    }

    /// True when `self` followed by `other` is the identity.
    pub fn is_inverse_of(&self, other: &MatrixData) -> bool {
        match self.compose(other) {
            Ok(c) => {
                c.matrix.m.iter().zip(Mat4d::IDENTITY.m.iter()).all(|(a, b)| (a - b).abs() < IDENTITY_TOLERANCE)
                    && c.offset.iter().all(|o| o.abs() < IDENTITY_TOLERANCE)
            }
            Err(_) => false,
        }
    }

    pub(crate) fn write_cache_id(&self, b: CacheIdBuilder) -> CacheIdBuilder {
        b.doubles(&self.matrix.m).doubles(&self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_inverse_forward_equivalent() {
        let m = MatrixData::new(Mat4d::from_diagonal([2.0, 4.0, 0.5, 1.0]), [0.1, 0.2, 0.3, 0.0]);
        let (inv, off) = m.inverse().forward().unwrap();
        assert_abs_diff_eq!(inv.get(0, 0), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(off[0], -0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(off[2], -0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        let m = MatrixData {
            offset: [0.01, -0.02, 0.03, 0.0],
            ..MatrixData::from_rgb([0.6, 0.3, 0.1, 0.2, 0.7, 0.1, 0.05, 0.05, 0.9])
        };
        assert!(m.is_inverse_of(&m.inverse()));
        assert!(!m.is_inverse_of(&m));
    }

    #[test]
    fn test_singular_inverse_fails_validation() {
        let m = MatrixData::scale([1.0, 0.0, 1.0, 1.0]).with_direction(Direction::Inverse);
        assert!(m.validate("MatrixOffsetOp").is_err());
        assert!(MatrixData::scale([1.0, 0.0, 1.0, 1.0]).validate("MatrixOffsetOp").is_ok());
    }

    #[test]
    fn test_compose_order() {
        let scale = MatrixData::scale([2.0, 2.0, 2.0, 1.0]);
        let shift = MatrixData::offset([1.0, 1.0, 1.0, 0.0]);
        // scale then shift: 2x + 1
        let c = scale.compose(&shift).unwrap();
        assert_eq!(c.offset, [1.0, 1.0, 1.0, 0.0]);
        // shift then scale: 2x + 2
        let c = shift.compose(&scale).unwrap();
        assert_eq!(c.offset, [2.0, 2.0, 2.0, 0.0]);
    }
}
