//! 4x4 double-precision matrix for RGBA transforms.
//!
//! Stored **row-major** and applied to **column vectors**, like [`glam`]
//! math but with the storage order color pipelines publish their
//! coefficients in. Products and inverses go through [`glam::DMat4`].
//!
//! ```text
//! | m00 m01 m02 m03 |   | r |
//! | m10 m11 m12 m13 | * | g |
//! | m20 m21 m22 m23 |   | b |
//! | m30 m31 m32 m33 |   | a |
//! ```

use glam::{DMat4, DVec4};

/// A 4x4 matrix of doubles, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4d {
    /// Elements, `m[row * 4 + col]`.
    pub m: [f64; 16],
}

impl Default for Mat4d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4d {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Creates a matrix from row-major elements.
    #[inline]
    pub const fn from_row_major(m: [f64; 16]) -> Self {
        Self { m }
    }

    /// Creates a diagonal (scale) matrix.
    pub fn from_diagonal(d: [f64; 4]) -> Self {
        let mut m = [0.0; 16];
        for i in 0..4 {
            m[i * 5] = d[i];
        }
        Self { m }
    }

    /// Element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row * 4 + col]
    }

    /// Diagonal elements.
    pub fn diagonal(&self) -> [f64; 4] {
        [self.m[0], self.m[5], self.m[10], self.m[15]]
    }

    /// True if all off-diagonal elements are zero.
    pub fn is_diagonal(&self) -> bool {
        (0..16).all(|i| i % 5 == 0 || self.m[i] == 0.0)
    }

    /// True if this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Converts to a column-major [`DMat4`].
    #[inline]
    pub fn to_glam(&self) -> DMat4 {
        DMat4::from_cols_array(&self.m).transpose()
    }

    /// Converts from a column-major [`DMat4`].
    #[inline]
    pub fn from_glam(m: DMat4) -> Self {
        Self { m: m.transpose().to_cols_array() }
    }

    /// Matrix product `self * rhs` (apply `rhs` first).
    pub fn mul_mat(&self, rhs: &Mat4d) -> Mat4d {
        Self::from_glam(self.to_glam() * rhs.to_glam())
    }

    /// Transforms a 4-vector.
    pub fn mul_vec(&self, v: [f64; 4]) -> [f64; 4] {
        (self.to_glam() * DVec4::from_array(v)).to_array()
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Mat4d {
        Self::from_glam(self.to_glam().transpose())
    }

    /// Determinant.
    pub fn determinant(&self) -> f64 {
        self.to_glam().determinant()
    }

    /// Inverse, or `None` when the matrix is singular.
    ///
    /// ```rust
    /// use vfx_math::Mat4d;
    ///
    /// let m = Mat4d::from_diagonal([2.0, 4.0, 0.5, 1.0]);
    /// let inv = m.inverse().unwrap();
    /// assert_eq!(inv.diagonal(), [0.5, 0.25, 2.0, 1.0]);
    ///
    /// assert!(Mat4d::from_diagonal([1.0, 0.0, 1.0, 1.0]).inverse().is_none());
    /// ```
    pub fn inverse(&self) -> Option<Mat4d> {
        let g = self.to_glam();
        let det = g.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = Self::from_glam(g.inverse());
        inv.m.iter().all(|v| v.is_finite()).then_some(inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample() -> Mat4d {
        Mat4d::from_row_major([
            1.0, 0.2, 0.0, 0.0, //
            0.1, 0.9, 0.3, 0.0, //
            0.0, 0.5, 1.2, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    #[test]
    fn test_row_major_application() {
        let m = sample();
        let v = m.mul_vec([1.0, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(v[0], 1.4, epsilon = 1e-12);
        assert_abs_diff_eq!(v[1], 0.1 + 1.8 + 0.9, epsilon = 1e-12);
        assert_abs_diff_eq!(v[3], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = sample();
        let id = m.mul_mat(&m.inverse().unwrap());
        for i in 0..16 {
            assert_abs_diff_eq!(id.m[i], Mat4d::IDENTITY.m[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_predicates() {
        assert!(Mat4d::IDENTITY.is_identity());
        assert!(Mat4d::from_diagonal([2.0, 1.0, 1.0, 1.0]).is_diagonal());
        assert!(!sample().is_diagonal());
    }

    #[test]
    fn test_mul_order() {
        let scale = Mat4d::from_diagonal([2.0, 2.0, 2.0, 1.0]);
        let m = sample();
        let v = [0.3, 0.6, 0.9, 1.0];
        let a = scale.mul_mat(&m).mul_vec(v);
        let b = scale.mul_vec(m.mul_vec(v));
        for i in 0..4 {
            assert_abs_diff_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }
}
