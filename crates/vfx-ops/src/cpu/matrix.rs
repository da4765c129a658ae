//! Matrix renderer: `y = M * x + b` with offset-only and diagonal paths.

use crate::OpsResult;
use crate::data::MatrixData;

#[derive(Debug, Clone)]
enum Kind {
    Offset,
    Diagonal([f32; 4]),
    Full([[f32; 4]; 4]),
}

/// Renderer of a matrix op, resolved to the forward direction.
#[derive(Debug, Clone)]
pub struct MatrixRenderer {
    kind: Kind,
    offset: [f32; 4],
}

impl MatrixRenderer {
    pub(crate) fn new(data: &MatrixData) -> OpsResult<Self> {
        let (m, o) = data.forward()?;
        let kind = if m.is_identity() {
            Kind::Offset
        } else if m.is_diagonal() {
            Kind::Diagonal(m.diagonal().map(|v| v as f32))
        } else {
            Kind::Full(std::array::from_fn(|r| std::array::from_fn(|c| m.get(r, c) as f32)))
        };
        Ok(Self { kind, offset: o.map(|v| v as f32) })
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        let o = self.offset;
        match &self.kind {
            Kind::Offset => {
                for px in pixels.chunks_exact_mut(4) {
                    px[0] += o[0];
                    px[1] += o[1];
                    px[2] += o[2];
                    px[3] += o[3];
                }
            }
            Kind::Diagonal(d) => {
                for px in pixels.chunks_exact_mut(4) {
                    px[0] = px[0] * d[0] + o[0];
                    px[1] = px[1] * d[1] + o[1];
                    px[2] = px[2] * d[2] + o[2];
                    px[3] = px[3] * d[3] + o[3];
                }
            }
            Kind::Full(m) => {
                for px in pixels.chunks_exact_mut(4) {
                    let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
                    for (row, out) in m.iter().zip(px.iter_mut()) {
                        *out = row[0] * r + row[1] * g + row[2] * b + row[3] * a;
                    }
                    px[0] += o[0];
                    px[1] += o[1];
                    px[2] += o[2];
                    px[3] += o[3];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use vfx_math::Mat4d;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_paths_agree() {
        let offset = MatrixRenderer::new(&MatrixData::offset([0.1, 0.2, 0.3, 0.0])).unwrap();
        let diag = MatrixRenderer::new(&MatrixData::scale([2.0, 3.0, 4.0, 1.0])).unwrap();
        assert!(matches!(offset.kind, Kind::Offset));
        assert!(matches!(diag.kind, Kind::Diagonal(_)));

        let mut px = [1.0, 1.0, 1.0, 0.5];
        offset.apply(&mut px);
        diag.apply(&mut px);
        assert_abs_diff_eq!(px[0], 2.2, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 3.6, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 5.2, epsilon = EPSILON);
        assert_abs_diff_eq!(px[3], 0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_full_matrix_and_inverse() {
        let m = MatrixData::new(
            Mat4d::from_row_major([
                0.6, 0.3, 0.1, 0.0, //
                0.2, 0.7, 0.1, 0.0, //
                0.0, 0.1, 0.9, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ]),
            [0.01, -0.02, 0.03, 0.0],
        );
        let fwd = MatrixRenderer::new(&m).unwrap();
        let inv = MatrixRenderer::new(&m.inverse()).unwrap();
        let src = [0.2, 0.5, 0.8, 1.0];
        let mut px = src;
        fwd.apply(&mut px);
        assert_abs_diff_eq!(px[0], 0.6 * 0.2 + 0.3 * 0.5 + 0.1 * 0.8 + 0.01, epsilon = EPSILON);
        inv.apply(&mut px);
        for c in 0..4 {
            assert_abs_diff_eq!(px[c], src[c], epsilon = EPSILON);
        }
    }
}
