//! 3D LUT renderer.

use crate::data::{Lut3DData, Lut3DInterpolation};
use crate::optimizer::LutInverseStyle;

/// Renderer of a 3D LUT. Inverse LUTs are baked to a forward grid when the
/// renderer is built.
#[derive(Debug, Clone)]
pub struct Lut3DRenderer {
    lut: Lut3DData,
    tetrahedral: bool,
}

impl Lut3DRenderer {
    pub(crate) fn new(data: &Lut3DData, inverse_style: LutInverseStyle) -> Self {
        let lut = data.resolved_forward(inverse_style).into_owned();
        let tetrahedral = lut.interpolation.resolved() == Lut3DInterpolation::Tetrahedral;
        Self { lut, tetrahedral }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = if self.tetrahedral { self.lut.eval_tetrahedral(rgb) } else { self.lut.eval_trilinear(rgb) };
            px[..3].copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn warm(rgb: [f32; 3]) -> [f32; 3] {
        [rgb[0].powf(0.8), rgb[1] * 0.95, rgb[2] * 0.9 + 0.05 * rgb[0]]
    }

    #[test]
    fn test_forward_keeps_alpha() {
        let lut = Lut3DData::from_fn(9, warm).with_interpolation(Lut3DInterpolation::Tetrahedral);
        let r = Lut3DRenderer::new(&lut, LutInverseStyle::Exact);
        let mut px = [1.0, 0.5, 0.0, 0.25];
        r.apply(&mut px);
        assert_abs_diff_eq!(px[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.475, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.05, epsilon = 1e-6);
        assert_eq!(px[3], 0.25);
    }

    #[test]
    fn test_inverse_styles_round_trip() {
        let lut = Lut3DData::from_fn(17, warm).with_interpolation(Lut3DInterpolation::Tetrahedral);
        let fwd = Lut3DRenderer::new(&lut, LutInverseStyle::Exact);
        let src = [0.3, 0.6, 0.4, 1.0];
        let mut px = src;
        fwd.apply(&mut px);
        for (style, tolerance) in [(LutInverseStyle::Exact, 2e-3), (LutInverseStyle::Fast, 1e-2)] {
            let inv = Lut3DRenderer::new(&lut.inverse(), style);
            let mut back = px;
            inv.apply(&mut back);
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], src[c], epsilon = tolerance);
            }
        }
    }
}
