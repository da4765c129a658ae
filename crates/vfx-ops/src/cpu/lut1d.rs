//! 1D LUT renderers.
//!
//! Standard LUTs clamp the input to `[0, 1]` and interpolate between the
//! two nearest samples. Half-domain LUTs index the table with the half bit
//! pattern of the input and blend towards the next half away from zero.

use vfx_math::half_edges;

use crate::data::{HueAdjust, InverseLut1D, Lut1DData, Lut1DInterpolation};

/// Renderer of a forward 1D LUT (or a baked fast inverse).
#[derive(Debug, Clone)]
pub struct Lut1DRenderer {
    /// Decoded interleaved RGB samples.
    table: Vec<f32>,
    len: usize,
    half_domain: bool,
    nearest: bool,
    hue_adjust: HueAdjust,
}

impl Lut1DRenderer {
    pub(crate) fn new(data: &Lut1DData) -> Self {
        Self {
            table: data.decoded_values().into_owned(),
            len: data.len(),
            half_domain: data.input_half_domain,
            nearest: data.interpolation.resolved() == Lut1DInterpolation::Nearest,
            hue_adjust: data.hue_adjust,
        }
    }

    #[inline]
    fn sample(&self, i: usize, c: usize) -> f32 {
        self.table[i * 3 + c]
    }

    #[inline]
    fn lookup(&self, x: f32, c: usize) -> f32 {
        if self.half_domain {
            let e = half_edges(x);
            let a = self.sample(e.lower as usize, c);
            if self.nearest {
                return if e.fraction < 0.5 { a } else { self.sample(e.upper as usize, c) };
            }
            let b = self.sample(e.upper as usize, c);
            a + e.fraction * (b - a)
        } else {
            let last = self.len - 1;
            let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
            let pos = x * last as f32;
            if self.nearest {
                return self.sample((pos.round() as usize).min(last), c);
            }
            let lo = (pos.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let t = pos - lo as f32;
            let a = self.sample(lo, c);
            a + t * (self.sample(hi, c) - a)
        }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        if self.len == 0 {
            return;
        }
        for px in pixels.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = [self.lookup(rgb[0], 0), self.lookup(rgb[1], 1), self.lookup(rgb[2], 2)];
            let out = match self.hue_adjust {
                HueAdjust::None => out,
                HueAdjust::Dw3 => restore_hue(rgb, out),
            };
            px[..3].copy_from_slice(&out);
        }
    }
}

/// Renderer of an inverse 1D LUT evaluated by searching the forward table.
#[derive(Debug, Clone)]
pub struct Lut1DInverseRenderer {
    inverse: InverseLut1D,
    hue_adjust: HueAdjust,
}

impl Lut1DInverseRenderer {
    pub(crate) fn new(data: &Lut1DData) -> Self {
        Self { inverse: data.inverse_evaluator(), hue_adjust: data.hue_adjust }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = std::array::from_fn(|c| self.inverse.eval(c, rgb[c]));
            let out = match self.hue_adjust {
                HueAdjust::None => out,
                HueAdjust::Dw3 => restore_hue(rgb, out),
            };
            px[..3].copy_from_slice(&out);
        }
    }
}

/// Moves the middle channel of `out` back to where the middle channel of
/// `input` sat between its min and max.
fn restore_hue(input: [f32; 3], mut out: [f32; 3]) -> [f32; 3] {
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| input[b].total_cmp(&input[a]));
    let [max, mid, min] = order;
    let chroma = input[max] - input[min];
    let factor = if chroma == 0.0 { 0.0 } else { (input[mid] - input[min]) / chroma };
    out[mid] = out[min] + factor * (out[max] - out[min]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn run(r: &Lut1DRenderer, px: [f32; 4]) -> [f32; 4] {
        let mut px = px;
        r.apply(&mut px);
        px
    }

    #[test]
    fn test_linear_and_nearest() {
        let lut = Lut1DData::from_fn(5, |x| [x * x, 2.0 * x, 1.0 - x]);
        let linear = Lut1DRenderer::new(&lut);
        let px = run(&linear, [0.125, 0.5, 2.0, 0.3]);
        // Halfway between samples 0 (0) and 1 (0.0625).
        assert_abs_diff_eq!(px[0], 0.03125, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 0.0, epsilon = EPSILON);
        assert_eq!(px[3], 0.3);

        let nearest = Lut1DRenderer::new(&lut.with_interpolation(Lut1DInterpolation::Nearest));
        let px = run(&nearest, [0.3, f32::NAN, -1.0, 1.0]);
        assert_abs_diff_eq!(px[0], 0.0625, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_half_domain_lookup() {
        let lut = Lut1DData::half_domain_from_fn(|x| [x * 2.0, -x, x]);
        let r = Lut1DRenderer::new(&lut);
        let px = run(&r, [1.5, -3.25, 1000.3, 1.0]);
        assert_abs_diff_eq!(px[0], 3.0, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 3.25, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 1000.3, epsilon = 1e-2);
        // Values beyond the half range clamp to HALF_MAX.
        let px = run(&r, [1e9, 0.0, 0.0, 1.0]);
        assert_abs_diff_eq!(px[0], 2.0 * vfx_math::HALF_MAX, epsilon = 1.0);
    }

    #[test]
    fn test_raw_halfs_are_decoded() {
        // 0x3800 = 0.5, 0x3C00 = 1.0
        let lut = Lut1DData::new(vec![14336.0, 14336.0, 14336.0, 15360.0, 15360.0, 15360.0]).with_raw_halfs(true);
        let r = Lut1DRenderer::new(&lut);
        let px = run(&r, [0.0, 0.5, 1.0, 1.0]);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = EPSILON);
        assert_abs_diff_eq!(px[1], 0.75, epsilon = EPSILON);
        assert_abs_diff_eq!(px[2], 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_hue_adjust_keeps_middle_ratio() {
        let lut = Lut1DData::from_fn(1024, |x| [x.powf(0.5); 3]).with_hue_adjust(HueAdjust::Dw3);
        let r = Lut1DRenderer::new(&lut);
        let src = [0.8, 0.4, 0.2, 1.0];
        let px = run(&r, src);
        let before = (src[1] - src[2]) / (src[0] - src[2]);
        let after = (px[1] - px[2]) / (px[0] - px[2]);
        assert_abs_diff_eq!(before, after, epsilon = EPSILON);
        assert_abs_diff_eq!(px[0], 0.8f32.sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn test_exact_and_fast_inverse_agree() {
        let lut = Lut1DData::from_fn(64, |x| [x.powf(2.2), x.powf(1.8), x]);
        let fwd = Lut1DRenderer::new(&lut);
        let exact = Lut1DInverseRenderer::new(&lut.inverse());
        let fast = Lut1DRenderer::new(&lut.bake_fast_inverse());

        let src = [0.2, 0.55, 0.9, 1.0];
        let mut px = src;
        fwd.apply(&mut px);
        let mut a = px;
        exact.apply(&mut a);
        let mut b = px;
        fast.apply(&mut b);
        for c in 0..3 {
            assert_abs_diff_eq!(a[c], src[c], epsilon = 1e-4);
            assert_abs_diff_eq!(b[c], src[c], epsilon = 1e-3);
        }
    }
}
