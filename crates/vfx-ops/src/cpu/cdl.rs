//! ASC CDL renderer.
//!
//! ```text
//! forward: slope, offset, [clamp], power, saturation, [clamp]
//! reverse: [clamp], saturation, [clamp], power, offset, slope, [clamp]
//! ```
//!
//! The no-clamp styles leave negative values untouched in the power step.

use crate::data::{CDL_LUMA_WEIGHTS, CdlData};

/// Renderer of a CDL op.
#[derive(Debug, Clone)]
pub struct CdlRenderer {
    slope: [f32; 3],
    offset: [f32; 3],
    power: [f32; 3],
    saturation: f32,
    luma: [f32; 3],
    reverse: bool,
    clamp: bool,
}

impl CdlRenderer {
    pub(crate) fn new(data: &CdlData) -> Self {
        let p = data.render_params();
        Self {
            slope: p.slope.map(|v| v as f32),
            offset: p.offset.map(|v| v as f32),
            power: p.power.map(|v| v as f32),
            saturation: p.saturation as f32,
            luma: CDL_LUMA_WEIGHTS.map(|v| v as f32),
            reverse: p.reverse,
            clamp: p.clamp,
        }
    }

    #[inline]
    fn power(&self, rgb: &mut [f32; 3]) {
        for (v, p) in rgb.iter_mut().zip(self.power) {
            if self.clamp {
                *v = v.clamp(0.0, 1.0).powf(p);
            } else if *v >= 0.0 {
                *v = v.powf(p);
            }
        }
    }

    #[inline]
    fn saturation(&self, rgb: &mut [f32; 3]) {
        let luma = rgb[0] * self.luma[0] + rgb[1] * self.luma[1] + rgb[2] * self.luma[2];
        for v in rgb.iter_mut() {
            *v = luma + self.saturation * (*v - luma);
        }
    }

    #[inline]
    fn clamp_unit(&self, rgb: &mut [f32; 3]) {
        if self.clamp {
            for v in rgb.iter_mut() {
                *v = v.clamp(0.0, 1.0);
            }
        }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let mut rgb = [px[0], px[1], px[2]];
            if self.reverse {
                self.clamp_unit(&mut rgb);
                self.saturation(&mut rgb);
                self.power(&mut rgb);
                for c in 0..3 {
                    rgb[c] = (rgb[c] + self.offset[c]) * self.slope[c];
                }
            } else {
                for c in 0..3 {
                    rgb[c] = rgb[c] * self.slope[c] + self.offset[c];
                }
                self.power(&mut rgb);
                self.saturation(&mut rgb);
            }
            self.clamp_unit(&mut rgb);
            px[..3].copy_from_slice(&rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CdlStyle;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-5;

    fn grade(style: CdlStyle) -> CdlData {
        CdlData::new([1.35, 1.1, 0.71], [0.05, -0.23, 0.11], [0.93, 0.81, 1.27], 1.23, style)
    }

    fn run(data: &CdlData, px: [f32; 4]) -> [f32; 4] {
        let mut px = px;
        CdlRenderer::new(data).apply(&mut px);
        px
    }

    fn reference(x: [f32; 3], clamp: bool) -> [f32; 3] {
        let d = grade(CdlStyle::V12Fwd);
        let mut v = [0.0f32; 3];
        for c in 0..3 {
            let t = x[c] * d.slope[c] as f32 + d.offset[c] as f32;
            v[c] = if clamp { t.clamp(0.0, 1.0).powf(d.power[c] as f32) } else if t >= 0.0 { t.powf(d.power[c] as f32) } else { t };
        }
        let luma = 0.2126 * v[0] + 0.7152 * v[1] + 0.0722 * v[2];
        v.map(|y| {
            let s = luma + 1.23 * (y - luma);
            if clamp { s.clamp(0.0, 1.0) } else { s }
        })
    }

    #[test]
    fn test_forward_styles() {
        let src = [0.4, 0.2, 0.6, 0.5];
        let px = run(&grade(CdlStyle::V12Fwd), src);
        let expected = reference([0.4, 0.2, 0.6], true);
        for c in 0..3 {
            assert_abs_diff_eq!(px[c], expected[c], epsilon = EPSILON);
        }
        assert_eq!(px[3], 0.5);

        let px = run(&grade(CdlStyle::NoClampFwd), [0.4, 0.1, 0.6, 1.0]);
        let expected = reference([0.4, 0.1, 0.6], false);
        for c in 0..3 {
            assert_abs_diff_eq!(px[c], expected[c], epsilon = EPSILON);
        }
        // Green goes negative and skips the power step.
        assert!(px[1] < 0.0);
    }

    #[test]
    fn test_no_clamp_round_trip() {
        let src = [0.4, -0.3, 1.6, 1.0];
        let fwd = run(&grade(CdlStyle::NoClampFwd), src);
        let back = run(&grade(CdlStyle::NoClampRev), fwd);
        for c in 0..4 {
            assert_abs_diff_eq!(back[c], src[c], epsilon = EPSILON);
        }
    }

    #[test]
    fn test_clamping_round_trip_inside_unit_cube() {
        let src = [0.5, 0.45, 0.6, 1.0];
        let fwd = run(&grade(CdlStyle::V12Fwd), src);
        let back = run(&grade(CdlStyle::V12Rev), fwd);
        for c in 0..3 {
            assert_abs_diff_eq!(back[c], src[c], epsilon = 1e-4);
        }
        let px = run(&grade(CdlStyle::V12Fwd), [4.0, -4.0, 0.0, 1.0]);
        assert!(px.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
