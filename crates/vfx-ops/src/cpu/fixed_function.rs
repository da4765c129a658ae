//! Fixed-function renderer.
//!
//! # ACES red modifier
//!
//! A quadratic B-spline hue weight centred on red (`f_H`) and a saturation
//! weight (`f_S`) pull red towards a pivot:
//!
//! ```text
//! red' = red + f_H * f_S * (pivot - red) * (1 - scale)
//! ```
//!
//! The 0.3 version then rescales the chroma so hue is preserved. The
//! inverse solves the quadratic in `red` (without `f_S`, as in the ACES
//! inverse transforms).
//!
//! # ACES glow
//!
//! Boosts dark saturated colors by a gain that depends on `YC`, a luma that
//! includes chroma, through a sigmoid of the saturation.
//!
//! # Surround
//!
//! `rgb *= Y^(gamma - 1)`; AP1 luminance for the ACES dark-to-dim styles and
//! Rec.2100 luminance for the REC.2100 styles.

use crate::data::{
    AP1_LUMA, DARK_TO_DIM_GAMMA, DIM_TO_DARK_GAMMA, FixedFunctionData, FixedFunctionStyle, GLOW_03, GLOW_10, Glow,
    HUE_BSPLINE_M, REC2100_LUMA, REC2100_MIN_LUM, RED_MOD_03, RED_MOD_10, RedMod,
};
use crate::hsy::{HsyVariant, hsv_to_rgb, hsy_to_rgb, rgb_to_hsv, rgb_to_hsy};

const SQRT3: f32 = 1.732_050_8;

// ============================================================================
// Red modifier
// ============================================================================

#[inline]
fn max3(rgb: [f32; 3]) -> f32 {
    rgb[0].max(rgb[1]).max(rgb[2])
}

#[inline]
fn min3(rgb: [f32; 3]) -> f32 {
    rgb[0].min(rgb[1]).min(rgb[2])
}

/// `(max - min) / max`, guarded against black and noise.
#[inline]
fn sat_weight(rgb: [f32; 3], noise_limit: f32) -> f32 {
    let (max, min) = (max3(rgb), min3(rgb));
    (max.max(1e-10) - min.max(1e-10)) / max.max(noise_limit)
}

/// Hue weight: 1 at pure red, falling to 0 at `±width / 2`.
#[inline]
fn hue_weight(rgb: [f32; 3], inv_width: f32) -> f32 {
    let a = 2.0 * rgb[0] - (rgb[1] + rgb[2]);
    let b = SQRT3 * (rgb[1] - rgb[2]);
    let knot = (2.0 + b.atan2(a) * inv_width).clamp(0.0, 4.0);
    let j = knot.min(3.0) as usize;
    let t = knot - j as f32;
    let m = &HUE_BSPLINE_M[j];
    m[3] + t * (m[2] + t * (m[1] + t * m[0]))
}

fn red_mod_fwd(mut rgb: [f32; 3], p: &RedMod, restore_hue: bool) -> [f32; 3] {
    let f_h = hue_weight(rgb, p.inv_width);
    let f_s = sat_weight(rgb, p.noise_limit);
    let (max, min) = (max3(rgb), min3(rgb));
    let old_chroma = (max - min).max(1e-10);
    let delta = rgb.map(|v| v - min);

    rgb[0] += f_h * f_s * (p.pivot - rgb[0]) * p.one_minus_scale;
    if restore_hue {
        let new_chroma = max3(rgb) - min;
        rgb = delta.map(|d| min + d * new_chroma / old_chroma);
    }
    rgb
}

fn red_mod_inv(mut rgb: [f32; 3], p: &RedMod, restore_hue: bool) -> [f32; 3] {
    let f_h = hue_weight(rgb, p.inv_width);
    if f_h <= 0.0 {
        return rgb;
    }
    let (max, min) = (max3(rgb), min3(rgb));
    let old_chroma = (max - min).max(1e-10);
    let delta = rgb.map(|v| v - min);
    let min_gb = if restore_hue { min } else { rgb[1].min(rgb[2]) };

    let ka = f_h * p.one_minus_scale - 1.0;
    let kb = rgb[0] - f_h * (p.pivot + min_gb) * p.one_minus_scale;
    let kc = f_h * p.pivot * min_gb * p.one_minus_scale;
    rgb[0] = (-kb - (kb * kb - 4.0 * ka * kc).max(0.0).sqrt()) / (2.0 * ka);

    if restore_hue {
        let new_chroma = max3(rgb) - min;
        rgb = delta.map(|d| min + d * new_chroma / old_chroma);
    }
    rgb
}

// ============================================================================
// Glow
// ============================================================================

/// Luma with a chroma boost.
#[inline]
fn rgb_to_yc(rgb: [f32; 3]) -> f32 {
    let [r, g, b] = rgb;
    let chroma = (b * (b - g) + g * (g - r) + r * (r - b)).max(0.0).sqrt();
    (b + g + r + 1.75 * chroma) / 3.0
}

#[inline]
fn sigmoid_shaper(sat: f32) -> f32 {
    let x = (sat - 0.4) * 5.0;
    let t = (1.0 - 0.5 * x.abs()).max(0.0);
    let sign = if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    };
    0.5 * (1.0 + sign * (1.0 - t * t))
}

fn glow(rgb: [f32; 3], p: &Glow, inverse: bool) -> [f32; 3] {
    let yc = rgb_to_yc(rgb);
    let gain = p.gain * sigmoid_shaper(sat_weight(rgb, 1e-2));
    let out_gain = if yc > 2.0 * p.mid {
        0.0
    } else if inverse {
        if yc > (1.0 + gain) * p.mid * 2.0 / 3.0 {
            gain * (p.mid / yc - 0.5) / (gain * 0.5 - 1.0)
        } else {
            -gain / (1.0 + gain)
        }
    } else if yc > p.mid * 2.0 / 3.0 {
        gain * (p.mid / yc - 0.5)
    } else {
        gain
    };
    rgb.map(|v| v * (1.0 + out_gain))
}

// ============================================================================
// Surround
// ============================================================================

#[inline]
fn surround(rgb: [f32; 3], weights: [f32; 3], min_lum: f32, gamma: f32, abs: bool) -> [f32; 3] {
    let y = weights[0] * rgb[0] + weights[1] * rgb[1] + weights[2] * rgb[2];
    let y = if abs { y.abs() } else { y };
    let scale = y.max(min_lum).powf(gamma - 1.0);
    rgb.map(|v| v * scale)
}

// ============================================================================
// Renderer
// ============================================================================

/// Renderer of a fixed-function op.
#[derive(Debug, Clone)]
pub struct FixedFunctionRenderer {
    style: FixedFunctionStyle,
    /// REC.2100 exponent and luminance floor, direction resolved.
    gamma: f32,
    min_lum: f32,
}

impl FixedFunctionRenderer {
    pub(crate) fn new(data: &FixedFunctionData) -> Self {
        let g = data.params.first().copied().unwrap_or(1.0) as f32;
        let (gamma, min_lum) = match data.style {
            FixedFunctionStyle::Rec2100SurroundInv => (1.0 / g, REC2100_MIN_LUM.powf(g)),
            _ => (g, REC2100_MIN_LUM),
        };
        Self { style: data.style, gamma, min_lum }
    }

    fn eval(&self, rgb: [f32; 3]) -> [f32; 3] {
        use FixedFunctionStyle::*;
        match self.style {
            AcesRedMod03Fwd => red_mod_fwd(rgb, &RED_MOD_03, true),
            AcesRedMod03Inv => red_mod_inv(rgb, &RED_MOD_03, true),
            AcesRedMod10Fwd => red_mod_fwd(rgb, &RED_MOD_10, false),
            AcesRedMod10Inv => red_mod_inv(rgb, &RED_MOD_10, false),
            AcesGlow03Fwd => glow(rgb, &GLOW_03, false),
            AcesGlow03Inv => glow(rgb, &GLOW_03, true),
            AcesGlow10Fwd => glow(rgb, &GLOW_10, false),
            AcesGlow10Inv => glow(rgb, &GLOW_10, true),
            AcesDarkToDim10Fwd => surround(rgb, AP1_LUMA, 1e-10, DARK_TO_DIM_GAMMA, false),
            AcesDarkToDim10Inv => surround(rgb, AP1_LUMA, 1e-10, DIM_TO_DARK_GAMMA, false),
            Rec2100SurroundFwd | Rec2100SurroundInv => {
                surround(rgb, REC2100_LUMA, self.min_lum, self.gamma, true)
            }
            RgbToHsv => rgb_to_hsv(rgb),
            HsvToRgb => hsv_to_rgb(rgb),
            RgbToHsyLin => rgb_to_hsy(rgb, HsyVariant::Lin),
            HsyLinToRgb => hsy_to_rgb(rgb, HsyVariant::Lin),
            RgbToHsyLog => rgb_to_hsy(rgb, HsyVariant::Log),
            HsyLogToRgb => hsy_to_rgb(rgb, HsyVariant::Log),
            RgbToHsyVid => rgb_to_hsy(rgb, HsyVariant::Vid),
            HsyVidToRgb => hsy_to_rgb(rgb, HsyVariant::Vid),
        }
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        for px in pixels.chunks_exact_mut(4) {
            let out = self.eval([px[0], px[1], px[2]]);
            px[..3].copy_from_slice(&out);
        }
    }
}
