//! Hue/saturation color models used by the hue-curve op and the fixed
//! functions.
//!
//! # HSY
//!
//! Hue, saturation and Rec.709 luma. Hue is rotated so magenta sits at 0,
//! which keeps the interesting hues away from the wrap point of a curve
//! editor. The saturation measure depends on the working space:
//!
//! - [`HsyVariant::Lin`] - blends a low-light and a high-light measure for scene-linear data
//! - [`HsyVariant::Log`] - `4 * dist`
//! - [`HsyVariant::Vid`] - `1.25 * dist`
//!
//! where `dist` is the L1 distance of RGB from its luma.
//!
//! # HSV
//!
//! Classic hexcone HSV, extended so negative values survive a round trip:
//! a negative minimum lowers the value and raises saturation above 1.

/// Rec.709 luma weight of red.
pub const LUMA_R: f32 = 0.2126;
/// Rec.709 luma weight of green.
pub const LUMA_G: f32 = 0.7152;
/// Rec.709 luma weight of blue.
pub const LUMA_B: f32 = 0.0722;

/// Working space an HSY conversion is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HsyVariant {
    /// Scene-linear.
    Lin,
    /// Log-encoded.
    Log,
    /// Video (display-referred).
    Vid,
}

// ============================================================================
// HSY
// ============================================================================

mod lin_sat {
    pub const K: f32 = 0.15;
    pub const LO_GAIN: f32 = 5.0;
    pub const MAX_LUM: f32 = 0.01;
    pub const MIN_LUM: f32 = MAX_LUM * 0.1;
    pub const SCALE: f32 = 1.4;
}

#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

#[inline]
fn lin_sat_alpha(luma: f32) -> f32 {
    use lin_sat::*;
    ((luma - MIN_LUM) / (MAX_LUM - MIN_LUM)).clamp(0.0, 1.0)
}

/// RGB to hue, saturation, luma.
pub fn rgb_to_hsy(rgb: [f32; 3], variant: HsyVariant) -> [f32; 3] {
    let [red, grn, blu] = rgb;
    let rgb_min = red.min(grn).min(blu);
    let rgb_max = red.max(grn).max(blu);
    let y = luma(red, grn, blu);

    let dist = (red - y).abs() + (grn - y).abs() + (blu - y).abs();
    let sat = match variant {
        HsyVariant::Lin => {
            use lin_sat::*;
            let sum = red + grn + blu;
            let sat_hi = dist / (0.07 * dist + 1e-6).max(K + sum);
            let sat_lo = dist * LO_GAIN;
            let alpha = lin_sat_alpha(y);
            (sat_lo + alpha * (sat_hi - sat_lo)) * SCALE
        }
        HsyVariant::Log => dist * 4.0,
        HsyVariant::Vid => dist * 1.25,
    };

    let mut hue = if rgb_min != rgb_max {
        let delta = rgb_max - rgb_min;
        if red == rgb_max {
            1.0 + (grn - blu) / delta
        } else if grn == rgb_max {
            3.0 + (blu - red) / delta
        } else {
            5.0 + (red - grn) / delta
        }
    } else {
        0.0
    } / 6.0;

    if y < 0.0 {
        hue += 0.5;
        hue -= hue.floor();
    }

    [hue, sat, y]
}

/// Hue, saturation, luma back to RGB.
pub fn hsy_to_rgb(hsy: [f32; 3], variant: HsyVariant) -> [f32; 3] {
    let [h, sat, y] = hsy;

    let mut hue = h - 1.0 / 6.0;
    if y < 0.0 {
        hue += 0.5;
    }
    hue = (hue - hue.floor()) * 6.0;

    let red = ((hue - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let grn = (2.0 - (hue - 2.0).abs()).clamp(0.0, 1.0);
    let blu = (2.0 - (hue - 4.0).abs()).clamp(0.0, 1.0);

    // Scale the pure hue to the target luma; its luma is never below LUMA_B.
    let scale = y / luma(red, grn, blu);
    let (red, grn, blu) = (red * scale, grn * scale, blu * scale);

    let dist = (red - y).abs() + (grn - y).abs() + (blu - y).abs();
    let gain = match variant {
        HsyVariant::Lin => lin_inv_sat_gain(sat, y, dist, red + grn + blu),
        HsyVariant::Log => sat / (dist * 4.0).max(1e-10),
        HsyVariant::Vid => sat / (dist * 1.25).max(1e-10),
    };

    [y + (red - y) * gain, y + (grn - y) * gain, y + (blu - y) * gain]
}

/// Gain that brings the linear-style saturation of the scaled pure hue to `sat`.
fn lin_inv_sat_gain(sat: f32, y: f32, dist: f32, sum: f32) -> f32 {
    use lin_sat::*;

    let sat = sat / SCALE;
    let alpha = lin_sat_alpha(y);

    if alpha == 1.0 {
        let tmp = (-sat * sum + sat * 3.0 * y + dist).max(1e-6);
        (sat * (K + 3.0 * y) / tmp).min(50.0)
    } else if alpha == 0.0 {
        sat / (dist * LO_GAIN).max(1e-10)
    } else {
        // Quadratic in the gain when both measures contribute.
        let a = dist * LO_GAIN * (1.0 - alpha) * (sum - 3.0 * y);
        let b = dist * LO_GAIN * (1.0 - alpha) * (K + 3.0 * y) + dist * alpha - sat * (sum - 3.0 * y);
        let c = -sat * (K + 3.0 * y);
        let discrim = (b * b - 4.0 * a * c).sqrt();
        let denom = -discrim - b;
        let gain = (2.0 * c) / denom;
        if gain >= 0.0 { gain } else { (2.0 * c) / (denom + discrim * 2.0) }
    }
}

// ============================================================================
// HSV
// ============================================================================

/// RGB to hue, saturation, value.
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [red, grn, blu] = rgb;
    let rgb_min = red.min(grn).min(blu);
    let rgb_max = red.max(grn).max(blu);

    let mut val = rgb_max;
    let mut sat = 0.0;
    let mut hue = 0.0;

    if rgb_min != rgb_max {
        let delta = rgb_max - rgb_min;
        if rgb_max != 0.0 {
            sat = delta / rgb_max;
        }
        hue = if red == rgb_max {
            (grn - blu) / delta
        } else if grn == rgb_max {
            2.0 + (blu - red) / delta
        } else {
            4.0 + (red - grn) / delta
        };
        if hue < 0.0 {
            hue += 6.0;
        }
        hue /= 6.0;
    }

    // Extended range: a negative minimum moves into value and saturation.
    if rgb_min < 0.0 {
        val += rgb_min;
    }
    if -rgb_min > rgb_max {
        sat = (rgb_max - rgb_min) / -rgb_min;
    }

    [hue, sat, val]
}

/// Hue, saturation, value back to RGB.
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    const MAX_SAT: f32 = 1.999;

    let hue = (hsv[0] - hsv[0].floor()) * 6.0;
    let sat = hsv[1].clamp(0.0, MAX_SAT);
    let val = hsv[2];

    let red = ((hue - 3.0).abs() - 1.0).clamp(0.0, 1.0);
    let grn = (2.0 - (hue - 2.0).abs()).clamp(0.0, 1.0);
    let blu = (2.0 - (hue - 4.0).abs()).clamp(0.0, 1.0);

    let mut max = val;
    let mut min = val * (1.0 - sat);
    if sat > 1.0 {
        min = val * (1.0 - sat) / (2.0 - sat);
        max = val - min;
    }
    if val < 0.0 {
        min = val / (2.0 - sat);
        max = val - min;
    }

    let delta = max - min;
    [red * delta + min, grn * delta + min, blu * delta + min]
}
