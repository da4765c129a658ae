//! Grading curve renderers.
//!
//! Static ops pack their curves once. Dynamic ops keep the shared slot and
//! read its packed curves on every apply, so a curve edit shows up on the
//! next call without rebuilding the processor.

use crate::curve::KnotsCoefs;
use crate::curve::linlog::{lin_to_log, log_to_lin};
use crate::data::{
    DynamicHueCurve, DynamicRgbCurve, GradingStyle, HueCurveData, RgbCurveData, curve_index,
};
use crate::dynamic::CurveSet;
use crate::hsy::{HsyVariant, hsy_to_rgb, rgb_to_hsy};
use crate::meta::Direction;
use crate::OpsResult;

#[derive(Debug, Clone)]
enum Source<S> {
    Static(KnotsCoefs),
    Dynamic(S),
}

// ============================================================================
// RGB curves
// ============================================================================

/// Renderer of a grading RGB curve op.
#[derive(Debug, Clone)]
pub struct RgbCurveRenderer {
    source: Source<DynamicRgbCurve>,
    forward: bool,
    lin_log: bool,
}

impl RgbCurveRenderer {
    pub(crate) fn new(data: &RgbCurveData) -> OpsResult<Self> {
        let source = match (&data.slot, data.dynamic) {
            (Some(slot), true) => Source::Dynamic(slot.clone()),
            _ => Source::Static(data.curves.pack()?),
        };
        Ok(Self {
            source,
            forward: data.direction == Direction::Forward,
            lin_log: data.uses_lin_log(),
        })
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        match &self.source {
            Source::Static(kc) => self.apply_with(kc, pixels),
            Source::Dynamic(slot) => slot.with_knots_coefs(|kc| self.apply_with(kc, pixels)),
        }
    }

    fn apply_with(&self, kc: &KnotsCoefs, pixels: &mut [f32]) {
        if kc.is_identity() {
            return;
        }
        for px in pixels.chunks_exact_mut(4) {
            let mut rgb = [px[0], px[1], px[2]];
            if self.lin_log {
                rgb = rgb.map(lin_to_log);
            }
            if self.forward {
                for (c, v) in rgb.iter_mut().enumerate() {
                    *v = kc.eval(3, kc.eval(c, *v));
                }
            } else {
                for (c, v) in rgb.iter_mut().enumerate() {
                    *v = kc.eval_rev(c, kc.eval_rev(3, *v));
                }
            }
            if self.lin_log {
                rgb = rgb.map(log_to_lin);
            }
            px[..3].copy_from_slice(&rgb);
        }
    }
}

// ============================================================================
// Hue curves
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HueMode {
    Forward,
    Reverse,
    Draw,
}

/// Renderer of a grading hue curve op.
#[derive(Debug, Clone)]
pub struct HueCurveRenderer {
    source: Source<DynamicHueCurve>,
    mode: HueMode,
    variant: HsyVariant,
    bypass_hsy: bool,
    linear: bool,
}

impl HueCurveRenderer {
    pub(crate) fn new(data: &HueCurveData) -> OpsResult<Self> {
        let source = match (&data.slot, data.dynamic) {
            (Some(slot), true) => Source::Dynamic(slot.clone()),
            _ => Source::Static(data.curves.pack()?),
        };
        let mode = match (data.draw_curve_only, data.direction) {
            (true, _) => HueMode::Draw,
            (false, Direction::Forward) => HueMode::Forward,
            (false, Direction::Inverse) => HueMode::Reverse,
        };
        Ok(Self {
            source,
            mode,
            variant: data.hsy_variant(),
            bypass_hsy: data.bypass_rgb_to_hsy,
            linear: data.style == GradingStyle::Lin,
        })
    }

    pub(crate) fn apply(&self, pixels: &mut [f32]) {
        match &self.source {
            Source::Static(kc) => self.apply_with(kc, pixels),
            Source::Dynamic(slot) => slot.with_knots_coefs(|kc| self.apply_with(kc, pixels)),
        }
    }

    fn apply_with(&self, kc: &KnotsCoefs, pixels: &mut [f32]) {
        if kc.is_identity() {
            return;
        }
        for px in pixels.chunks_exact_mut(4) {
            let rgb = [px[0], px[1], px[2]];
            let out = match self.mode {
                HueMode::Draw => rgb.map(|v| kc.eval_or(curve_index::HUE_SAT, v, 1.0)),
                HueMode::Forward => self.to_rgb(self.forward(kc, self.to_hsy(rgb))),
                HueMode::Reverse => self.to_rgb(self.reverse(kc, self.to_hsy(rgb))),
            };
            px[..3].copy_from_slice(&out);
        }
    }

    #[inline]
    fn to_hsy(&self, rgb: [f32; 3]) -> [f32; 3] {
        if self.bypass_hsy { rgb } else { rgb_to_hsy(rgb, self.variant) }
    }

    #[inline]
    fn to_rgb(&self, hsy: [f32; 3]) -> [f32; 3] {
        if self.bypass_hsy { hsy } else { hsy_to_rgb(hsy, self.variant) }
    }

    #[inline]
    fn lin_to_log(&self, y: f32) -> f32 {
        if self.linear { lin_to_log(y) } else { y }
    }

    #[inline]
    fn log_to_lin(&self, y: f32) -> f32 {
        if self.linear { log_to_lin(y) } else { y }
    }

    fn forward(&self, kc: &KnotsCoefs, [mut h, mut s, y]: [f32; 3]) -> [f32; 3] {
        use curve_index::*;

        let mut y = self.lin_to_log(y);

        let hue_sat_gain = kc.eval_or(HUE_SAT, h, 1.0).max(0.0);
        let mut hue_lum_gain = kc.eval_or(HUE_LUM, h, 1.0).max(0.0);

        h = kc.eval(HUE_HUE, h);

        s = kc.eval(SAT_SAT, s).max(0.0);
        let lum_sat_gain = kc.eval_or(LUM_SAT, y, 1.0).max(0.0);
        s *= lum_sat_gain * hue_sat_gain;

        let sat_lum_gain = kc.eval_or(SAT_LUM, s, 1.0).max(0.0);

        y = kc.eval(LUM_LUM, y);
        y = self.log_to_lin(y);

        // Luma gain fades out towards neutral colors.
        hue_lum_gain = 1.0 - (1.0 - hue_lum_gain) * s.min(1.0);
        if self.linear {
            y *= hue_lum_gain * sat_lum_gain;
        } else {
            y += (hue_lum_gain + sat_lum_gain - 2.0) * 0.1;
        }

        h -= h.floor();
        h += kc.eval_or(HUE_FX, h, 0.0);

        [h, s, y]
    }

    fn reverse(&self, kc: &KnotsCoefs, [mut h, mut s, mut y]: [f32; 3]) -> [f32; 3] {
        use curve_index::*;

        h = kc.eval_rev_hue_fx(HUE_FX, h);
        h = kc.eval_rev_hue(HUE_HUE, h);
        h -= h.floor();

        let hue_sat_gain = kc.eval_or(HUE_SAT, h, 1.0).max(0.0);
        let mut hue_lum_gain = kc.eval_or(HUE_LUM, h, 1.0).max(0.0);

        s = s.max(0.0);
        let sat_lum_gain = kc.eval_or(SAT_LUM, s, 1.0).max(0.0);

        hue_lum_gain = 1.0 - (1.0 - hue_lum_gain) * s.min(1.0);
        if self.linear {
            y /= (hue_lum_gain * sat_lum_gain).max(0.01);
        } else {
            y -= (hue_lum_gain + sat_lum_gain - 2.0) * 0.1;
        }

        y = self.lin_to_log(y);
        y = kc.eval_rev(LUM_LUM, y);
        let lum_sat_gain = kc.eval_or(LUM_SAT, y, 1.0).max(0.0);
        y = self.log_to_lin(y);

        s /= (lum_sat_gain * hue_sat_gain).max(0.01);
        s = kc.eval_rev(SAT_SAT, s).max(0.0);

        [h, s, y]
    }
}
