//! Fixed-function emitters.
//!
//! The bodies work on three scalars `red`, `grn` and `blu` loaded from the
//! pixel, so the same text is valid in every target including OSL. The HSY
//! conversions are shared with the hue-curve emitter.

use vfx_shader::{ShaderCreator, ShaderText, Syntax};

use super::OpBlock;
use crate::OpsResult;
use crate::data::{
    AP1_LUMA, DARK_TO_DIM_GAMMA, DIM_TO_DARK_GAMMA, FixedFunctionData, FixedFunctionStyle, GLOW_03, GLOW_10,
    Glow, HUE_BSPLINE_M, REC2100_LUMA, REC2100_MIN_LUM, RED_MOD_03, RED_MOD_10, RedMod,
};
use crate::hsy::{HsyVariant, LUMA_B, LUMA_G, LUMA_R};

pub(super) fn fixed_function(d: &FixedFunctionData, creator: &mut ShaderCreator) -> OpsResult<()> {
    use FixedFunctionStyle::*;
    let pix = creator.pixel_name().to_string();
    let mut block = OpBlock::open(creator, &format!("Add FixedFunction '{}' processing", d.style.as_str()));
    let st = block.text();
    match d.style {
        AcesRedMod03Fwd => red_mod_fwd(st, &pix, &RED_MOD_03, true),
        AcesRedMod03Inv => red_mod_inv(st, &pix, &RED_MOD_03, true),
        AcesRedMod10Fwd => red_mod_fwd(st, &pix, &RED_MOD_10, false),
        AcesRedMod10Inv => red_mod_inv(st, &pix, &RED_MOD_10, false),
        AcesGlow03Fwd => glow(st, &pix, &GLOW_03, false),
        AcesGlow03Inv => glow(st, &pix, &GLOW_03, true),
        AcesGlow10Fwd => glow(st, &pix, &GLOW_10, false),
        AcesGlow10Inv => glow(st, &pix, &GLOW_10, true),
        AcesDarkToDim10Fwd => surround(st, &pix, AP1_LUMA, None, DARK_TO_DIM_GAMMA, false),
        AcesDarkToDim10Inv => surround(st, &pix, AP1_LUMA, None, DIM_TO_DARK_GAMMA, false),
        Rec2100SurroundFwd | Rec2100SurroundInv => {
            let g = d.params.first().copied().unwrap_or(1.0) as f32;
            let (gamma, min_lum) = if d.style == Rec2100SurroundInv {
                (1.0 / g, REC2100_MIN_LUM.powf(g))
            } else {
                (g, REC2100_MIN_LUM)
            };
            surround(st, &pix, REC2100_LUMA, Some(min_lum), gamma, true)
        }
        RgbToHsv => rgb_to_hsv(st, &pix),
        HsvToRgb => hsv_to_rgb(st, &pix),
        RgbToHsyLin => emit_rgb_to_hsy(st, &pix, HsyVariant::Lin),
        HsyLinToRgb => emit_hsy_to_rgb(st, &pix, HsyVariant::Lin),
        RgbToHsyLog => emit_rgb_to_hsy(st, &pix, HsyVariant::Log),
        HsyLogToRgb => emit_hsy_to_rgb(st, &pix, HsyVariant::Log),
        RgbToHsyVid => emit_rgb_to_hsy(st, &pix, HsyVariant::Vid),
        HsyVidToRgb => emit_hsy_to_rgb(st, &pix, HsyVariant::Vid),
    }
    block.close(creator)
}

// ============================================================================
// Scalar plumbing
// ============================================================================

/// Declares `float <names> = pix.<c>;` for the three color channels.
fn load(st: &mut ShaderText, pix: &str, names: [&str; 3]) {
    let s = st.syntax();
    for (i, name) in names.iter().enumerate() {
        st.new_line().push(format!("{} = {};", s.float_decl(name), s.pixel_component(pix, i)));
    }
}

/// Writes three expressions back to the color channels.
fn store(st: &mut ShaderText, pix: &str, exprs: [&str; 3]) {
    let s = st.syntax();
    for (i, e) in exprs.iter().enumerate() {
        st.new_line().push(format!("{} = {e};", s.pixel_component(pix, i)));
    }
}

fn decl(st: &mut ShaderText, name: &str, expr: impl std::fmt::Display) {
    let s = st.syntax();
    st.new_line().push(format!("{} = {expr};", s.float_decl(name)));
}

fn min_max(st: &mut ShaderText) {
    decl(st, "rgbMax", "max(red, max(grn, blu))");
    decl(st, "rgbMin", "min(red, min(grn, blu))");
}

/// `f_S`: `(max - min) / max` guarded against black and noise.
fn sat_weight(st: &mut ShaderText, noise_limit: f32) {
    let s = st.syntax();
    decl(
        st,
        "f_S",
        format!("(max(1e-10, rgbMax) - max(1e-10, rgbMin)) / max({}, rgbMax)", s.flt(noise_limit)),
    );
}

// ============================================================================
// ACES
// ============================================================================

/// `f_H`: quadratic B-spline hue weight centred on red.
fn hue_weight(st: &mut ShaderText, inv_width: f32) {
    let s = st.syntax();
    decl(st, "a", "2.0 * red - (grn + blu)");
    decl(st, "b", format!("{} * (grn - blu)", s.flt(3f32.sqrt())));
    decl(st, "hue", s.atan2("b", "a"));
    decl(st, "knot", format!("clamp(2.0 + hue * {}, 0.0, 4.0)", s.flt(inv_width)));
    decl(st, "f_H", "0.0");
    for (j, m) in HUE_BSPLINE_M.iter().enumerate() {
        let cond = match j {
            0 => "if (knot < 1.0)".to_string(),
            3 => "else".to_string(),
            _ => format!("else if (knot < {})", s.flt(j as f32 + 1.0)),
        };
        st.line(cond);
        st.line("{");
        st.indent();
        decl(st, "t", format!("knot - {}", s.flt(j as f32)));
        st.new_line().push(format!(
            "f_H = (({} * t + {}) * t + {}) * t + {};",
            s.flt(m[0]),
            s.flt(m[1]),
            s.flt(m[2]),
            s.flt(m[3])
        ));
        st.dedent();
        st.line("}");
    }
}

/// Rescales the chroma so the hue of the input is kept.
fn restore_hue(st: &mut ShaderText) {
    decl(st, "newChroma", "max(red, max(grn, blu)) - rgbMin");
    decl(st, "chromaScale", "newChroma / oldChroma");
    st.line("red = rgbMin + dr * chromaScale;");
    st.line("grn = rgbMin + dg * chromaScale;");
    st.line("blu = rgbMin + db * chromaScale;");
}

fn chroma_deltas(st: &mut ShaderText) {
    decl(st, "oldChroma", "max(1e-10, rgbMax - rgbMin)");
    decl(st, "dr", "red - rgbMin");
    decl(st, "dg", "grn - rgbMin");
    decl(st, "db", "blu - rgbMin");
}

fn red_mod_fwd(st: &mut ShaderText, pix: &str, p: &RedMod, restore: bool) {
    let s = st.syntax();
    load(st, pix, ["red", "grn", "blu"]);
    hue_weight(st, p.inv_width);
    min_max(st);
    sat_weight(st, p.noise_limit);
    chroma_deltas(st);
    st.new_line().push(format!(
        "red = red + f_H * f_S * ({} - red) * {};",
        s.flt(p.pivot),
        s.flt(p.one_minus_scale)
    ));
    if restore {
        restore_hue(st);
    }
    store(st, pix, ["red", "grn", "blu"]);
}

fn red_mod_inv(st: &mut ShaderText, pix: &str, p: &RedMod, restore: bool) {
    let s = st.syntax();
    let (pivot, oms) = (s.flt(p.pivot), s.flt(p.one_minus_scale));
    load(st, pix, ["red", "grn", "blu"]);
    hue_weight(st, p.inv_width);
    st.line("if (f_H > 0.0)");
    st.line("{");
    st.indent();
    min_max(st);
    chroma_deltas(st);
    decl(st, "minGB", if restore { "rgbMin" } else { "min(grn, blu)" });
    decl(st, "ka", format!("f_H * {oms} - 1.0"));
    decl(st, "kb", format!("red - f_H * ({pivot} + minGB) * {oms}"));
    decl(st, "kc", format!("f_H * {pivot} * minGB * {oms}"));
    st.line("red = (-kb - sqrt(max(0.0, kb * kb - 4.0 * ka * kc))) / (2.0 * ka);");
    if restore {
        restore_hue(st);
    }
    store(st, pix, ["red", "grn", "blu"]);
    st.dedent();
    st.line("}");
}

fn glow(st: &mut ShaderText, pix: &str, p: &Glow, inverse: bool) {
    let s = st.syntax();
    let mid = s.flt(p.mid);
    load(st, pix, ["red", "grn", "blu"]);
    decl(st, "chroma", "sqrt(max(0.0, blu * (blu - grn) + grn * (grn - red) + red * (red - blu)))");
    decl(st, "YC", "(blu + grn + red + 1.75 * chroma) / 3.0");
    min_max(st);
    sat_weight(st, 1e-2);
    decl(st, "x", "(f_S - 0.4) * 5.0");
    decl(st, "t", "max(0.0, 1.0 - 0.5 * abs(x))");
    decl(st, "shaper", "0.5 * (1.0 + sign(x) * (1.0 - t * t))");
    decl(st, "glowGain", format!("{} * shaper", s.flt(p.gain)));
    if inverse {
        decl(st, "glowGainOut", "-glowGain / (1.0 + glowGain)");
        st.line(format!("if (YC > 2.0 * {mid})"));
        st.line("{");
        st.line("  glowGainOut = 0.0;");
        st.line("}");
        st.line(format!("else if (YC > (1.0 + glowGain) * {mid} * 2.0 / 3.0)"));
        st.line("{");
        st.line(format!("  glowGainOut = glowGain * ({mid} / YC - 0.5) / (glowGain * 0.5 - 1.0);"));
        st.line("}");
    } else {
        decl(st, "glowGainOut", "glowGain");
        st.line(format!("if (YC > 2.0 * {mid})"));
        st.line("{");
        st.line("  glowGainOut = 0.0;");
        st.line("}");
        st.line(format!("else if (YC > {mid} * 2.0 / 3.0)"));
        st.line("{");
        st.line(format!("  glowGainOut = glowGain * ({mid} / YC - 0.5);"));
        st.line("}");
    }
    store(st, pix, ["red * (1.0 + glowGainOut)", "grn * (1.0 + glowGainOut)", "blu * (1.0 + glowGainOut)"]);
}

/// `rgb *= Y^(gamma - 1)`. `min_lum` of `None` is the ACES `1e-10` floor.
fn surround(st: &mut ShaderText, pix: &str, w: [f32; 3], min_lum: Option<f32>, gamma: f32, abs: bool) {
    let s = st.syntax();
    load(st, pix, ["red", "grn", "blu"]);
    let y = format!("{} * red + {} * grn + {} * blu", s.flt(w[0]), s.flt(w[1]), s.flt(w[2]));
    let y = if abs { format!("abs({y})") } else { y };
    let floor = min_lum.map_or_else(|| "1e-10".to_string(), |v| s.flt(v));
    decl(st, "Y", format!("max({floor}, {y})"));
    decl(st, "Ypow_over_Y", format!("pow(Y, {})", s.flt(gamma - 1.0)));
    store(st, pix, ["red * Ypow_over_Y", "grn * Ypow_over_Y", "blu * Ypow_over_Y"]);
}

// ============================================================================
// HSV
// ============================================================================

fn rgb_to_hsv(st: &mut ShaderText, pix: &str) {
    load(st, pix, ["red", "grn", "blu"]);
    min_max(st);
    decl(st, "val", "rgbMax");
    decl(st, "sat", "0.0");
    decl(st, "hue", "0.0");
    st.line("if (rgbMin != rgbMax)");
    st.line("{");
    st.indent();
    decl(st, "delta", "rgbMax - rgbMin");
    st.line("if (rgbMax != 0.0)");
    st.line("{");
    st.line("  sat = delta / rgbMax;");
    st.line("}");
    st.line("if (red == rgbMax)");
    st.line("{");
    st.line("  hue = (grn - blu) / delta;");
    st.line("}");
    st.line("else if (grn == rgbMax)");
    st.line("{");
    st.line("  hue = 2.0 + (blu - red) / delta;");
    st.line("}");
    st.line("else");
    st.line("{");
    st.line("  hue = 4.0 + (red - grn) / delta;");
    st.line("}");
    st.line("if (hue < 0.0)");
    st.line("{");
    st.line("  hue = hue + 6.0;");
    st.line("}");
    st.line("hue = hue / 6.0;");
    st.dedent();
    st.line("}");
    st.line("if (rgbMin < 0.0)");
    st.line("{");
    st.line("  val = val + rgbMin;");
    st.line("}");
    st.line("if (-rgbMin > rgbMax)");
    st.line("{");
    st.line("  sat = (rgbMax - rgbMin) / -rgbMin;");
    st.line("}");
    store(st, pix, ["hue", "sat", "val"]);
}

/// Pure hue in `[0, 1]^3` from `hue` scaled to `[0, 6)`.
fn hue_to_rgb(st: &mut ShaderText) {
    decl(st, "red", "clamp(abs(hue - 3.0) - 1.0, 0.0, 1.0)");
    decl(st, "grn", "clamp(2.0 - abs(hue - 2.0), 0.0, 1.0)");
    decl(st, "blu", "clamp(2.0 - abs(hue - 4.0), 0.0, 1.0)");
}

fn hsv_to_rgb(st: &mut ShaderText, pix: &str) {
    let s = st.syntax();
    decl(st, "hue", s.pixel_component(pix, 0));
    st.line("hue = (hue - floor(hue)) * 6.0;");
    decl(st, "sat", format!("clamp({}, 0.0, 1.999)", s.pixel_component(pix, 1)));
    decl(st, "val", s.pixel_component(pix, 2));
    hue_to_rgb(st);
    decl(st, "rgbMax", "val");
    decl(st, "rgbMin", "val * (1.0 - sat)");
    st.line("if (sat > 1.0)");
    st.line("{");
    st.line("  rgbMin = val * (1.0 - sat) / (2.0 - sat);");
    st.line("  rgbMax = val - rgbMin;");
    st.line("}");
    st.line("if (val < 0.0)");
    st.line("{");
    st.line("  rgbMin = val / (2.0 - sat);");
    st.line("  rgbMax = val - rgbMin;");
    st.line("}");
    decl(st, "delta", "rgbMax - rgbMin");
    store(st, pix, ["red * delta + rgbMin", "grn * delta + rgbMin", "blu * delta + rgbMin"]);
}

// ============================================================================
// HSY
// ============================================================================

const LIN_SAT_K: f32 = 0.15;
const LIN_SAT_LO_GAIN: f32 = 5.0;
const LIN_SAT_MAX_LUM: f32 = 0.01;
const LIN_SAT_MIN_LUM: f32 = LIN_SAT_MAX_LUM * 0.1;
const LIN_SAT_SCALE: f32 = 1.4;

fn luma_expr(s: &Syntax, r: &str, g: &str, b: &str) -> String {
    format!("{} * {r} + {} * {g} + {} * {b}", s.flt(LUMA_R), s.flt(LUMA_G), s.flt(LUMA_B))
}

fn lin_sat_alpha(st: &mut ShaderText) {
    let s = st.syntax();
    decl(
        st,
        "alpha",
        format!(
            "clamp((luma - {}) / {}, 0.0, 1.0)",
            s.flt(LIN_SAT_MIN_LUM),
            s.flt(LIN_SAT_MAX_LUM - LIN_SAT_MIN_LUM)
        ),
    );
}

/// RGB to HSY on the pixel, in its own scope.
pub(super) fn emit_rgb_to_hsy(st: &mut ShaderText, pix: &str, variant: HsyVariant) {
    let s = st.syntax();
    st.line("{");
    st.indent();
    load(st, pix, ["red", "grn", "blu"]);
    min_max(st);
    decl(st, "luma", luma_expr(&s, "red", "grn", "blu"));
    decl(st, "dist", "abs(red - luma) + abs(grn - luma) + abs(blu - luma)");
    match variant {
        HsyVariant::Lin => {
            decl(st, "sumRGB", "red + grn + blu");
            decl(st, "satHi", format!("dist / max(0.07 * dist + 1e-6, {} + sumRGB)", s.flt(LIN_SAT_K)));
            decl(st, "satLo", format!("dist * {}", s.flt(LIN_SAT_LO_GAIN)));
            lin_sat_alpha(st);
            decl(st, "sat", format!("(satLo + alpha * (satHi - satLo)) * {}", s.flt(LIN_SAT_SCALE)));
        }
        HsyVariant::Log => decl(st, "sat", "dist * 4.0"),
        HsyVariant::Vid => decl(st, "sat", "dist * 1.25"),
    }
    decl(st, "hue", "0.0");
    st.line("if (rgbMin != rgbMax)");
    st.line("{");
    st.indent();
    decl(st, "delta", "rgbMax - rgbMin");
    st.line("if (red == rgbMax)");
    st.line("{");
    st.line("  hue = 1.0 + (grn - blu) / delta;");
    st.line("}");
    st.line("else if (grn == rgbMax)");
    st.line("{");
    st.line("  hue = 3.0 + (blu - red) / delta;");
    st.line("}");
    st.line("else");
    st.line("{");
    st.line("  hue = 5.0 + (red - grn) / delta;");
    st.line("}");
    st.dedent();
    st.line("}");
    st.line("hue = hue / 6.0;");
    st.line("if (luma < 0.0)");
    st.line("{");
    st.line("  hue = hue + 0.5;");
    st.line("  hue = hue - floor(hue);");
    st.line("}");
    store(st, pix, ["hue", "sat", "luma"]);
    st.dedent();
    st.line("}");
}

/// HSY to RGB on the pixel, in its own scope.
pub(super) fn emit_hsy_to_rgb(st: &mut ShaderText, pix: &str, variant: HsyVariant) {
    let s = st.syntax();
    st.line("{");
    st.indent();
    decl(st, "hue", format!("{} - {}", s.pixel_component(pix, 0), s.flt(1.0 / 6.0)));
    decl(st, "sat", s.pixel_component(pix, 1));
    decl(st, "luma", s.pixel_component(pix, 2));
    st.line("if (luma < 0.0)");
    st.line("{");
    st.line("  hue = hue + 0.5;");
    st.line("}");
    st.line("hue = (hue - floor(hue)) * 6.0;");
    hue_to_rgb(st);
    decl(st, "scale", format!("luma / ({})", luma_expr(&s, "red", "grn", "blu")));
    st.line("red = red * scale;");
    st.line("grn = grn * scale;");
    st.line("blu = blu * scale;");
    decl(st, "dist", "abs(red - luma) + abs(grn - luma) + abs(blu - luma)");
    match variant {
        HsyVariant::Lin => {
            let k = s.flt(LIN_SAT_K);
            let lo = s.flt(LIN_SAT_LO_GAIN);
            decl(st, "sumRGB", "red + grn + blu");
            decl(st, "satS", format!("sat / {}", s.flt(LIN_SAT_SCALE)));
            lin_sat_alpha(st);
            decl(st, "gain", "0.0");
            st.line("if (alpha == 1.0)");
            st.line("{");
            st.indent();
            decl(st, "tmp", "max(-satS * sumRGB + satS * 3.0 * luma + dist, 1e-6)");
            st.line(format!("gain = min(satS * ({k} + 3.0 * luma) / tmp, 50.0);"));
            st.dedent();
            st.line("}");
            st.line("else if (alpha == 0.0)");
            st.line("{");
            st.line(format!("  gain = satS / max(dist * {lo}, 1e-10);"));
            st.line("}");
            st.line("else");
            st.line("{");
            st.indent();
            decl(st, "qa", format!("dist * {lo} * (1.0 - alpha) * (sumRGB - 3.0 * luma)"));
            decl(
                st,
                "qb",
                format!("dist * {lo} * (1.0 - alpha) * ({k} + 3.0 * luma) + dist * alpha - satS * (sumRGB - 3.0 * luma)"),
            );
            decl(st, "qc", format!("-satS * ({k} + 3.0 * luma)"));
            decl(st, "discrim", "sqrt(qb * qb - 4.0 * qa * qc)");
            decl(st, "denom", "-discrim - qb");
            st.line("gain = (2.0 * qc) / denom;");
            st.line("if (gain < 0.0)");
            st.line("{");
            st.line("  gain = (2.0 * qc) / (denom + discrim * 2.0);");
            st.line("}");
            st.dedent();
            st.line("}");
        }
        HsyVariant::Log => decl(st, "gain", "sat / max(dist * 4.0, 1e-10)"),
        HsyVariant::Vid => decl(st, "gain", "sat / max(dist * 1.25, 1e-10)"),
    }
    store(st, pix, ["luma + (red - luma) * gain", "luma + (grn - luma) * gain", "luma + (blu - luma) * gain"]);
    st.dedent();
    st.line("}");
}
