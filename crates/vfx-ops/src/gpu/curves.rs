//! Grading RGB and hue curve emitters.
//!
//! The curves of one op are packed into flat knot and coefficient arrays
//! (see [`KnotsCoefs`]) and evaluated by helper functions. Static ops
//! declare the arrays as constants next to their own helpers; dynamic ops
//! read shared uniforms bound to the op's dynamic slot, so every dynamic
//! op of a shader sees the same curves and a single `localBypass` flag
//! skips the whole block while the curves are identities.

use tracing::{debug, warn};
use vfx_shader::{DynamicPropertyType, ShaderCreator, ShaderLanguage, ShaderText, UniformGetter};

use super::OpBlock;
use super::fixed_function::{emit_hsy_to_rgb, emit_rgb_to_hsy};
use crate::OpsResult;
use crate::curve::KnotsCoefs;
use crate::curve::knots_coefs::{HUE_FX_DERIV_DELTA, HUE_FX_NEWTON_STEPS};
use crate::curve::linlog::{emit_lin_to_log, emit_log_to_lin};
use crate::data::{GradingStyle, HueCurveData, RgbCurveData, curve_index};
use crate::dynamic::{CurveSet, DynamicCurve};
use crate::meta::Direction;

const RGB_PREFIX: &str = "grading_rgbcurve";
const HUE_PREFIX: &str = "grading_huecurve";

/// Names of the arrays and helpers of one op.
struct CurveNames {
    knots_offsets: String,
    knots: String,
    coefs_offsets: String,
    coefs: String,
    local_bypass: String,
    eval: String,
    eval_rev: String,
    eval_rev_hue: String,
    eval_rev_hue_fx: String,
}

impl CurveNames {
    /// Dynamic ops share un-indexed names; static ops get their own.
    fn new(creator: &mut ShaderCreator, prefix: &str, shared: bool) -> Self {
        let base = if shared {
            creator.shared_resource_name(prefix)
        } else {
            creator.resource_name(prefix)
        };
        let name = |s: &str| format!("{base}_{s}");
        Self {
            knots_offsets: name("knotsOffsets"),
            knots: name("knots"),
            coefs_offsets: name("coefsOffsets"),
            coefs: name("coefs"),
            local_bypass: name("localBypass"),
            eval: name("evalBSplineCurve"),
            eval_rev: name("evalBSplineCurveRev"),
            eval_rev_hue: name("evalBSplineCurveRevHue"),
            eval_rev_hue_fx: name("evalBSplineCurveRevHueFx"),
        }
    }
}

/// Where the packed curves come from.
enum Curves<'a, C: CurveSet> {
    Static(KnotsCoefs),
    Dynamic(&'a DynamicCurve<C>),
}

impl<C: CurveSet> Curves<'_, C> {
    fn is_dynamic(&self) -> bool {
        matches!(self, Curves::Dynamic(_))
    }
}

/// Picks the curve source, falling back to baked curves on OSL.
fn source<'a, C: CurveSet>(
    prefix: &str,
    dynamic: bool,
    slot: Option<&'a DynamicCurve<C>>,
    curves: C,
    creator: &ShaderCreator,
) -> OpsResult<Curves<'a, C>> {
    if dynamic && creator.language() == ShaderLanguage::Osl1 {
        warn!(
            property = prefix,
            "dynamic properties are not supported by OSL, the curves are baked into the shader"
        );
    }
    match slot {
        Some(slot) if dynamic && creator.language() != ShaderLanguage::Osl1 => {
            Ok(Curves::Dynamic(slot))
        }
        Some(slot) => Ok(Curves::Static(slot.knots_coefs())),
        None => Ok(Curves::Static(curves.pack()?)),
    }
}

// ============================================================================
// RGB curves
// ============================================================================

pub(super) fn rgb_curve(d: &RgbCurveData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let curves = source(RGB_PREFIX, d.dynamic, d.slot.as_ref(), d.current_curves(), creator)?;
    if let Curves::Static(kc) = &curves {
        if kc.is_identity() {
            debug!(style = d.style.as_str(), "rgb curve is an identity, nothing emitted");
            return Ok(());
        }
    }

    let names = CurveNames::new(creator, RGB_PREFIX, curves.is_dynamic());
    let inverse = d.direction == Direction::Inverse;
    declare_curves(creator, &curves, &names, DynamicPropertyType::GradingRgbCurve)?;
    add_eval_helpers(creator, &curves, &names, false, inverse)?;

    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let channels: Vec<String> = (0..3).map(|i| s.pixel_component(&pix, i)).collect();
    let title = format!("Add GradingRGBCurve '{}' {} processing", d.style.as_str(), d.direction);
    let mut block = OpBlock::open(creator, &title);
    let st = block.text();

    let dynamic = curves.is_dynamic();
    if dynamic {
        open_bypass(st, &names);
    }
    if d.uses_lin_log() {
        st.line("// Convert from lin to log.");
        emit_lin_to_log(st, &channels);
    }
    for (i, ch) in channels.iter().enumerate() {
        if inverse {
            st.line(format!("{ch} = {rev}({i}, {rev}(3, {ch}));", rev = names.eval_rev));
        } else {
            st.line(format!("{ch} = {eval}(3, {eval}({i}, {ch}));", eval = names.eval));
        }
    }
    if d.uses_lin_log() {
        st.line("// Convert from log to lin.");
        emit_log_to_lin(st, &channels);
    }
    if dynamic {
        close_bypass(st);
    }
    block.close(creator)
}

// ============================================================================
// Hue curves
// ============================================================================

pub(super) fn hue_curve(d: &HueCurveData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let curves = source(HUE_PREFIX, d.dynamic, d.slot.as_ref(), d.current_curves(), creator)?;
    if let Curves::Static(kc) = &curves {
        if kc.is_identity() {
            debug!(style = d.style.as_str(), "hue curve is an identity, nothing emitted");
            return Ok(());
        }
    }

    let names = CurveNames::new(creator, HUE_PREFIX, curves.is_dynamic());
    let inverse = d.direction == Direction::Inverse && !d.draw_curve_only;
    declare_curves(creator, &curves, &names, DynamicPropertyType::GradingHueCurve)?;
    add_eval_helpers(creator, &curves, &names, true, inverse)?;

    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let [h, sat, y]: [String; 3] = std::array::from_fn(|i| s.pixel_component(&pix, i));
    let title = format!("Add GradingHueCurve {} processing", d.direction);
    let mut block = OpBlock::open(creator, &title);
    let st = block.text();
    let eval = &names.eval;

    if d.draw_curve_only {
        // Draws the hue-sat curve, whose identity is 1 rather than x.
        for ch in [&h, &sat, &y] {
            st.line(format!("{ch} = {eval}({}, {ch}, 1.);", curve_index::HUE_SAT));
        }
        return block.close(creator);
    }

    let dynamic = curves.is_dynamic();
    if dynamic {
        open_bypass(st, &names);
    }
    let variant = d.hsy_variant();
    if !d.bypass_rgb_to_hsy {
        emit_rgb_to_hsy(st, &pix, variant);
    }
    let hue = HueBody { names: &names, h: &h, sat: &sat, y: &y, linear: d.style == GradingStyle::Lin };
    if inverse {
        hue.reverse(st);
    } else {
        hue.forward(st);
    }
    if !d.bypass_rgb_to_hsy {
        emit_hsy_to_rgb(st, &pix, variant);
    }
    if dynamic {
        close_bypass(st);
    }
    block.close(creator)
}

/// Statements of the hue curve body on the HSY pixel.
struct HueBody<'a> {
    names: &'a CurveNames,
    h: &'a str,
    sat: &'a str,
    y: &'a str,
    linear: bool,
}

impl HueBody<'_> {
    fn lin_to_log(&self, st: &mut ShaderText) {
        if self.linear {
            st.line("// Convert from lin to log.");
            emit_lin_to_log(st, &[self.y.to_string()]);
        }
    }

    fn log_to_lin(&self, st: &mut ShaderText) {
        if self.linear {
            st.line("// Convert from log to lin.");
            emit_log_to_lin(st, &[self.y.to_string()]);
        }
    }

    fn forward(&self, st: &mut ShaderText) {
        use curve_index::*;
        let (h, sat, y) = (self.h, self.sat, self.y);
        let eval = &self.names.eval;

        self.lin_to_log(st);
        st.line(format!("float hueSatGain = max(0., {eval}({HUE_SAT}, {h}, 1.));"));
        st.line(format!("float hueLumGain = max(0., {eval}({HUE_LUM}, {h}, 1.));"));
        st.line(format!("{h} = {eval}({HUE_HUE}, {h}, {h});"));
        st.line(format!("{sat} = max(0., {eval}({SAT_SAT}, {sat}, {sat}));"));
        st.line(format!("float lumSatGain = max(0., {eval}({LUM_SAT}, {y}, 1.));"));
        st.line(format!("{sat} = lumSatGain * hueSatGain * {sat};"));
        st.line(format!("float satLumGain = max(0., {eval}({SAT_LUM}, {sat}, 1.));"));
        st.line(format!("{y} = {eval}({LUM_LUM}, {y}, {y});"));
        self.log_to_lin(st);
        st.line(format!("hueLumGain = 1. - (1. - hueLumGain) * min(1., {sat});"));
        if self.linear {
            st.line(format!("{y} = {y} * hueLumGain * satLumGain;"));
        } else {
            st.line(format!("{y} = {y} + (hueLumGain + satLumGain - 2.) * 0.1;"));
        }
        st.line(format!("{h} = {h} - floor({h});"));
        st.line(format!("{h} = {h} + {eval}({HUE_FX}, {h}, 0.);"));
    }

    fn reverse(&self, st: &mut ShaderText) {
        use curve_index::*;
        let (h, sat, y) = (self.h, self.sat, self.y);
        let n = self.names;
        let eval = &n.eval;

        st.line(format!("{h} = {}({HUE_FX}, {h});", n.eval_rev_hue_fx));
        st.line(format!("{h} = {}({HUE_HUE}, {h});", n.eval_rev_hue));
        st.line(format!("{h} = {h} - floor({h});"));
        st.line(format!("float hueSatGain = max(0., {eval}({HUE_SAT}, {h}, 1.));"));
        st.line(format!("float hueLumGain = max(0., {eval}({HUE_LUM}, {h}, 1.));"));
        st.line(format!("{sat} = max(0., {sat});"));
        st.line(format!("float satLumGain = max(0., {eval}({SAT_LUM}, {sat}, 1.));"));
        st.line(format!("hueLumGain = 1. - (1. - hueLumGain) * min(1., {sat});"));
        if self.linear {
            st.line(format!("{y} = {y} / max(0.01, hueLumGain * satLumGain);"));
        } else {
            st.line(format!("{y} = {y} - (hueLumGain + satLumGain - 2.) * 0.1;"));
        }
        self.lin_to_log(st);
        st.line(format!("{y} = {}({LUM_LUM}, {y});", n.eval_rev));
        st.line(format!("float lumSatGain = max(0., {eval}({LUM_SAT}, {y}, 1.));"));
        self.log_to_lin(st);
        st.line(format!("{sat} = {sat} / max(0.01, lumSatGain * hueSatGain);"));
        st.line(format!("{sat} = max(0., {}({SAT_SAT}, {sat}));", n.eval_rev));
    }
}

// ============================================================================
// Arrays and helpers
// ============================================================================

fn open_bypass(st: &mut ShaderText, names: &CurveNames) {
    st.line(format!("if (!{})", names.local_bypass));
    st.line("{");
    st.indent();
}

fn close_bypass(st: &mut ShaderText) {
    st.dedent();
    st.line("}");
}

/// Binds the uniforms of a dynamic op. Static arrays are declared with the helpers.
fn declare_curves<C: CurveSet>(
    creator: &mut ShaderCreator,
    curves: &Curves<'_, C>,
    names: &CurveNames,
    property: DynamicPropertyType,
) -> OpsResult<()> {
    let Curves::Dynamic(slot) = curves else {
        return Ok(());
    };
    creator.add_dynamic_property(property);
    let (num_offsets, max_knots, max_coefs) =
        slot.with_knots_coefs(|kc| (kc.num_curves() * 2, kc.max_knots(), kc.max_coefs()));

    let mut decl = creator.new_text();
    let slot_ko = (*slot).clone();
    if creator.add_uniform(
        &names.knots_offsets,
        UniformGetter::IntArray(Box::new(move || slot_ko.with_knots_coefs(|kc| kc.knots_offsets.clone()))),
        Some(property),
    )? {
        decl.declare_uniform_array_int(&names.knots_offsets, num_offsets)?;
    }
    let slot_k = (*slot).clone();
    if creator.add_uniform(
        &names.knots,
        UniformGetter::FloatArray(Box::new(move || slot_k.with_knots_coefs(KnotsCoefs::padded_knots))),
        Some(property),
    )? {
        decl.declare_uniform_array_float(&names.knots, max_knots)?;
    }
    let slot_co = (*slot).clone();
    if creator.add_uniform(
        &names.coefs_offsets,
        UniformGetter::IntArray(Box::new(move || slot_co.with_knots_coefs(|kc| kc.coefs_offsets.clone()))),
        Some(property),
    )? {
        decl.declare_uniform_array_int(&names.coefs_offsets, num_offsets)?;
    }
    let slot_c = (*slot).clone();
    if creator.add_uniform(
        &names.coefs,
        UniformGetter::FloatArray(Box::new(move || slot_c.with_knots_coefs(KnotsCoefs::padded_coefs))),
        Some(property),
    )? {
        decl.declare_uniform_array_float(&names.coefs, max_coefs)?;
    }
    let slot_lb = (*slot).clone();
    if creator.add_uniform(
        &names.local_bypass,
        UniformGetter::Bool(Box::new(move || slot_lb.local_bypass())),
        Some(property),
    )? {
        decl.declare_uniform_bool(&names.local_bypass)?;
    }
    if !decl.string().is_empty() {
        creator.add_to_declare_code(decl.string())?;
    }
    Ok(())
}

/// True if a helper called `name` is already in the helper section.
fn has_helper(creator: &ShaderCreator, name: &str) -> bool {
    creator.helper_code().contains(&format!(" {name}("))
}

fn signature(creator: &ShaderCreator, name: &str, identity_arg: bool) -> String {
    let s = creator.syntax();
    let plain = matches!(creator.language(), ShaderLanguage::Osl1 | ShaderLanguage::Msl20);
    let (int_arg, float_arg) = if plain { ("int", "float") } else { ("in int", "in float") };
    let mut sig = format!("{} {name}({int_arg} curveIdx, {float_arg} x", s.float_kw());
    if identity_arg {
        sig.push_str(&format!(", {float_arg} identity_x"));
    }
    sig.push(')');
    sig
}

/// Emits the evaluation helpers (and the constant arrays of a static op).
fn add_eval_helpers<C: CurveSet>(
    creator: &mut ShaderCreator,
    curves: &Curves<'_, C>,
    names: &CurveNames,
    hue: bool,
    inverse: bool,
) -> OpsResult<()> {
    let mut st = creator.new_text();
    if let Curves::Static(kc) = curves {
        st.line("");
        st.declare_int_array_const(&names.knots_offsets, &kc.knots_offsets);
        st.declare_float_array_const(&names.knots, &kc.knots);
        st.declare_int_array_const(&names.coefs_offsets, &kc.coefs_offsets);
        st.declare_float_array_const(&names.coefs, &kc.coefs);
    }

    if !has_helper(creator, &names.eval) {
        st.line("");
        st.line(signature(creator, &names.eval, hue));
        st.line("{");
        st.indent();
        eval_body(&mut st, names, if hue { "identity_x" } else { "x" });
        st.dedent();
        st.line("}");
    }
    if inverse && !has_helper(creator, &names.eval_rev) {
        st.line("");
        st.line(signature(creator, &names.eval_rev, false));
        st.line("{");
        st.indent();
        eval_rev_body(&mut st, names);
        st.dedent();
        st.line("}");

        if hue {
            st.line("");
            st.line(signature(creator, &names.eval_rev_hue, false));
            st.line("{");
            st.indent();
            st.line("float turns = floor(x);");
            st.line(format!("return {}(curveIdx, x - turns) + turns;", names.eval_rev));
            st.dedent();
            st.line("}");

            st.line("");
            st.line(signature(creator, &names.eval_rev_hue_fx, false));
            st.line("{");
            st.indent();
            eval_rev_hue_fx_body(&mut st, names);
            st.dedent();
            st.line("}");
        }
    }
    creator.add_to_helper_code(st.string())?;
    Ok(())
}

/// Reads the offsets of `curveIdx` and returns `identity` for an empty curve.
fn curve_header(st: &mut ShaderText, n: &CurveNames, identity: &str) {
    st.line(format!("int knotsOffs = {}[curveIdx * 2];", n.knots_offsets));
    st.line(format!("int knotsCnt = {}[curveIdx * 2 + 1];", n.knots_offsets));
    st.line(format!("int coefsOffs = {}[curveIdx * 2];", n.coefs_offsets));
    st.line(format!("int coefsCnt = {}[curveIdx * 2 + 1];", n.coefs_offsets));
    st.line("int coefsSets = coefsCnt / 3;");
    st.line("if (coefsSets == 0)");
    st.line("{");
    st.line(format!("  return {identity};"));
    st.line("}");
    st.line(format!("float knStart = {}[knotsOffs];", n.knots));
    st.line(format!("float knEnd = {}[knotsOffs + knotsCnt - 1];", n.knots));
}

/// Coefficients of the last segment and its span.
fn end_segment(st: &mut ShaderText, n: &CurveNames) {
    let (k, c) = (&n.knots, &n.coefs);
    st.line(format!("  float A = {c}[coefsOffs + coefsSets - 1];"));
    st.line(format!("  float B = {c}[coefsOffs + coefsSets * 2 - 1];"));
    st.line(format!("  float C = {c}[coefsOffs + coefsSets * 3 - 1];"));
    st.line(format!("  float kn = {k}[knotsOffs + knotsCnt - 2];"));
    st.line("  float t = knEnd - kn;");
}

fn segment_coefs(st: &mut ShaderText, n: &CurveNames) {
    let (k, c) = (&n.knots, &n.coefs);
    st.line(format!("float A = {c}[coefsOffs + i];"));
    st.line(format!("float B = {c}[coefsOffs + coefsSets + i];"));
    st.line(format!("float C = {c}[coefsOffs + coefsSets * 2 + i];"));
    st.line(format!("float kn = {k}[knotsOffs + i];"));
}

fn eval_body(st: &mut ShaderText, n: &CurveNames, identity: &str) {
    let (k, c) = (&n.knots, &n.coefs);
    curve_header(st, n, identity);
    st.line("if (x <= knStart)");
    st.line("{");
    st.line(format!("  float B = {c}[coefsOffs + coefsSets];"));
    st.line(format!("  float C = {c}[coefsOffs + coefsSets * 2];"));
    st.line("  return (x - knStart) * B + C;");
    st.line("}");
    st.line("else if (x >= knEnd)");
    st.line("{");
    end_segment(st, n);
    st.line("  float slope = 2. * A * t + B;");
    st.line("  float offs = ( A * t + B ) * t + C;");
    st.line("  return (x - knEnd) * slope + offs;");
    st.line("}");
    st.line("int i = 0;");
    st.line("for (i = 0; i < knotsCnt - 2; ++i)");
    st.line("{");
    st.line(format!("  if (x < {k}[knotsOffs + i + 1])"));
    st.line("    break;");
    st.line("}");
    segment_coefs(st, n);
    st.line("float t = x - kn;");
    st.line("return ( A * t + B ) * t + C;");
}

fn eval_rev_body(st: &mut ShaderText, n: &CurveNames) {
    let c = &n.coefs;
    curve_header(st, n, "x");
    st.line(format!("float knStartY = {c}[coefsOffs + coefsSets * 2];"));
    st.line("float knEndY = 0.;");
    st.line("float slope = 1.;");
    st.line("{");
    end_segment(st, n);
    st.line("  knEndY = ( A * t + B ) * t + C;");
    st.line("  slope = 2. * A * t + B;");
    st.line("}");
    st.line("if (x <= knStartY)");
    st.line("{");
    st.line(format!("  float B = {c}[coefsOffs + coefsSets];"));
    st.line("  return (x - knStartY) / B + knStart;");
    st.line("}");
    st.line("else if (x >= knEndY)");
    st.line("{");
    st.line("  return (x - knEndY) / slope + knEnd;");
    st.line("}");
    st.line("int i = 0;");
    st.line("for (i = 0; i < knotsCnt - 2; ++i)");
    st.line("{");
    st.line(format!("  if (x < {c}[coefsOffs + coefsSets * 2 + i + 1])"));
    st.line("    break;");
    st.line("}");
    segment_coefs(st, n);
    st.line("float C0 = C - x;");
    st.line("float discrim = sqrt(B * B - 4. * A * C0);");
    st.line("return kn + (-2. * C0) / (discrim + B);");
}

/// Newton iterations on `h + fx(h) = x` with a centered difference slope.
fn eval_rev_hue_fx_body(st: &mut ShaderText, n: &CurveNames) {
    let s = st.syntax();
    let eval = &n.eval;
    let delta = s.flt(HUE_FX_DERIV_DELTA);
    let two_delta = s.flt(2.0 * HUE_FX_DERIV_DELTA);
    st.line("float h = x;");
    st.line(format!("for (int step = 0; step < {HUE_FX_NEWTON_STEPS}; ++step)"));
    st.line("{");
    st.indent();
    st.line("float hw = h - floor(h);");
    st.line(format!("float f = h + {eval}(curveIdx, hw, 0.) - x;"));
    st.line(format!(
        "float d = 1. + ({eval}(curveIdx, hw + {delta}, 0.) - {eval}(curveIdx, hw - {delta}, 0.)) / {two_delta};"
    ));
    st.line("h = h - f / max(d, 0.01);");
    st.dedent();
    st.line("}");
    st.line("return h;");
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{emit, emit_with};
    use crate::curve::BSplineCurve;
    use crate::data::{GradingStyle, HueCurveData, HueCurves, RgbCurveData, RgbCurves};
    use crate::meta::Direction;
    use crate::optimizer::FinalizeFlags;
    use vfx_shader::{DynamicPropertyType, ShaderLanguage};

    fn tone() -> BSplineCurve {
        BSplineCurve::from_points(&[(0.0, 0.0), (0.3, 0.4), (0.7, 0.8), (1.0, 1.0)])
    }

    fn rgb_data(style: GradingStyle) -> RgbCurveData {
        RgbCurveData::new(style, RgbCurves { red: tone(), ..RgbCurves::default_for(style) })
    }

    fn hue_data(style: GradingStyle) -> HueCurveData {
        HueCurveData::new(style, HueCurves { sat_sat: tone(), ..HueCurves::default_for(style) })
    }

    #[test]
    fn test_identity_curves_emit_nothing() {
        let code = emit(RgbCurveData::identity(GradingStyle::Log), ShaderLanguage::Glsl40);
        assert!(!code.contains("GradingRGBCurve"), "{code}");
        let code = emit(HueCurveData::identity(GradingStyle::Lin), ShaderLanguage::Glsl40);
        assert!(!code.contains("GradingHueCurve"), "{code}");
    }

    #[test]
    fn test_static_rgb_curve() {
        let creator =
            emit_with(rgb_data(GradingStyle::Log), FinalizeFlags::default(), ShaderLanguage::Glsl40)
                .unwrap();
        let code = creator.function_code();
        assert!(code.contains("// Add GradingRGBCurve 'log' forward processing"), "{code}");
        assert!(code.contains(
            "outColor.r = ocio_grading_rgbcurve_0_evalBSplineCurve(3, ocio_grading_rgbcurve_0_evalBSplineCurve(0, outColor.r));"
        ));
        assert!(!code.contains("localBypass"));
        assert!(!code.contains("xbrk"));

        let helpers = creator.helper_code();
        assert!(helpers.contains("const int ocio_grading_rgbcurve_0_knotsOffsets[8] = int[8]("), "{helpers}");
        assert!(helpers.contains("float ocio_grading_rgbcurve_0_evalBSplineCurve(in int curveIdx, in float x)"));
        assert!(!helpers.contains("evalBSplineCurveRev"));
        assert!(creator.uniforms().is_empty());
    }

    #[test]
    fn test_linear_rgb_curve_wraps_lin_log() {
        let d = rgb_data(GradingStyle::Lin).with_direction(Direction::Inverse);
        let creator = emit_with(d, FinalizeFlags::default(), ShaderLanguage::HlslDx11).unwrap();
        let code = creator.function_code();
        assert!(code.contains("'linear' inverse processing"), "{code}");
        let to_log = code.find("outColor.r = (outColor.r < xbrk)").unwrap();
        let rev = code.find("_evalBSplineCurveRev(0, ").unwrap();
        let to_lin = code.find("outColor.r = (outColor.r < ybrk)").unwrap();
        assert!(to_log < rev && rev < to_lin);
        assert!(creator.helper_code().contains("float discrim = sqrt(B * B - 4. * A * C0);"));
    }

    #[test]
    fn test_dynamic_rgb_curve_uses_uniforms() {
        let d = rgb_data(GradingStyle::Log).with_dynamic(true);
        let creator = emit_with(d, FinalizeFlags::default(), ShaderLanguage::Glsl40).unwrap();
        let code = creator.function_code();
        assert!(code.contains("if (!ocio_grading_rgbcurve_localBypass)"), "{code}");
        assert!(code.contains("ocio_grading_rgbcurve_evalBSplineCurve(0, outColor.r)"));

        let decl = creator.declare_code();
        assert!(decl.contains("uniform int ocio_grading_rgbcurve_knotsOffsets[8];"), "{decl}");
        assert!(decl.contains("uniform float ocio_grading_rgbcurve_knots[120];"));
        assert!(decl.contains("uniform float ocio_grading_rgbcurve_coefs[360];"));
        assert!(decl.contains("uniform bool ocio_grading_rgbcurve_localBypass;"));
        assert_eq!(creator.uniforms().len(), 5);
        assert!(creator.has_dynamic_property(DynamicPropertyType::GradingRgbCurve));
        assert!(!creator.helper_code().contains("const int"));
    }

    #[test]
    fn test_hue_curve_forward() {
        let creator =
            emit_with(hue_data(GradingStyle::Lin), FinalizeFlags::default(), ShaderLanguage::Glsl40)
                .unwrap();
        let code = creator.function_code();
        assert!(code.contains("// Add GradingHueCurve forward processing"), "{code}");
        assert!(code.contains("float hueSatGain = max(0., ocio_grading_huecurve_0_evalBSplineCurve(1, outColor.r, 1.));"));
        assert!(code.contains("outColor.b = outColor.b * hueLumGain * satLumGain;"));
        assert!(code.contains("outColor.b = (outColor.b < xbrk)"));
        let hsy = code.find("hue = hue / 6.0;").unwrap();
        let curves = code.find("hueSatGain").unwrap();
        assert!(hsy < curves);
        assert!(creator.helper_code().contains("in float identity_x)"));
        assert_eq!(code.matches('{').count(), code.matches('}').count());

        let code = emit(hue_data(GradingStyle::Log), ShaderLanguage::Glsl40);
        assert!(code.contains("outColor.b = outColor.b + (hueLumGain + satLumGain - 2.) * 0.1;"), "{code}");
        assert!(!code.contains("xbrk"));
    }

    #[test]
    fn test_hue_curve_inverse_helpers() {
        let d = hue_data(GradingStyle::Video).with_direction(Direction::Inverse);
        let creator = emit_with(d, FinalizeFlags::default(), ShaderLanguage::Msl20).unwrap();
        let helpers = creator.helper_code();
        assert!(helpers.contains("float ocio_grading_huecurve_0_evalBSplineCurveRevHue(int curveIdx, float x)"), "{helpers}");
        assert!(helpers.contains("for (int step = 0; step < 10; ++step)"));
        let code = creator.function_code();
        assert!(code.contains("outColor.r = ocio_grading_huecurve_0_evalBSplineCurveRevHueFx(7, outColor.r);"), "{code}");
        assert!(code.contains("outColor.b = outColor.b - (hueLumGain + satLumGain - 2.) * 0.1;"));
    }

    #[test]
    fn test_hue_draw_curve_only() {
        let d = hue_data(GradingStyle::Log).with_draw_curve_only(true);
        let code = emit(d, ShaderLanguage::Glsl40);
        assert!(code.contains("outColor.g = ocio_grading_huecurve_0_evalBSplineCurve(1, outColor.g, 1.);"), "{code}");
        assert!(!code.contains("hueSatGain"));
        assert!(!code.contains("hue = hue / 6.0;"));
    }

    #[test]
    fn test_dynamic_hue_curve_on_osl_is_baked() {
        let d = hue_data(GradingStyle::Log).with_dynamic(true);
        let creator = emit_with(d, FinalizeFlags::default(), ShaderLanguage::Osl1).unwrap();
        assert!(creator.uniforms().is_empty());
        assert!(!creator.function_code().contains("localBypass"));
        assert!(creator.function_code().contains("outColor.rgb[1] = max(0., "), "{}", creator.function_code());
    }
}
