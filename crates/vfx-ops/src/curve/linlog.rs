//! Lin-to-log wrapper used by the linear grading style.
//!
//! Curves of the linear style are edited in a log-like space: a pure log2
//! above a small break point, a matching line below it so negative values
//! stay finite.

use vfx_shader::ShaderText;

/// Break point in linear space.
pub const XBRK: f32 = 0.004_131_837_5;
/// Linear shift inside the log.
pub const SHIFT: f32 = -0.000_157_849_85;
/// `1 / (0.18 + SHIFT)`, so 0.18 maps to 0.
pub const M: f32 = 1.0 / (0.18 + SHIFT);
/// Slope of the linear segment.
pub const GAIN: f32 = 363.034_6;
/// Offset of the linear segment.
pub const OFFS: f32 = -7.0;
/// Break point in log space.
pub const YBRK: f32 = -5.5;
/// `1 / ln(2)`.
pub const BASE2: f32 = std::f32::consts::LOG2_E;

/// Linear value to the grading log space.
#[inline]
pub fn lin_to_log(x: f32) -> f32 {
    if x < XBRK {
        x * GAIN + OFFS
    } else {
        BASE2 * ((x + SHIFT) * M).ln()
    }
}

/// Grading log value back to linear.
#[inline]
pub fn log_to_lin(y: f32) -> f32 {
    if y < YBRK {
        (y - OFFS) / GAIN
    } else {
        y.exp2() * (0.18 + SHIFT) - SHIFT
    }
}

/// Emits `lin_to_log` over each expression in `targets`.
pub fn emit_lin_to_log(st: &mut ShaderText, targets: &[String]) {
    emit_constants(st);
    for t in targets {
        st.new_line().push(format!(
            "{t} = ({t} < xbrk) ? {t} * gain + offs : base2 * log(({t} + shift) * m);"
        ));
    }
    close_scope(st);
}

/// Emits `log_to_lin` over each expression in `targets`.
pub fn emit_log_to_lin(st: &mut ShaderText, targets: &[String]) {
    emit_constants(st);
    for t in targets {
        st.new_line().push(format!(
            "{t} = ({t} < ybrk) ? ({t} - offs) / gain : pow(2., {t}) * (0.18 + shift) - shift;"
        ));
    }
    close_scope(st);
}

fn emit_constants(st: &mut ShaderText) {
    st.line("{");
    st.indent();
    st.declare_var("xbrk", XBRK);
    st.declare_var("shift", SHIFT);
    st.declare_var("m", M);
    st.declare_var("gain", GAIN);
    st.declare_var("offs", OFFS);
    st.declare_var("ybrk", YBRK);
    st.declare_var("base2", BASE2);
}

fn close_scope(st: &mut ShaderText) {
    st.dedent();
    st.line("}");
}
