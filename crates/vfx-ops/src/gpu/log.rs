//! Log, anti-log, affine and camera log emitters.

use vfx_math::FLT_MIN;
use vfx_shader::ShaderCreator;

use super::{OpBlock, rgb};
use crate::OpsResult;
use crate::data::{LogData, LogStyle};
use crate::meta::Direction;

pub(super) fn log(d: &LogData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let forward = d.direction == Direction::Forward;
    match d.style() {
        LogStyle::Log2 | LogStyle::Log10 | LogStyle::LogBase if forward => pure_log(d.base, creator),
        LogStyle::Log2 | LogStyle::Log10 | LogStyle::LogBase => anti_log(d.base, creator),
        LogStyle::Affine if forward => lin_to_log(d, creator),
        LogStyle::Affine => log_to_lin(d, creator),
        LogStyle::Camera if forward => camera_lin_to_log(d, creator),
        LogStyle::Camera => camera_log_to_lin(d, creator),
    }
}

fn pure_log(base: f64, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let px = rgb(creator.pixel_name());
    let mut block = OpBlock::open(creator, "Add Log processing");
    let st = block.text();
    st.new_line().push(format!("{px} = max( {}, {px});", s.float3_splat(FLT_MIN)));
    if base == 2.0 {
        st.new_line().push(format!("{px} = log2({px});"));
    } else {
        let k = 1.0 / base.ln();
        st.new_line().push(format!("{px} = log({px}) * {};", s.float3_const_f64([k; 3])));
    }
    block.close(creator)
}

fn anti_log(base: f64, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let px = rgb(creator.pixel_name());
    let mut block = OpBlock::open(creator, "Add Log 'Anti-Log' processing");
    block
        .text()
        .new_line()
        .push(format!("{px} = pow( {}, {px});", s.float3_const_f64([base; 3])));
    block.close(creator)
}

fn lin_to_log(d: &LogData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let px = rgb(creator.pixel_name());
    let ln_base = d.base.ln();
    let mut block = OpBlock::open(creator, "Add Log 'Lin to Log' processing");
    let st = block.text();
    st.declare_float3("minValue", FLT_MIN, FLT_MIN, FLT_MIN);
    st.declare_float3_f64("lin_slope", std::array::from_fn(|c| d.params[c].lin_slope));
    st.declare_float3_f64("lin_offset", std::array::from_fn(|c| d.params[c].lin_offset));
    st.declare_float3_f64("log_slope", std::array::from_fn(|c| d.params[c].log_slope / ln_base));
    st.declare_float3_f64("log_offset", std::array::from_fn(|c| d.params[c].log_offset));
    st.new_line().push(format!("{px} = max( minValue, ({px} * lin_slope + lin_offset) );"));
    st.new_line().push(format!("{px} = log_slope * log({px} ) + log_offset;"));
    block.close(creator)
}

fn log_to_lin(d: &LogData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let px = rgb(creator.pixel_name());
    let mut block = OpBlock::open(creator, "Add Log 'Log to Lin' processing");
    let st = block.text();
    st.declare_float3_f64("log_slopeinv", std::array::from_fn(|c| 1.0 / d.params[c].log_slope));
    st.declare_float3_f64("lin_slopeinv", std::array::from_fn(|c| 1.0 / d.params[c].lin_slope));
    st.declare_float3_f64("lin_offset", std::array::from_fn(|c| d.params[c].lin_offset));
    st.declare_float3_f64("log_base", [d.base; 3]);
    st.declare_float3_f64("log_offset", std::array::from_fn(|c| d.params[c].log_offset));
    st.new_line().push(format!("{px} = ({px} - log_offset) * log_slopeinv;"));
    st.new_line().push(format!("{px} = pow(log_base, {px});"));
    st.new_line().push(format!("{px} = lin_slopeinv * ({px} - lin_offset);"));
    block.close(creator)
}

/// Break, slope and offset of the linear segments.
fn segments(d: &LogData) -> [[f64; 4]; 3] {
    std::array::from_fn(|c| match d.camera_segment(c) {
        Some(seg) => [seg.lin_break, seg.log_break, seg.slope, seg.offset],
        None => [f64::MIN, f64::MIN, 1.0, 0.0],
    })
}

fn camera_lin_to_log(d: &LogData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let px = rgb(creator.pixel_name());
    let seg = segments(d);
    let ln_base = d.base.ln();
    let above = s.float3_greater_than(&px, "linear_break")?;
    let mut block = OpBlock::open(creator, "Add Log 'Camera Lin to Log' processing");
    let st = block.text();
    st.declare_float3("minValue", FLT_MIN, FLT_MIN, FLT_MIN);
    st.declare_float3_f64("linear_break", seg.map(|v| v[0]));
    st.declare_float3_f64("linear_segment_slope", seg.map(|v| v[2]));
    st.declare_float3_f64("linear_segment_offset", seg.map(|v| v[3]));
    st.declare_float3_f64("lin_slope", std::array::from_fn(|c| d.params[c].lin_slope));
    st.declare_float3_f64("lin_offset", std::array::from_fn(|c| d.params[c].lin_offset));
    st.declare_float3_f64("log_slope", std::array::from_fn(|c| d.params[c].log_slope / ln_base));
    st.declare_float3_f64("log_offset", std::array::from_fn(|c| d.params[c].log_offset));
    st.new_line().push(format!("{} = {above};", s.float3_decl("isAboveBreak")));
    st.new_line().push(format!(
        "{} = {px} * linear_segment_slope + linear_segment_offset;",
        s.float3_decl("linSeg")
    ));
    st.new_line()
        .push(format!("{} = max( minValue, ({px} * lin_slope + lin_offset) );", s.float3_decl("logSeg")));
    st.line("logSeg = log_slope * log( logSeg ) + log_offset;");
    st.new_line().push(format!(
        "{px} = isAboveBreak * logSeg + ( {} - isAboveBreak ) * linSeg;",
        s.float3_splat(1.0)
    ));
    block.close(creator)
}

fn camera_log_to_lin(d: &LogData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let px = rgb(creator.pixel_name());
    let seg = segments(d);
    let above = s.float3_greater_than(&px, "log_break")?;
    let mut block = OpBlock::open(creator, "Add Log 'Camera Log to Lin' processing");
    let st = block.text();
    st.declare_float3_f64("log_break", seg.map(|v| v[1]));
    st.declare_float3_f64("linear_segment_offset", seg.map(|v| v[3]));
    st.declare_float3_f64("linear_segment_slopeinv", seg.map(|v| 1.0 / v[2]));
    st.declare_float3_f64("lin_slopeinv", std::array::from_fn(|c| 1.0 / d.params[c].lin_slope));
    st.declare_float3_f64("lin_offset", std::array::from_fn(|c| d.params[c].lin_offset));
    st.declare_float3_f64("log_slopeinv", std::array::from_fn(|c| 1.0 / d.params[c].log_slope));
    st.declare_float3_f64("log_base", [d.base; 3]);
    st.declare_float3_f64("log_offset", std::array::from_fn(|c| d.params[c].log_offset));
    st.new_line().push(format!("{} = {above};", s.float3_decl("isAboveBreak")));
    st.new_line().push(format!(
        "{} = ( {px} - linear_segment_offset ) * linear_segment_slopeinv;",
        s.float3_decl("linSeg")
    ));
    st.new_line().push(format!("{} = ({px} - log_offset) * log_slopeinv;", s.float3_decl("logSeg")));
    st.line("logSeg = pow(log_base, logSeg);");
    st.line("logSeg = lin_slopeinv * (logSeg - lin_offset);");
    st.new_line().push(format!(
        "{px} = isAboveBreak * logSeg + ( {} - isAboveBreak ) * linSeg;",
        s.float3_splat(1.0)
    ));
    block.close(creator)
}

#[cfg(test)]
mod tests {
    use super::super::test_util::{emit, emit_with};
    use crate::OpsError;
    use crate::data::{LogData, LogParams};
    use crate::meta::Direction;
    use crate::optimizer::FinalizeFlags;
    use vfx_shader::ShaderLanguage;

    fn camera() -> LogData {
        LogData::affine(10.0, LogParams::affine(0.18, 0.6, 1.2, 0.05).with_break(0.01, None))
    }

    #[test]
    fn test_pure_logs() {
        let code = emit(LogData::log(2.0), ShaderLanguage::Glsl40);
        assert!(code.contains("// Add Log processing"));
        assert!(code.contains("outColor.rgb = log2(outColor.rgb);"), "{code}");

        let code = emit(LogData::log(10.0), ShaderLanguage::Glsl40);
        assert!(code.contains("outColor.rgb = log(outColor.rgb) * vec3("), "{code}");

        let code = emit(LogData::anti_log(2.0), ShaderLanguage::HlslDx11);
        assert!(code.contains("outColor.rgb = pow( float3(2.0, 2.0, 2.0), outColor.rgb);"), "{code}");
    }

    #[test]
    fn test_affine_log() {
        let d = LogData::affine(10.0, LogParams::affine(0.5, 0.2, 2.0, 0.1));
        let code = emit(d.clone(), ShaderLanguage::Glsl40);
        assert!(code.contains("// Add Log 'Lin to Log' processing"));
        assert!(code.contains("vec3 lin_slope = vec3(2.0, 2.0, 2.0);"), "{code}");
        assert!(code.contains("log_slope * log(outColor.rgb ) + log_offset"));

        let code = emit(d.with_direction(Direction::Inverse), ShaderLanguage::Glsl40);
        assert!(code.contains("vec3 log_slopeinv = vec3(2.0, 2.0, 2.0);"), "{code}");
        assert!(code.contains("vec3 lin_slopeinv = vec3(0.5, 0.5, 0.5);"));
        assert!(code.contains("outColor.rgb = pow(log_base, outColor.rgb);"));
    }

    #[test]
    fn test_camera_log() {
        let code = emit(camera(), ShaderLanguage::Glsl40);
        assert!(code.contains("vec3 isAboveBreak = vec3(greaterThan( outColor.rgb, linear_break));"), "{code}");
        assert!(code.contains("isAboveBreak * logSeg"));

        let code = emit(camera().with_direction(Direction::Inverse), ShaderLanguage::Msl20);
        assert!(code.contains("float3 isAboveBreak = float3(outColor.rgb > log_break);"), "{code}");
    }

    #[test]
    fn test_camera_log_needs_vector_compare() {
        let err = emit_with(camera(), FinalizeFlags::default(), ShaderLanguage::Osl1).unwrap_err();
        assert!(matches!(err, OpsError::UnsupportedLanguage { ref op, .. } if op == "LogOp"), "{err:?}");
    }
}
