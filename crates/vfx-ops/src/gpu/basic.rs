//! Matrix, exponent, range and CDL emitters.

use vfx_math::FLT_MAX;
use vfx_shader::ShaderCreator;

use super::{OpBlock, rgb};
use crate::OpsResult;
use crate::data::{CDL_LUMA_WEIGHTS, CdlData, ExponentData, MatrixData, RangeData};

pub(super) fn matrix(d: &MatrixData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let (m, offset) = d.forward()?;
    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let mut block = OpBlock::open(creator, "Add a Matrix processing");
    let st = block.text();

    if !m.is_identity() {
        if m.is_diagonal() {
            st.new_line()
                .push(format!("{pix} = {} * {pix};", s.float4_const_f64(m.diagonal())));
        } else {
            st.new_line().push(format!("{pix} = {};", s.mat4_mul(&m.m, &pix)));
        }
    }
    if offset.iter().any(|v| *v != 0.0) {
        st.new_line().push(format!("{pix} = {} + {pix};", s.float4_const_f64(offset)));
    }
    block.close(creator)
}

pub(super) fn exponent(d: &ExponentData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let mut block = OpBlock::open(creator, "Add Exponent processing");
    block.text().new_line().push(format!(
        "{pix} = pow( max( {pix}, {} ), {} );",
        s.float4_splat(0.0),
        s.float4_const_f64(d.effective())
    ));
    block.close(creator)
}

/// Unbounded clamp ends become `±FLT_MAX` so they stay valid literals.
fn finite_bound(v: f64) -> f64 {
    v.clamp(-(FLT_MAX as f64), FLT_MAX as f64)
}

pub(super) fn range(d: &RangeData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let affine = d.effective_channels().map(|c| c.affine());
    let mut block = OpBlock::open(creator, "Add Range processing");
    let st = block.text();

    if affine.iter().any(|a| a.scale != 1.0 || a.offset != 0.0) {
        st.new_line().push(format!(
            "{pix} = {pix} * {} + {};",
            s.float4_const_f64(affine.map(|a| a.scale)),
            s.float4_const_f64(affine.map(|a| a.offset))
        ));
    }
    if !d.no_clamp {
        if affine.iter().any(|a| a.lo.is_finite()) {
            let lo = affine.map(|a| finite_bound(a.lo));
            st.new_line().push(format!("{pix} = max({pix}, {});", s.float4_const_f64(lo)));
        }
        if affine.iter().any(|a| a.hi.is_finite()) {
            let hi = affine.map(|a| finite_bound(a.hi));
            st.new_line().push(format!("{pix} = min({pix}, {});", s.float4_const_f64(hi)));
        }
    }
    block.close(creator)
}

pub(super) fn cdl(d: &CdlData, creator: &mut ShaderCreator) -> OpsResult<()> {
    let s = creator.syntax();
    let pix = creator.pixel_name().to_string();
    let p = d.render_params();
    let mut block = OpBlock::open(creator, &format!("Add CDL '{}' processing", d.style.as_str()));
    let st = block.text();

    st.declare_float3_f64("lumaWeights", CDL_LUMA_WEIGHTS);
    st.declare_float3_f64("slope", p.slope);
    st.declare_float3_f64("offset", p.offset);
    st.declare_float3_f64("power", p.power);
    st.new_line().push(s.float_decl("saturation")).push(" = ").push(s.dbl(p.saturation)).push(";");
    st.line("");
    st.declare_float3_str("pix", &rgb(&pix));

    let clamp = |st: &mut vfx_shader::ShaderText| {
        if p.clamp {
            st.line("pix = clamp(pix, 0.0, 1.0);");
        }
    };
    let power = |st: &mut vfx_shader::ShaderText| {
        if p.clamp {
            st.line("pix = clamp(pix, 0.0, 1.0);");
            st.line("pix = pow(pix, power);");
        } else {
            // Negative values skip the power.
            st.new_line().push(s.float3_decl("posPix")).push(" = step(0.0, pix);");
            st.new_line().push(s.float3_decl("pixPower")).push(" = pow(abs(pix), power);");
            st.new_line().push(format!("pix = {};", s.lerp("pix", "pixPower", "posPix")));
        }
    };
    let saturation = |st: &mut vfx_shader::ShaderText| {
        st.new_line().push(s.float_decl("luma")).push(" = dot(pix, lumaWeights);");
        st.line("pix = luma + saturation * (pix - luma);");
    };

    if p.reverse {
        clamp(st);
        saturation(st);
        power(st);
        st.line("pix = pix + offset;");
        st.line("pix = pix * slope;");
    } else {
        st.line("pix = pix * slope;");
        st.line("pix = pix + offset;");
        power(st);
        saturation(st);
    }
    clamp(st);
    st.new_line().push(format!("{} = pix;", rgb(&pix)));
    block.close(creator)
}
