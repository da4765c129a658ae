//! 1D and 3D LUT emitters.
//!
//! 1D LUTs become a 1D texture when they fit in one row. Longer LUTs,
//! half-domain LUTs and targets without 1D textures use a 2D texture whose
//! rows overlap by one texel, so hardware filtering stays continuous across
//! a row break:
//!
//! ```text
//! row 0: v[0]       .. v[w-1]
//! row 1: v[w-1]     .. v[2w-2]
//! row 2: v[2w-2]    .. (padded with the last value)
//! ```

use std::borrow::Cow;

use vfx_math::{HALF_DENRM_MAX, HALF_MAX, HALF_NRM_MIN, float_literal, sanitize_float};
use vfx_shader::{GpuTexture, ShaderCreator, TextureChannel, TextureDimension, TextureFilter};

use super::{OpBlock, rgb};
use crate::OpsResult;
use crate::data::{HueAdjust, Lut1DData, Lut1DInterpolation, Lut3DData, Lut3DInterpolation};
use crate::meta::Direction;
use crate::optimizer::LutInverseStyle;

// ============================================================================
// Texture layout
// ============================================================================

/// Texture size of a 1D LUT of `len` samples: one row when it fits,
/// otherwise rows of `max_width` advancing by `max_width - 1` samples.
pub(crate) fn lut1d_texture_size(len: usize, max_width: usize) -> (usize, usize) {
    let width = len.min(max_width);
    if len <= width {
        return (width, 1);
    }
    let step = width - 1;
    (width, (len - 1).div_ceil(step))
}

/// Texel data in row order: `channels` values of each sample, sanitized,
/// padded with the last sample up to `width * height` texels.
fn padded_texels(values: &[f32], width: usize, height: usize, channels: usize) -> Vec<f32> {
    let len = values.len() / 3;
    let mut out = Vec::with_capacity(width * height * channels);
    let push = |i: usize, out: &mut Vec<f32>| {
        out.extend(values[3 * i..3 * i + channels].iter().map(|v| sanitize_float(*v)));
    };
    if height > 1 {
        let step = width - 1;
        let mut start = 0;
        loop {
            let end = (start + step).min(len - 1);
            for i in start..=end {
                push(i, &mut out);
            }
            if end == len - 1 {
                break;
            }
            start += step;
        }
    } else {
        for i in 0..len {
            push(i, &mut out);
        }
    }
    while out.len() < width * height * channels {
        push(len - 1, &mut out);
    }
    out
}

// ============================================================================
// 1D LUT
// ============================================================================

pub(super) fn lut1d(d: &Lut1DData, cache_id: &str, creator: &mut ShaderCreator) -> OpsResult<()> {
    // Searching the table per pixel is not practical in a shader, so the
    // inverse always goes through the baked half-domain table.
    let lut: Cow<'_, Lut1DData> = match d.direction {
        Direction::Forward => Cow::Borrowed(d),
        Direction::Inverse => Cow::Owned(d.bake_fast_inverse()),
    };
    let s = creator.syntax();
    let lang = creator.language();
    let len = lut.len();
    let (width, height) = lut1d_texture_size(len, creator.texture_max_width());
    let single = lut.channels_identical();
    let channel = if single { TextureChannel::Red } else { TextureChannel::Rgb };
    let use_2d = height > 1 || lut.input_half_domain || !creator.allow_texture_1d() || lang.is_glsl_es();

    let name = creator.resource_name("lut1d");
    creator.add_texture(GpuTexture {
        name: name.clone(),
        sampler_name: s.sampler_name(&name),
        cache_id: cache_id.to_string(),
        width,
        height,
        depth: 1,
        dimension: if use_2d { TextureDimension::Tex2D } else { TextureDimension::Tex1D },
        channel,
        filter: match lut.interpolation.resolved() {
            Lut1DInterpolation::Nearest => TextureFilter::Nearest,
            _ => TextureFilter::Linear,
        },
        values: padded_texels(&lut.decoded_values(), width, height, channel.count()),
    })?;

    let mut decl = creator.new_text();
    if use_2d {
        decl.declare_tex2d(&name)?;
        creator.add_to_declare_code(decl.string())?;
        let helper = compute_pos_helper(creator, &name, len, width, height, lut.input_half_domain);
        creator.add_to_helper_code(&helper)?;
    } else {
        decl.declare_tex1d(&name)?;
        creator.add_to_declare_code(decl.string())?;
    }

    let pix = creator.pixel_name().to_string();
    let dw3 = lut.hue_adjust == HueAdjust::Dw3;
    let mut block = OpBlock::open(creator, &format!("Add a LUT 1D processing for {name}"));
    let st = block.text();

    if dw3 {
        st.line("// Add the pre hue adjustment");
        st.new_line()
            .push(format!("{} = max({pix}.rgb, max({pix}.gbr, {pix}.brg));", s.float3_decl("maxval")));
        st.new_line()
            .push(format!("{} = min({pix}.rgb, min({pix}.gbr, {pix}.brg));", s.float3_decl("minval")));
        st.new_line().push(format!("{} = max(1e-8, maxval.r - minval.r);", s.float_decl("oldChroma")));
        st.new_line().push(format!("{} = {pix}.rgb - minval;", s.float3_decl("delta")));
        st.line("");
    }

    let swz = |c: &str| if single { "r".to_string() } else { c.to_string() };
    if use_2d {
        for c in ["r", "g", "b"] {
            let coords = format!("{name}_computePos({pix}.{c})");
            st.new_line().push(format!("{pix}.{c} = {}.{};", s.sample_tex2d(&name, &coords), swz(c)));
        }
    } else {
        let dim = len as f32;
        let coords = format!("{name}_coords");
        st.new_line().push(format!(
            "{} = ({pix}.rgb * {} + {} ) / {};",
            s.float3_decl(&coords),
            s.float3_splat(dim - 1.0),
            s.float3_splat(0.5),
            s.float3_splat(dim)
        ));
        for c in ["r", "g", "b"] {
            let at = format!("{coords}.{c}");
            st.new_line().push(format!("{pix}.{c} = {}.{};", s.sample_tex1d(&name, &at), swz(c)));
        }
    }

    if dw3 {
        st.line("");
        st.line("// Add the post hue adjustment");
        st.new_line()
            .push(format!("{} = max({pix}.rgb, max({pix}.gbr, {pix}.brg));", s.float3_decl("maxval2")));
        st.new_line()
            .push(format!("{} = min({pix}.rgb, min({pix}.gbr, {pix}.brg));", s.float3_decl("minval2")));
        st.new_line().push(format!("{} = maxval2.r - minval2.r;", s.float_decl("newChroma")));
        st.new_line().push(format!("{} = minval2.r + delta * newChroma / oldChroma;", rgb(&pix)));
    }
    block.close(creator)
}

/// `vec2 NAME_computePos(float f)`: texel centre of input `f` in the 2D
/// layout. Half-domain LUTs index by the half bit pattern of `f`.
fn compute_pos_helper(
    creator: &ShaderCreator,
    name: &str,
    len: usize,
    width: usize,
    height: usize,
    half_domain: bool,
) -> String {
    let s = creator.syntax();
    // Plain literals: these constants must survive the half clamping of Cg.
    let lit = float_literal;
    let row = lit((width - 1) as f32);
    let mut ss = creator.new_text();
    ss.new_line().push(format!("{} {name}_computePos(float f)", s.float2_kw()));
    ss.line("{");
    ss.indent();
    if half_domain {
        ss.line("float dep;");
        ss.line("float abs_f = abs(f);");
        ss.line(format!("if (abs_f > {})", lit(HALF_NRM_MIN)));
        ss.line("{");
        ss.indent();
        ss.new_line().push(format!("{} = {};", s.float3_decl("fComp"), s.float3_splat_str(&lit(15.0))));
        ss.line(format!("float absarr = min( abs_f, {} );", lit(HALF_MAX)));
        ss.line("fComp.x = floor( log2( absarr ) );");
        ss.line("float lower = pow( 2.0, fComp.x );");
        ss.line("fComp.y = ( absarr - lower ) / lower;");
        ss.new_line().push(format!("{} = {};", s.float3_decl("scale"), s.float3_splat_str(&lit(1024.0))));
        ss.line("dep = dot( fComp, scale );");
        ss.dedent();
        ss.line("}");
        ss.line("else");
        ss.line("{");
        ss.indent();
        ss.line(format!("dep = abs_f * 1023.0 / {};", lit(HALF_DENRM_MAX)));
        ss.dedent();
        ss.line("}");
        ss.line("dep += step(f, 0.0) * 32768.0;");
        ss.new_line().push(format!("{};", s.float2_decl("retVal")));
        ss.line(format!("retVal.y = min(floor(dep / {row}), {});", lit((height - 1) as f32)));
    } else {
        ss.line(format!("float dep = clamp(f, 0.0, 1.0) * {};", lit((len - 1) as f32)));
        ss.new_line().push(format!("{};", s.float2_decl("retVal")));
        ss.line(format!("retVal.y = min(float(int(dep / {row})), {});", lit((height - 1) as f32)));
    }
    ss.line(format!("retVal.x = dep - retVal.y * {row};"));
    ss.line(format!("retVal.x = (retVal.x + 0.5) / {};", lit(width as f32)));
    ss.line(format!("retVal.y = (retVal.y + 0.5) / {};", lit(height as f32)));
    ss.line("return retVal;");
    ss.dedent();
    ss.line("}");
    ss.into_string()
}

// ============================================================================
// 3D LUT
// ============================================================================

pub(super) fn lut3d(
    d: &Lut3DData,
    style: LutInverseStyle,
    cache_id: &str,
    creator: &mut ShaderCreator,
) -> OpsResult<()> {
    let lut = d.resolved_forward(style);
    let s = creator.syntax();
    let n = lut.grid_size;
    let name = creator.resource_name("lut3d");
    creator.add_texture(GpuTexture {
        name: name.clone(),
        sampler_name: s.sampler_name(&name),
        cache_id: cache_id.to_string(),
        width: n,
        height: n,
        depth: n,
        dimension: TextureDimension::Tex3D,
        channel: TextureChannel::Rgb,
        filter: TextureFilter::Linear,
        values: lut.values.iter().map(|v| sanitize_float(*v)).collect(),
    })?;

    let mut decl = creator.new_text();
    decl.declare_tex3d(&name)?;
    creator.add_to_declare_code(decl.string())?;

    let pix = creator.pixel_name().to_string();
    let dim = n as f32;
    let incr = 1.0 / dim;
    let mut block = OpBlock::open(creator, &format!("Add a LUT 3D processing for {name}"));
    let st = block.text();

    // The texture is indexed blue fastest, so lookups swizzle to zyx.
    if lut.interpolation.resolved() == Lut3DInterpolation::Trilinear {
        let coords = format!("{name}_coords");
        st.new_line().push(format!(
            "{} = (clamp({pix}.zyx, {}, {}) * {} + {}) / {};",
            s.float3_decl(&coords),
            s.float3_splat(0.0),
            s.float3_splat(1.0),
            s.float3_splat(dim - 1.0),
            s.float3_splat(0.5),
            s.float3_splat(dim)
        ));
        st.new_line().push(format!("{} = {}.rgb;", rgb(&pix), s.sample_tex3d(&name, &coords)));
        return block.close(creator);
    }

    let fetch = |v: &str| format!("{} = {}.rgb;", s.float3_decl(v), s.sample_tex3d(&name, "nextInd"));
    let step3 = |r: bool, g: bool, b: bool| {
        // (b, g, r) order after the swizzle.
        let c = |on: bool| if on { incr } else { 0.0 };
        s.float3_const(c(b), c(g), c(r))
    };
    st.new_line().push(format!(
        "{} = clamp({pix}.rgb, {}, {}) * {};",
        s.float3_decl("coords"),
        s.float3_splat(0.0),
        s.float3_splat(1.0),
        s.float3_splat(dim - 1.0)
    ));
    st.new_line().push(format!("{} = floor(coords);", s.float3_decl("baseInd")));
    st.new_line().push(format!("{} = coords - baseInd;", s.float3_decl("frac")));
    st.new_line().push(format!("{};", s.float3_decl("f1, f4")));
    st.new_line().push(format!("baseInd = ( baseInd.zyx + {} ) / {};", s.float3_splat(0.5), s.float3_splat(dim)));
    st.new_line().push(format!("{} = {}.rgb;", s.float3_decl("v1"), s.sample_tex3d(&name, "baseInd")));
    st.new_line().push(format!("{} = baseInd + {};", s.float3_decl("nextInd"), s.float3_splat(incr)));
    st.new_line().push(format!("{} = {}.rgb;", s.float3_decl("v4"), s.sample_tex3d(&name, "nextInd")));

    // (condition, second vertex, third vertex, f1, f4, f2, f3) per tetrahedron.
    type Case<'a> = (&'a str, (bool, bool, bool), (bool, bool, bool), &'a str, &'a str, &'a str, &'a str);
    let branches: [(&str, [Case; 3]); 2] = [
        (
            "if (frac.r >= frac.g)",
            [
                ("if (frac.g >= frac.b)", (true, false, false), (true, true, false), "1. - frac.r", "frac.b", "frac.r - frac.g", "frac.g - frac.b"),
                ("else if (frac.r >= frac.b)", (true, false, false), (true, false, true), "1. - frac.r", "frac.g", "frac.r - frac.b", "frac.b - frac.g"),
                ("else", (false, false, true), (true, false, true), "1. - frac.b", "frac.g", "frac.b - frac.r", "frac.r - frac.g"),
            ],
        ),
        (
            "else",
            [
                ("if (frac.g <= frac.b)", (false, false, true), (false, true, true), "1. - frac.b", "frac.r", "frac.b - frac.g", "frac.g - frac.r"),
                ("else if (frac.r >= frac.b)", (false, true, false), (true, true, false), "1. - frac.g", "frac.b", "frac.g - frac.r", "frac.r - frac.b"),
                ("else", (false, true, false), (false, true, true), "1. - frac.g", "frac.r", "frac.g - frac.b", "frac.b - frac.r"),
            ],
        ),
    ];
    for (outer, cases) in branches {
        st.line(outer);
        st.line("{");
        st.indent();
        for (cond, v2, v3, f1, f4, f2, f3) in cases {
            st.line(cond);
            st.line("{");
            st.indent();
            st.new_line().push(format!("nextInd = baseInd + {};", step3(v2.0, v2.1, v2.2)));
            st.new_line().push(fetch("v2"));
            st.new_line().push(format!("nextInd = baseInd + {};", step3(v3.0, v3.1, v3.2)));
            st.new_line().push(fetch("v3"));
            st.new_line().push(format!("f1 = {};", s.float3_splat_str(f1)));
            st.new_line().push(format!("f4 = {};", s.float3_splat_str(f4)));
            st.new_line().push(format!("{} = {};", s.float3_decl("f2"), s.float3_splat_str(f2)));
            st.new_line().push(format!("{} = {};", s.float3_decl("f3"), s.float3_splat_str(f3)));
            st.new_line().push(format!("{} = (f2 * v2) + (f3 * v3);", rgb(&pix)));
            st.dedent();
            st.line("}");
        }
        st.dedent();
        st.line("}");
    }
    st.new_line().push(format!("{0} = {0} + (f1 * v1) + (f4 * v4);", rgb(&pix)));
    block.close(creator)
}

#[cfg(test)]
mod tests {
    use super::super::test_util::emit_with;
    use super::*;
    use crate::OpsError;
    use crate::optimizer::FinalizeFlags;
    use vfx_math::FLT_MAX;
    use vfx_shader::{ShaderDesc, ShaderLanguage};

    fn emit_desc(data: impl Into<crate::data::OpData>, desc: ShaderDesc) -> ShaderCreator {
        let mut op = crate::op::Op::new(data.into());
        op.finalize(&FinalizeFlags::default()).unwrap();
        let mut creator = ShaderCreator::new(desc);
        creator.begin().unwrap();
        op.extract_gpu_shader_info(&mut creator).unwrap();
        creator
    }

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).flat_map(|i| [i as f32, i as f32 + 0.25, i as f32 + 0.5]).collect()
    }

    #[test]
    fn test_texture_size() {
        assert_eq!(lut1d_texture_size(1024, 4096), (1024, 1));
        assert_eq!(lut1d_texture_size(4096, 4096), (4096, 1));
        assert_eq!(lut1d_texture_size(4097, 4096), (4096, 2));
        assert_eq!(lut1d_texture_size(65536, 4096), (4096, 17));
    }

    #[test]
    fn test_rows_overlap_by_one_texel() {
        let values = ramp(10);
        let texels = padded_texels(&values, 4, 3, 3);
        assert_eq!(texels.len(), 4 * 3 * 3);
        let r: Vec<f32> = texels.chunks_exact(3).map(|t| t[0]).collect();
        assert_eq!(r, vec![0.0, 1.0, 2.0, 3.0, 3.0, 4.0, 5.0, 6.0, 6.0, 7.0, 8.0, 9.0]);

        // Short last row is padded with the last sample.
        let texels = padded_texels(&ramp(8), 4, 3, 1);
        assert_eq!(texels, vec![0.0, 1.0, 2.0, 3.0, 3.0, 4.0, 5.0, 6.0, 6.0, 7.0, 7.0, 7.0]);
    }

    #[test]
    fn test_texels_are_sanitized() {
        let values = vec![f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.5, 0.5, 0.5];
        let texels = padded_texels(&values, 2, 1, 3);
        assert_eq!(texels, vec![0.0, FLT_MAX, -FLT_MAX, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_short_lut_uses_1d_texture() {
        let lut = Lut1DData::from_fn(32, |x| [x * x, x, x.sqrt()]);
        let creator = emit_with(lut, FinalizeFlags::default(), ShaderLanguage::Glsl40).unwrap();
        let tex = &creator.textures()[0];
        assert_eq!(tex.dimension, TextureDimension::Tex1D);
        assert_eq!(tex.channel, TextureChannel::Rgb);
        assert_eq!((tex.width, tex.height), (32, 1));
        assert!(creator.declare_code().contains("uniform sampler1D ocio_lut1d_0Sampler;"), "{}", creator.declare_code());
        let code = creator.function_code();
        assert!(code.contains("// Add a LUT 1D processing for ocio_lut1d_0"), "{code}");
        assert!(code.contains("outColor.g = texture(ocio_lut1d_0Sampler, ocio_lut1d_0_coords.g).g;"), "{code}");
    }

    #[test]
    fn test_identical_channels_use_red_texture() {
        let creator =
            emit_with(Lut1DData::from_fn(16, |x| [x * x; 3]), FinalizeFlags::default(), ShaderLanguage::Glsl40)
                .unwrap();
        let tex = &creator.textures()[0];
        assert_eq!(tex.channel, TextureChannel::Red);
        assert_eq!(tex.values.len(), 16);
        assert!(creator.function_code().contains("ocio_lut1d_0_coords.b).r;"));
    }

    #[test]
    fn test_long_lut_uses_2d_texture() {
        let lut = Lut1DData::from_fn(300, |x| [x, x * 0.5, x * 0.25]);
        let creator = emit_desc(lut, ShaderDesc::new(ShaderLanguage::Glsl40).with_texture_max_width(128));
        let tex = &creator.textures()[0];
        assert_eq!(tex.dimension, TextureDimension::Tex2D);
        assert_eq!((tex.width, tex.height), (128, 3));
        assert!(creator.helper_code().contains("vec2 ocio_lut1d_0_computePos(float f)"));
        assert!(creator.helper_code().contains("float dep = clamp(f, 0.0, 1.0) * 299.0;"), "{}", creator.helper_code());
        assert!(creator.function_code().contains("ocio_lut1d_0_computePos(outColor.r)"));
    }

    #[test]
    fn test_gles_never_uses_1d_textures() {
        let creator = emit_with(Lut1DData::identity(16).with_hue_adjust(HueAdjust::Dw3), FinalizeFlags::default(), ShaderLanguage::GlslEs30)
            .unwrap();
        assert_eq!(creator.textures()[0].dimension, TextureDimension::Tex2D);
        assert!(!creator.declare_code().contains("sampler1D"));
        let code = creator.function_code();
        assert!(code.contains("// Add the pre hue adjustment"));
        assert!(code.contains("outColor.rgb = minval2.r + delta * newChroma / oldChroma;"), "{code}");
    }

    #[test]
    fn test_half_domain_helper() {
        let lut = Lut1DData::half_domain_from_fn(|x| [x, x, x * 2.0]);
        let creator = emit_with(lut, FinalizeFlags::default(), ShaderLanguage::Glsl40).unwrap();
        let helper = creator.helper_code();
        assert!(helper.contains("dep += step(f, 0.0) * 32768.0;"), "{helper}");
        assert!(helper.contains("fComp.x = floor( log2( absarr ) );"));
        assert_eq!(creator.textures()[0].height, 17);
    }

    #[test]
    fn test_inverse_1d_is_baked() {
        let lut = Lut1DData::from_fn(64, |x| [x * x, x * x, x * x]).with_direction(Direction::Inverse);
        let creator = emit_with(lut, FinalizeFlags::default(), ShaderLanguage::Glsl40).unwrap();
        let tex = &creator.textures()[0];
        assert_eq!(tex.width * tex.height, 4096 * 17);
        assert!(creator.helper_code().contains("32768.0"));
    }

    #[test]
    fn test_lut3d_tetrahedral_and_trilinear() {
        let lut = Lut3DData::from_fn(4, |[r, g, b]| [g, b, r]);
        let creator = emit_with(
            lut.clone().with_interpolation(Lut3DInterpolation::Tetrahedral),
            FinalizeFlags::default(),
            ShaderLanguage::Glsl40,
        )
        .unwrap();
        let tex = &creator.textures()[0];
        assert_eq!((tex.width, tex.height, tex.depth), (4, 4, 4));
        assert_eq!(tex.values.len(), 4 * 4 * 4 * 3);
        assert!(creator.declare_code().contains("uniform sampler3D ocio_lut3d_0Sampler;"));
        let code = creator.function_code();
        assert!(code.contains("baseInd = ( baseInd.zyx + vec3(0.5, 0.5, 0.5) ) / vec3(4.0, 4.0, 4.0);"), "{code}");
        assert!(code.contains("nextInd = baseInd + vec3(0.0, 0.0, 0.25);"));
        assert_eq!(code.matches("(f2 * v2) + (f3 * v3)").count(), 6);
        assert!(code.contains("outColor.rgb = outColor.rgb + (f1 * v1) + (f4 * v4);"));

        let code = emit_with(lut, FinalizeFlags::default(), ShaderLanguage::HlslDx11)
            .unwrap()
            .function_code()
            .to_string();
        assert!(code.contains("outColor.rgb = ocio_lut3d_0.Sample(ocio_lut3d_0Sampler, ocio_lut3d_0_coords).rgb;"), "{code}");
    }

    #[test]
    fn test_lut3d_inverse_grid_follows_style() {
        let lut = Lut3DData::from_fn(5, |[r, g, b]| [r * 0.9, g * 0.8 + 0.1, b]).with_direction(Direction::Inverse);
        let fast = emit_with(lut.clone(), FinalizeFlags::with_lut_inverse(LutInverseStyle::Fast), ShaderLanguage::Glsl40)
            .unwrap();
        assert_eq!(fast.textures()[0].width, crate::data::FAST_INVERSE_GRID_SIZE);
        let exact = emit_with(lut, FinalizeFlags::default(), ShaderLanguage::Glsl40).unwrap();
        assert_eq!(exact.textures()[0].width, crate::data::INVERSE_GRID_SIZE);
    }

    #[test]
    fn test_textures_rejected_on_osl() {
        let err = emit_with(Lut1DData::identity(8), FinalizeFlags::default(), ShaderLanguage::Osl1).unwrap_err();
        assert!(matches!(err, OpsError::UnsupportedLanguage { ref op, .. } if op == "Lut1DOp"), "{err:?}");
    }
}
