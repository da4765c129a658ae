//! Complete shader programs assembled from op pipelines.

use vfx_ops::curve::BSplineCurve;
use vfx_ops::data::{
    CdlData, CdlStyle, ExponentData, GradingStyle, LogData, Lut1DData, Lut3DData, MatrixData,
    RangeData, RgbCurveData, RgbCurves,
};
use vfx_ops::optimizer::{FinalizeFlags, LutInverseStyle};
use vfx_ops::{OpPipeline, OpsError};
use vfx_shader::{ShaderDesc, ShaderLanguage, TextureChannel, UniformValue};

fn grade() -> OpPipeline {
    let mut pipeline = OpPipeline::new();
    pipeline
        .push(MatrixData::from_rgb([0.6, 0.3, 0.1, 0.2, 0.7, 0.1, 0.05, 0.15, 0.8]))
        .push(ExponentData::new([1.1, 1.2, 1.3, 1.0]))
        .push(RangeData::rgb(0.0, 1.0, 0.05, 0.95))
        .push(CdlData::new([1.1, 1.0, 0.9], [0.0, 0.01, 0.02], [1.0, 1.1, 1.2], 0.9, CdlStyle::V12Fwd))
        .push(LogData::log(2.0));
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    pipeline
}

fn dynamic_curve() -> RgbCurveData {
    let curves = RgbCurves {
        master: BSplineCurve::from_points(&[(0.0, 0.0), (0.4, 0.5), (1.0, 1.0)]),
        ..RgbCurves::default_for(GradingStyle::Log)
    };
    RgbCurveData::new(GradingStyle::Log, curves).with_dynamic(true)
}

#[test]
fn test_plain_languages() {
    let cases = [
        (ShaderLanguage::Glsl12, "vec4 OCIODisplay(vec4 inPixel)"),
        (ShaderLanguage::Glsl40, "vec4 OCIODisplay(vec4 inPixel)"),
        (ShaderLanguage::GlslEs30, "vec4 OCIODisplay(vec4 inPixel)"),
        (ShaderLanguage::HlslDx11, "float4 OCIODisplay(float4 inPixel)"),
        (ShaderLanguage::Cg, "half4 OCIODisplay(half4 inPixel)"),
    ];
    let pipeline = grade();
    for (lang, header) in cases {
        let creator = pipeline.gpu_shader(ShaderDesc::new(lang)).unwrap();
        let text = creator.shader_text().unwrap();
        assert!(text.contains(header), "{lang}: {text}");
        for block in [
            "Add a Matrix processing",
            "Add Exponent processing",
            "Add Range processing",
            "Add CDL 'v1.2_fwd' processing",
            "Add Log processing",
        ] {
            assert!(text.contains(block), "{lang}: missing {block}");
        }
        assert!(text.trim_end().ends_with('}'));
        assert!(creator.textures().is_empty());
        assert!(creator.uniforms().is_empty());
    }
}

#[test]
fn test_msl_class_wrapper() {
    let creator = grade().gpu_shader(ShaderDesc::new(ShaderLanguage::Msl20)).unwrap();
    let text = creator.shader_text().unwrap();
    assert!(text.starts_with("#include <metal_stdlib>"));
    assert!(text.contains("struct OCIOColorTransform\n{"));
    assert!(text.contains("float4 OCIODisplay(float4 inPixel)"));
    assert!(text.contains("OCIOColorTransform().OCIODisplay(inPixel)"), "{text}");
}

#[test]
fn test_custom_names() {
    let desc = ShaderDesc::new(ShaderLanguage::Glsl40)
        .with_function_name("grade")
        .with_pixel_name("px")
        .with_resource_prefix("show");
    let mut pipeline = OpPipeline::new();
    pipeline.push(Lut3DData::from_fn(5, |[r, g, b]| [r * r, g, b.sqrt()]));
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let creator = pipeline.gpu_shader(desc).unwrap();
    let text = creator.shader_text().unwrap();
    assert!(text.contains("vec4 grade(vec4 inPixel)"));
    assert!(text.contains("vec4 px = inPixel;"));
    assert_eq!(creator.textures().len(), 1);
    assert!(creator.textures()[0].name.starts_with("show_lut3d"));
}

#[test]
fn test_lut_textures() {
    let mut pipeline = OpPipeline::new();
    pipeline
        .push(Lut1DData::from_fn(64, |x| [x * x; 3]))
        .push(Lut1DData::from_fn(5000, |x| [x, x * 0.5, x.sqrt()]))
        .push(Lut3DData::from_fn(9, |[r, g, b]| [g, b, r]));
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let creator = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Glsl40)).unwrap();

    let textures = creator.textures();
    assert_eq!(textures.len(), 3);
    assert_eq!(textures[0].channel, TextureChannel::Red);
    assert_eq!((textures[0].width, textures[0].height), (64, 1));
    assert_eq!(textures[1].channel, TextureChannel::Rgb);
    assert_eq!(textures[1].width, 4096);
    assert_eq!(textures[1].height, 2);
    assert_eq!(textures[1].values.len(), 4096 * 2 * 3);
    assert_eq!(textures[2].depth, 9);
    for t in textures {
        assert_eq!(t.values.len(), t.width * t.height * t.depth * t.channel.count());
    }
}

#[test]
fn test_inverse_lut_is_baked_on_gpu() {
    let mut pipeline = OpPipeline::new();
    pipeline.push(Lut1DData::from_fn(256, |x| [x.powf(0.45); 3]));
    let mut inverse = pipeline.inverse();
    inverse.finalize(&FinalizeFlags::with_lut_inverse(LutInverseStyle::Exact)).unwrap();
    let creator = inverse.gpu_shader(ShaderDesc::new(ShaderLanguage::Glsl40)).unwrap();
    assert_eq!(creator.textures().len(), 1);
    assert_eq!(creator.textures()[0].height, 17);
}

#[test]
fn test_osl_rejects_textures() {
    let mut pipeline = OpPipeline::new();
    pipeline.push(MatrixData::scale([2.0, 2.0, 2.0, 1.0])).push(Lut1DData::from_fn(16, |x| [x * x; 3]));
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let err = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Osl1)).unwrap_err();
    assert!(
        matches!(err, OpsError::UnsupportedLanguage { language: ShaderLanguage::Osl1, .. }),
        "{err}"
    );
}

#[test]
fn test_osl_shader_block() {
    let creator = grade().gpu_shader(ShaderDesc::new(ShaderLanguage::Osl1)).unwrap();
    let text = creator.shader_text().unwrap();
    assert!(text.contains("shader OCIOColorTransform("));
    assert!(text.contains("color4 OCIODisplay(color4 inPixel)"));
}

#[test]
fn test_dynamic_uniforms_track_edits() {
    let mut pipeline = OpPipeline::new();
    pipeline.push(dynamic_curve()).push(MatrixData::scale([1.5, 1.5, 1.5, 1.0])).push(dynamic_curve());
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let creator = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::HlslDx11)).unwrap();
    assert_eq!(creator.uniforms().len(), 5);

    let bypass = creator.uniform("ocio_grading_rgbcurve_localBypass").unwrap();
    assert_eq!(bypass.value(), UniformValue::Bool(false));
    let knots = creator.uniform("ocio_grading_rgbcurve_knots").unwrap();
    let before = knots.value();

    let slot = pipeline.registry().rgb_curve().unwrap();
    slot.set(RgbCurves::default_for(GradingStyle::Log)).unwrap();
    assert_eq!(bypass.value(), UniformValue::Bool(true));
    assert_ne!(knots.value(), before);
}

#[test]
fn test_dynamic_uniforms_in_msl_wrapper() {
    let mut pipeline = OpPipeline::new();
    pipeline.push(dynamic_curve());
    pipeline.finalize(&FinalizeFlags::default()).unwrap();
    let creator = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Msl20)).unwrap();
    let text = creator.shader_text().unwrap();
    assert!(text.contains("constant float* ocio_grading_rgbcurve_knots"), "{text}");
    assert!(text.contains("int ocio_grading_rgbcurve_knots_count"));
    assert!(text.contains("bool ocio_grading_rgbcurve_localBypass"));
}

#[test]
fn test_shader_cache_id() {
    let pipeline = grade();
    let a = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Glsl40)).unwrap();
    let b = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::Glsl40)).unwrap();
    let c = pipeline.gpu_shader(ShaderDesc::new(ShaderLanguage::HlslDx11)).unwrap();
    assert_eq!(a.cache_id(), b.cache_id());
    assert_ne!(a.cache_id(), c.cache_id());
}

#[test]
fn test_config_from_yaml() {
    let desc = ShaderDesc::from_yaml("language: HLSL_DX11\nfunction_name: Grade\n").unwrap();
    let flags: FinalizeFlags = serde_yaml::from_str("lut_inverse: Fast\n").unwrap();
    assert_eq!(flags.lut_inverse, LutInverseStyle::Fast);

    let mut pipeline = OpPipeline::new();
    pipeline.push(ExponentData::uniform(2.0));
    pipeline.finalize(&flags).unwrap();
    let creator = pipeline.gpu_shader(desc).unwrap();
    assert!(creator.shader_text().unwrap().contains("float4 Grade(float4 inPixel)"));
}
